//! Read-only navigation index over a decoded node collection.
//!
//! The index borrows the collection and stores positions into it, so it can
//! never outlive the nodes it was built from.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::similarity::cosine_similarity;
use crate::format::MemoryNode;

/// A node paired with its similarity to a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchResult<'a> {
    pub node: &'a MemoryNode,
    pub score: f32,
}

/// Identity, tag and hierarchy lookups plus scan-based search.
///
/// Built once in a single pass; every query is read-only, so a tree can be
/// shared across threads without locking.
#[derive(Debug, Clone)]
pub struct MemoryTree<'a> {
    /// The indexed collection, in original order.
    nodes: &'a [MemoryNode],
    /// Node id -> position. Later duplicates replace earlier ones.
    by_id: HashMap<&'a str, usize>,
    /// Tag -> positions, one entry per tag occurrence.
    by_tag: HashMap<&'a str, Vec<usize>>,
    /// Parent id -> positions of nodes naming it as parent.
    children: HashMap<&'a str, Vec<usize>>,
}

impl<'a> MemoryTree<'a> {
    /// Index a collection of nodes.
    pub fn new(nodes: &'a [MemoryNode]) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut by_tag: HashMap<&'a str, Vec<usize>> = HashMap::new();
        let mut children: HashMap<&'a str, Vec<usize>> = HashMap::new();

        for (pos, node) in nodes.iter().enumerate() {
            by_id.insert(node.id.as_str(), pos);

            for tag in &node.tags {
                by_tag.entry(tag.as_str()).or_default().push(pos);
            }

            if !node.parent_id.is_empty() {
                children.entry(node.parent_id.as_str()).or_default().push(pos);
            }
        }

        debug!(
            nodes = nodes.len(),
            tags = by_tag.len(),
            parents = children.len(),
            "Built memory tree"
        );

        Self {
            nodes,
            by_id,
            by_tag,
            children,
        }
    }

    fn resolve(&self, positions: Option<&Vec<usize>>) -> Vec<&'a MemoryNode> {
        let nodes = self.nodes;
        positions
            .map(|p| p.iter().map(|&i| &nodes[i]).collect())
            .unwrap_or_default()
    }

    /// Get a node by id.
    pub fn get(&self, id: &str) -> Option<&'a MemoryNode> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    /// All nodes in original order.
    pub fn get_all(&self) -> &'a [MemoryNode] {
        self.nodes
    }

    /// Total number of nodes.
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes carrying `tag`, in original order.
    ///
    /// A node listing the same tag twice appears twice.
    pub fn get_by_tag(&self, tag: &str) -> Vec<&'a MemoryNode> {
        self.resolve(self.by_tag.get(tag))
    }

    /// Every distinct tag, sorted lexicographically.
    pub fn get_tags(&self) -> Vec<&'a str> {
        let mut tags: Vec<&'a str> = self.by_tag.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Nodes whose parent id is `parent_id`, in original order.
    ///
    /// Works for parents absent from the collection too.
    pub fn get_children(&self, parent_id: &str) -> Vec<&'a MemoryNode> {
        self.resolve(self.children.get(parent_id))
    }

    /// Nodes without a parent, in original order.
    pub fn get_roots(&self) -> Vec<&'a MemoryNode> {
        self.filter(|node| node.is_root())
    }

    /// The parent of node `id`, if both exist in the collection.
    pub fn get_parent(&self, id: &str) -> Option<&'a MemoryNode> {
        let node = self.get(id)?;
        if node.is_root() {
            return None;
        }
        self.get(&node.parent_id)
    }

    /// Rank nodes with embeddings by cosine similarity to `query`.
    ///
    /// Nodes without an embedding are skipped. Results are sorted by score,
    /// highest first, with ties kept in collection order. A `limit` of 0
    /// returns every scored node. An empty query returns nothing.
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<SearchResult<'a>> {
        if query.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<SearchResult<'a>> = self
            .nodes
            .iter()
            .filter(|node| node.has_embedding())
            .map(|node| SearchResult {
                node,
                score: cosine_similarity(query, &node.embedding),
            })
            .collect();

        // stable: equal scores keep collection order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        if limit > 0 {
            results.truncate(limit);
        }
        results
    }

    /// Case-insensitive substring search over content.
    ///
    /// Linear scan in collection order that stops after `limit` matches
    /// (0 means no limit).
    pub fn search_by_content(&self, query: &str, limit: usize) -> Vec<&'a MemoryNode> {
        let needle = query.to_lowercase();
        let matches = self
            .nodes
            .iter()
            .filter(|node| node.content.to_lowercase().contains(&needle));

        if limit > 0 {
            matches.take(limit).collect()
        } else {
            matches.collect()
        }
    }

    /// Nodes satisfying `predicate`, in original order.
    pub fn filter<F>(&self, predicate: F) -> Vec<&'a MemoryNode>
    where
        F: Fn(&MemoryNode) -> bool,
    {
        self.nodes.iter().filter(|node| predicate(node)).collect()
    }
}
