//! Record and header types for the Engram container.
//!
//! Field names are part of the wire contract: every struct is serialized as a
//! string-keyed MessagePack map using the camelCase names below. Optional
//! fields are left out entirely when empty or zero, and missing fields decode
//! to their zero value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::timestamp::Timestamp;
use crate::tree::MemoryTree;

/// Free-form metadata attached to links, nodes and files.
pub type CustomFields = BTreeMap<String, rmpv::Value>;

fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

fn is_zero_usize(v: &usize) -> bool {
    *v == 0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

/// A single memory record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryNode {
    /// Identifier, unique within a collection.
    pub id: String,
    /// Text content.
    pub content: String,
    /// Embedding vector; empty means the node has none.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Tags in insertion order. Duplicates are kept.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Entities extracted from the content.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    /// Directed relations to other nodes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Provenance and scoring metadata.
    #[serde(skip_serializing_if = "NodeMeta::is_empty")]
    pub metadata: NodeMeta,
    /// Declared child ids.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Parent id, empty for roots. Not validated against the collection.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
}

impl MemoryNode {
    /// Create a node with an id and content.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Set the embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Append a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Append several tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Append an extracted entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Append a link.
    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Replace the node metadata.
    pub fn with_metadata(mut self, metadata: NodeMeta) -> Self {
        self.metadata = metadata;
        self
    }

    /// Append a declared child id.
    pub fn with_child(mut self, child_id: impl Into<String>) -> Self {
        self.children.push(child_id.into());
        self
    }

    /// Append several declared child ids.
    pub fn with_children<I, S>(mut self, child_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children.extend(child_ids.into_iter().map(Into::into));
        self
    }

    /// Set the parent id.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    /// Whether the node carries an embedding.
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }

    /// Whether the node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }

    /// Whether the node carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A named entity extracted from content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub confidence: f32,
    /// Start offset in the content.
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub start: usize,
    /// End offset in the content.
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub end: usize,
}

impl Entity {
    /// Create an entity with a name and type.
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            ..Default::default()
        }
    }

    /// Set the extraction confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the span within the content.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

/// A directed relation to another node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Link {
    pub target_id: String,
    #[serde(rename = "type")]
    pub link_type: String,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub weight: f32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: CustomFields,
}

impl Link {
    /// Create a link to `target_id`.
    pub fn new(target_id: impl Into<String>, link_type: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            link_type: link_type.into(),
            ..Default::default()
        }
    }

    /// Set the link weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<rmpv::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Per-node metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeMeta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub confidence: f32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub importance: f32,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub access_count: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: CustomFields,
}

impl NodeMeta {
    /// Whether every field holds its zero value.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
            && self.created_at.is_none()
            && self.updated_at.is_none()
            && self.confidence == 0.0
            && self.importance == 0.0
            && self.access_count == 0
            && self.custom.is_empty()
    }
}

/// File-level metadata preceding the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngramHeader {
    /// Format version, `"1.0"` when written by default.
    pub version: String,
    /// RFC3339 creation time, set once.
    pub created: String,
    /// RFC3339 time of the last encode.
    pub modified: String,
    /// Number of nodes in the payload, recomputed on every encode.
    pub node_count: usize,
    #[serde(skip_serializing_if = "SchemaInfo::is_empty")]
    pub schema: SchemaInfo,
    #[serde(skip_serializing_if = "SecurityInfo::is_empty")]
    pub security: SecurityInfo,
    #[serde(skip_serializing_if = "FileMeta::is_empty")]
    pub metadata: FileMeta,
}

impl EngramHeader {
    /// Create a header with a title and otherwise default fields.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            metadata: FileMeta {
                title: title.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Schema version and embedding description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub embedding_model: String,
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub embedding_dim: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl SchemaInfo {
    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
            && self.embedding_model.is_empty()
            && self.embedding_dim == 0
            && self.features.is_empty()
    }
}

/// Integrity and encryption information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityInfo {
    /// Lowercase hex SHA-256 of the payload bytes.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub integrity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encryption: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_id: String,
}

impl SecurityInfo {
    pub fn is_empty(&self) -> bool {
        self.integrity.is_empty() && self.encryption.is_empty() && self.key_id.is_empty()
    }
}

/// Descriptive file metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMeta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: CustomFields,
}

impl FileMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.author.is_empty()
            && self.license.is_empty()
            && self.tags.is_empty()
            && self.custom.is_empty()
    }
}

/// A complete Engram file: header plus nodes in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngramFile {
    pub header: EngramHeader,
    pub nodes: Vec<MemoryNode>,
}

impl EngramFile {
    /// Create a file from a header and nodes.
    pub fn new(header: EngramHeader, nodes: Vec<MemoryNode>) -> Self {
        Self { header, nodes }
    }

    /// Create a file with a default header.
    pub fn from_nodes(nodes: Vec<MemoryNode>) -> Self {
        Self {
            header: EngramHeader::default(),
            nodes,
        }
    }

    /// Build a navigation index over this file's nodes.
    pub fn tree(&self) -> MemoryTree<'_> {
        MemoryTree::new(&self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_names(bytes: &[u8]) -> Vec<String> {
        match rmpv::decode::read_value(&mut &bytes[..]).unwrap() {
            rmpv::Value::Map(entries) => entries
                .into_iter()
                .map(|(k, _)| k.as_str().unwrap().to_string())
                .collect(),
            other => panic!("expected map, got {}", other),
        }
    }

    #[test]
    fn test_minimal_node_omits_optional_fields() {
        let node = MemoryNode::new("n1", "hello");
        let bytes = rmp_serde::to_vec_named(&node).unwrap();
        assert_eq!(field_names(&bytes), vec!["id", "content"]);
    }

    #[test]
    fn test_node_wire_names() {
        let node = MemoryNode::new("n1", "hello")
            .with_embedding(vec![0.5, 0.25])
            .with_tag("t")
            .with_entity(Entity::new("Rust", "language"))
            .with_link(Link::new("n2", "related"))
            .with_metadata(NodeMeta {
                access_count: 3,
                ..Default::default()
            })
            .with_child("n3")
            .with_parent("n0");
        let bytes = rmp_serde::to_vec_named(&node).unwrap();
        assert_eq!(
            field_names(&bytes),
            vec![
                "id", "content", "embedding", "tags", "entities", "links", "metadata",
                "children", "parentId"
            ]
        );
    }

    #[test]
    fn test_header_wire_names() {
        let header = EngramHeader {
            version: "1.0".into(),
            node_count: 2,
            security: SecurityInfo {
                key_id: "k".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let bytes = rmp_serde::to_vec_named(&header).unwrap();
        assert_eq!(
            field_names(&bytes),
            vec!["version", "created", "modified", "nodeCount", "security"]
        );
    }

    #[test]
    fn test_missing_fields_decode_as_zero() {
        // {"id": "x"}
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 1).unwrap();
        rmp::encode::write_str(&mut buf, "id").unwrap();
        rmp::encode::write_str(&mut buf, "x").unwrap();

        let node: MemoryNode = rmp_serde::from_slice(&buf).unwrap();
        assert_eq!(node.id, "x");
        assert!(node.content.is_empty());
        assert!(node.metadata.is_empty());
        assert!(node.is_root());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 2).unwrap();
        rmp::encode::write_str(&mut buf, "id").unwrap();
        rmp::encode::write_str(&mut buf, "x").unwrap();
        rmp::encode::write_str(&mut buf, "futureField").unwrap();
        rmp::encode::write_u32(&mut buf, 7).unwrap();

        let node: MemoryNode = rmp_serde::from_slice(&buf).unwrap();
        assert_eq!(node.id, "x");
    }

    #[test]
    fn test_node_helpers() {
        let node = MemoryNode::new("a", "b")
            .with_tags(["x", "y", "x"])
            .with_child("c1")
            .with_children(["c2", "c3"]);
        assert_eq!(node.tags.len(), 3);
        assert_eq!(node.children, vec!["c1", "c2", "c3"]);
        assert!(node.has_tag("y"));
        assert!(!node.has_embedding());
    }
}
