//! In-memory navigation and search over decoded nodes.
//!
//! [`MemoryTree`] is built once from a node slice and answers:
//!
//! - identity lookups (`get`)
//! - tag and parent/child lookups (`get_by_tag`, `get_children`, `get_roots`)
//! - cosine-ranked vector search (`search`)
//! - substring and predicate scans (`search_by_content`, `filter`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use engram_core::format::read_file;
//!
//! let file = read_file("notes.engram")?;
//! let tree = file.tree();
//!
//! for hit in tree.search(&query_embedding, 5) {
//!     println!("{:.3} {}", hit.score, hit.node.content);
//! }
//! ```

mod index;
mod similarity;

pub use index::{MemoryTree, SearchResult};
pub use similarity::cosine_similarity;
