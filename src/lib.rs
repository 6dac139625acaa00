//! # engram-core
//!
//! Reader, writer and in-memory index for Engram memory files: a portable
//! container of memory nodes (content, embeddings, tags, entities, links)
//! with file-level metadata and a SHA-256 payload digest. Files written here
//! are byte-compatible with the other Engram SDKs.
//!
//! ## Core Components
//!
//! - **Format**: wire types, whole-buffer codec, streaming reader, file I/O
//! - **Tree**: identity/tag/hierarchy index and similarity search
//!
//! ## Example
//!
//! ```rust,ignore
//! use engram_core::{read_file, write_file, EngramFile, MemoryNode};
//!
//! let file = EngramFile::from_nodes(vec![
//!     MemoryNode::new("root", "Project notes").with_tag("important"),
//!     MemoryNode::new("auth", "The API uses JWT for auth")
//!         .with_parent("root")
//!         .with_embedding(vec![0.12, 0.87, 0.03]),
//! ]);
//! write_file("notes.engram", &file)?;
//!
//! let loaded = read_file("notes.engram")?;
//! let tree = loaded.tree();
//! let hits = tree.search(&[0.1, 0.9, 0.0], 3);
//! let children = tree.get_children("root");
//! ```

pub mod error;
pub mod format;
pub mod tree;

// Re-exports for convenience
pub use error::{Error, Result};
pub use format::{
    compute_integrity, decode, encode, open_stream, read_file, verify_bytes, verify_integrity,
    write_file, CodecConfig, CustomFields, EngramCodec, EngramFile, EngramHeader, Entity,
    FileMeta, Link, MemoryNode, NodeMeta, SchemaInfo, SecurityInfo, StreamReader, Timestamp,
    DEFAULT_VERSION, MAGIC_BYTES,
};
pub use tree::{cosine_similarity, MemoryTree, SearchResult};
