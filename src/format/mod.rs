//! The Engram container format.
//!
//! An Engram file is a magic prefix, a MessagePack header, and a MessagePack
//! array of memory nodes:
//!
//! ```text
//! offset 0      6 bytes   "ENGRAM"
//! offset 6      header    map of header fields
//! offset 6+H    payload   array of node maps
//! ```
//!
//! The header's `security.integrity` field holds the SHA-256 of the payload
//! bytes. Whole-buffer decoding checks it before touching the payload;
//! streaming decoding does not.
//!
//! ## Components
//!
//! - [`types`]: nodes, headers and their wire names
//! - [`codec`]: whole-buffer [`encode`]/[`decode`] and digest helpers
//! - [`stream`]: [`StreamReader`] for record-at-a-time decoding
//! - [`io`]: file wrappers
//!
//! ## Example
//!
//! ```rust,ignore
//! use engram_core::format::{read_file, write_file, EngramFile, MemoryNode};
//!
//! let file = EngramFile::from_nodes(vec![
//!     MemoryNode::new("n1", "The API uses JWT for auth").with_tag("auth"),
//! ]);
//! write_file("notes.engram", &file)?;
//!
//! let loaded = read_file("notes.engram")?;
//! assert_eq!(loaded.header.node_count, 1);
//! ```

pub mod codec;
pub mod io;
pub mod stream;
pub mod timestamp;
pub mod types;

mod proptest;

pub use codec::{
    compute_integrity, decode, encode, verify_bytes, CodecConfig, EngramCodec, DEFAULT_VERSION,
    MAGIC_BYTES,
};
pub use io::{open_stream, read_file, verify_integrity, write_file};
pub use stream::StreamReader;
pub use timestamp::{Timestamp, TIMESTAMP_EXT_TYPE};
pub use types::{
    CustomFields, EngramFile, EngramHeader, Entity, FileMeta, Link, MemoryNode, NodeMeta,
    SchemaInfo, SecurityInfo,
};
