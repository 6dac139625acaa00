//! Forward-only, record-at-a-time decoding for large files.
//!
//! Streaming performs no integrity verification: the digest spans the whole
//! payload and can only be checked once every byte has been seen. Use
//! [`decode`](super::decode) when the digest must be enforced.

use std::io::{self, Read};

use tracing::{debug, trace};

use super::codec::has_magic;
use super::types::{EngramHeader, MemoryNode};
use crate::error::{Error, Result};

/// Pull-based reader producing one [`MemoryNode`] per call.
///
/// Holds cursor state; drive a given reader from one consumer at a time.
pub struct StreamReader<R> {
    reader: R,
    header: EngramHeader,
    remaining: usize,
    produced: usize,
}

impl<R: Read> StreamReader<R> {
    /// Verify the magic bytes and decode the header.
    ///
    /// The payload's array length is read here as well; iteration is bounded
    /// by the smaller of it and `header.node_count`.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 6];
        match reader.read_exact(&mut magic) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(Error::InvalidMagic),
            Err(e) => return Err(e.into()),
        }
        if !has_magic(&magic) {
            return Err(Error::InvalidMagic);
        }

        let header: EngramHeader =
            rmp_serde::from_read(&mut reader).map_err(|e| Error::decoding("header", e))?;

        let remaining = match rmp::decode::read_array_len(&mut reader) {
            Ok(len) => (len as usize).min(header.node_count),
            Err(rmp::decode::ValueReadError::InvalidMarkerRead(e))
                if e.kind() == io::ErrorKind::UnexpectedEof =>
            {
                0
            }
            Err(rmp::decode::ValueReadError::TypeMismatch(rmp::Marker::Null)) => 0,
            Err(e) => return Err(Error::decoding("nodes", e.into())),
        };

        debug!(
            declared = header.node_count,
            readable = remaining,
            "Opened engram stream"
        );

        Ok(Self {
            reader,
            header,
            remaining,
            produced: 0,
        })
    }

    /// Decode the next node, or `Ok(None)` once the stream is exhausted.
    ///
    /// End of input at a record boundary ends the stream without error. A
    /// malformed record is returned as an error and ends the stream.
    pub fn next_node(&mut self) -> Result<Option<MemoryNode>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        match rmp_serde::from_read::<_, MemoryNode>(&mut self.reader) {
            Ok(node) => {
                self.remaining -= 1;
                self.produced += 1;
                trace!(id = %node.id, index = self.produced - 1, "Streamed node");
                Ok(Some(node))
            }
            Err(rmp_serde::decode::Error::InvalidMarkerRead(e))
                if e.kind() == io::ErrorKind::UnexpectedEof =>
            {
                debug!(produced = self.produced, "Engram stream ended early");
                self.remaining = 0;
                Ok(None)
            }
            Err(e) => {
                self.remaining = 0;
                Err(Error::decoding("node", e))
            }
        }
    }

    /// The decoded file header.
    pub fn header(&self) -> &EngramHeader {
        &self.header
    }

    /// Upper bound on nodes still to be produced.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Nodes produced so far.
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Recover the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for StreamReader<R> {
    type Item = Result<MemoryNode>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_node().transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<R> std::fmt::Debug for StreamReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("node_count", &self.header.node_count)
            .field("remaining", &self.remaining)
            .field("produced", &self.produced)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::codec::{encode, encode_nodes, MAGIC_BYTES};
    use crate::format::types::EngramFile;
    use pretty_assertions::assert_eq;

    fn nodes(n: usize) -> Vec<MemoryNode> {
        (0..n)
            .map(|i| {
                MemoryNode::new(format!("n{}", i), format!("content {}", i))
                    .with_embedding(vec![i as f32, 1.0])
            })
            .collect()
    }

    /// Magic + header with the given count + raw payload bytes.
    fn assemble(node_count: usize, payload: &[u8]) -> Vec<u8> {
        let header = EngramHeader {
            node_count,
            ..Default::default()
        };
        let mut buf = MAGIC_BYTES.to_vec();
        buf.extend(rmp_serde::to_vec_named(&header).unwrap());
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_stream_matches_whole_decode() {
        let file = EngramFile::from_nodes(nodes(5));
        let data = encode(&file).unwrap();

        let reader = StreamReader::new(&data[..]).unwrap();
        assert_eq!(reader.header().node_count, 5);
        assert_eq!(reader.remaining(), 5);

        let streamed: Vec<MemoryNode> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(streamed, file.nodes);
    }

    #[test]
    fn test_next_node_after_exhaustion() {
        let data = encode(&EngramFile::from_nodes(nodes(1))).unwrap();
        let mut reader = StreamReader::new(std::io::Cursor::new(data)).unwrap();

        assert!(reader.next_node().unwrap().is_some());
        assert!(reader.next_node().unwrap().is_none());
        assert!(reader.next_node().unwrap().is_none());
        assert_eq!(reader.produced(), 1);
    }

    #[test]
    fn test_node_count_bounds_iteration() {
        let payload = encode_nodes(&nodes(3)).unwrap();
        let data = assemble(2, &payload);

        let streamed: Vec<MemoryNode> = StreamReader::new(&data[..])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(streamed.len(), 2);
        assert_eq!(streamed[1].id, "n1");
    }

    #[test]
    fn test_end_of_input_stops_cleanly() {
        let mut payload = Vec::new();
        rmp::encode::write_array_len(&mut payload, 3).unwrap();
        for node in nodes(2) {
            payload.extend(rmp_serde::to_vec_named(&node).unwrap());
        }
        let data = assemble(3, &payload);

        let streamed: Vec<MemoryNode> = StreamReader::new(&data[..])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(streamed.len(), 2);
    }

    #[test]
    fn test_missing_payload_yields_nothing() {
        let data = assemble(4, &[]);
        let mut reader = StreamReader::new(&data[..]).unwrap();
        assert_eq!(reader.remaining(), 0);
        assert!(reader.next_node().unwrap().is_none());
    }

    #[test]
    fn test_nil_payload_yields_nothing() {
        let data = assemble(0, &[0xc0]);
        let mut reader = StreamReader::new(&data[..]).unwrap();
        assert_eq!(reader.remaining(), 0);
        assert!(reader.next_node().unwrap().is_none());
    }

    #[test]
    fn test_malformed_record_ends_stream() {
        let mut payload = Vec::new();
        rmp::encode::write_array_len(&mut payload, 2).unwrap();
        payload.extend(rmp_serde::to_vec_named(&nodes(1)[0]).unwrap());
        payload.push(0xc1);
        let data = assemble(2, &payload);

        let mut reader = StreamReader::new(&data[..]).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(
            reader.next(),
            Some(Err(Error::Decoding { context: "node", .. }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_no_integrity_check() {
        let file = EngramFile::from_nodes(vec![MemoryNode::new("x", "abc")]);
        let mut data = encode(&file).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0x01;

        let streamed: Vec<MemoryNode> = StreamReader::new(&data[..])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(streamed[0].content, "abb");
    }

    #[test]
    fn test_invalid_magic() {
        assert!(StreamReader::new(&b"ENG"[..]).unwrap_err().is_invalid_magic());
        assert!(StreamReader::new(&b"NOTENGRAM"[..])
            .unwrap_err()
            .is_invalid_magic());
    }
}
