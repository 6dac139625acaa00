//! Whole-buffer encode and decode.
//!
//! Layout: 6 magic bytes, then the MessagePack header map, then the
//! MessagePack array of nodes. The header has no length prefix; its end is
//! wherever the decoder stops after reading exactly one value. The payload
//! digest lives in `header.security.integrity`.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::types::{EngramFile, EngramHeader, MemoryNode};
use crate::error::{Error, Result};

/// Magic prefix of every Engram file (`"ENGRAM"`).
pub const MAGIC_BYTES: [u8; 6] = [0x45, 0x4E, 0x47, 0x52, 0x41, 0x4D];

/// Version stamped into headers that don't carry one.
pub const DEFAULT_VERSION: &str = "1.0";

/// Codec behaviour switches.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Compare the payload digest on whole-buffer decode (default: true).
    pub verify_integrity: bool,
    /// Version written when the header's version is empty.
    pub default_version: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            verify_integrity: true,
            default_version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable digest verification on decode.
    pub fn with_verify_integrity(mut self, verify: bool) -> Self {
        self.verify_integrity = verify;
        self
    }

    /// Set the version used for headers without one.
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = version.into();
        self
    }
}

/// Encoder/decoder for the Engram container.
#[derive(Debug, Clone, Default)]
pub struct EngramCodec {
    config: CodecConfig,
}

impl EngramCodec {
    /// Create a codec with the given configuration.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode a file, stamping `modified` with the current time.
    pub fn encode(&self, file: &EngramFile) -> Result<Vec<u8>> {
        self.encode_at(file, Utc::now())
    }

    /// Encode a file as of `now`.
    ///
    /// The caller's header is not modified. The written header always carries
    /// a fresh `nodeCount`, `modified` and `security.integrity`; `created`
    /// and `version` are filled in only when empty.
    pub fn encode_at(&self, file: &EngramFile, now: DateTime<Utc>) -> Result<Vec<u8>> {
        let payload = encode_nodes(&file.nodes)?;
        let integrity = compute_integrity(&payload);
        let header = self.stamp_header(&file.header, file.nodes.len(), integrity, now);

        let header_bytes =
            rmp_serde::to_vec_named(&header).map_err(|e| Error::encoding("header", e))?;

        let mut buf = Vec::with_capacity(MAGIC_BYTES.len() + header_bytes.len() + payload.len());
        buf.extend_from_slice(&MAGIC_BYTES);
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&payload);

        debug!(
            nodes = file.nodes.len(),
            header_bytes = header_bytes.len(),
            payload_bytes = payload.len(),
            "Encoded engram file"
        );
        Ok(buf)
    }

    /// Decode a complete buffer.
    ///
    /// The digest is checked before the payload is interpreted, so corrupted
    /// payloads surface as [`Error::IntegrityFailed`] rather than as decode
    /// errors.
    pub fn decode(&self, data: &[u8]) -> Result<EngramFile> {
        let (header, payload) = split_header(data)?;

        if self.config.verify_integrity {
            verify_payload(&header, payload)?;
        } else {
            debug!("Integrity verification disabled, skipping digest check");
        }

        // a nil payload is how other SDKs write an empty collection
        let nodes: Vec<MemoryNode> = rmp_serde::from_slice::<Option<Vec<MemoryNode>>>(payload)
            .map_err(|e| Error::decoding("nodes", e))?
            .unwrap_or_default();

        if nodes.len() != header.node_count {
            debug!(
                declared = header.node_count,
                actual = nodes.len(),
                "Header node count differs from payload"
            );
        }
        debug!(nodes = nodes.len(), payload_bytes = payload.len(), "Decoded engram file");

        Ok(EngramFile { header, nodes })
    }

    fn stamp_header(
        &self,
        header: &EngramHeader,
        node_count: usize,
        integrity: String,
        now: DateTime<Utc>,
    ) -> EngramHeader {
        let mut header = header.clone();
        header.node_count = node_count;
        header.modified = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        if header.created.is_empty() {
            header.created = header.modified.clone();
        }
        if header.version.is_empty() {
            header.version = self.config.default_version.clone();
        }
        header.security.integrity = integrity;
        header
    }
}

/// Encode a file with the default configuration.
pub fn encode(file: &EngramFile) -> Result<Vec<u8>> {
    EngramCodec::default().encode(file)
}

/// Decode a buffer with the default configuration.
pub fn decode(data: &[u8]) -> Result<EngramFile> {
    EngramCodec::default().decode(data)
}

/// Check a buffer's payload digest.
///
/// Returns `Ok(false)` on a digest mismatch; any other failure, including
/// a malformed payload behind a valid digest, is returned as an error.
pub fn verify_bytes(data: &[u8]) -> Result<bool> {
    match decode(data) {
        Ok(_) => Ok(true),
        Err(e) if e.is_integrity_failure() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Lowercase hex SHA-256 of the payload bytes.
pub fn compute_integrity(payload: &[u8]) -> String {
    format!("{:x}", Sha256::digest(payload))
}

pub(crate) fn encode_nodes(nodes: &[MemoryNode]) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(nodes).map_err(|e| Error::encoding("nodes", e))
}

pub(crate) fn has_magic(prefix: &[u8]) -> bool {
    prefix.len() >= MAGIC_BYTES.len() && prefix[..MAGIC_BYTES.len()] == MAGIC_BYTES
}

/// Validate the magic prefix and decode the header, returning it along with
/// the untouched payload bytes.
fn split_header(data: &[u8]) -> Result<(EngramHeader, &[u8])> {
    if !has_magic(data) {
        return Err(Error::InvalidMagic);
    }

    let mut rest = &data[MAGIC_BYTES.len()..];
    let header: EngramHeader =
        rmp_serde::from_read(&mut rest).map_err(|e| Error::decoding("header", e))?;
    Ok((header, rest))
}

fn verify_payload(header: &EngramHeader, payload: &[u8]) -> Result<()> {
    let expected = &header.security.integrity;
    if expected.is_empty() {
        debug!("No integrity digest in header, skipping check");
        return Ok(());
    }

    let actual = compute_integrity(payload);
    if !expected.eq_ignore_ascii_case(&actual) {
        warn!(%expected, %actual, "Engram payload digest mismatch");
        return Err(Error::integrity_failed(expected.clone(), actual));
    }
    Ok(())
}
