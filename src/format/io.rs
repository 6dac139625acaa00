//! File-level helpers over the codec.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, instrument};

use super::codec::{decode, encode, verify_bytes};
use super::stream::StreamReader;
use super::types::EngramFile;
use crate::error::Result;

/// Read and decode an Engram file, verifying its digest.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_file(path: impl AsRef<Path>) -> Result<EngramFile> {
    let data = fs::read(path.as_ref())?;
    debug!(bytes = data.len(), "Read engram file");
    decode(&data)
}

/// Encode and write an Engram file, replacing any existing file.
#[instrument(skip_all, fields(path = %path.as_ref().display(), nodes = file.nodes.len()))]
pub fn write_file(path: impl AsRef<Path>, file: &EngramFile) -> Result<()> {
    let data = encode(file)?;
    fs::write(path.as_ref(), &data)?;
    debug!(bytes = data.len(), "Wrote engram file");
    Ok(())
}

/// Check a file's payload digest.
///
/// A digest mismatch yields `Ok(false)`. I/O failures, bad magic and
/// malformed content are returned as errors.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn verify_integrity(path: impl AsRef<Path>) -> Result<bool> {
    let data = fs::read(path.as_ref())?;
    verify_bytes(&data)
}

/// Open a file for streaming, record-at-a-time decoding.
pub fn open_stream(path: impl AsRef<Path>) -> Result<StreamReader<BufReader<File>>> {
    let file = File::open(path.as_ref())?;
    StreamReader::new(BufReader::new(file))
}
