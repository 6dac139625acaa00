//! Property-based tests for the container format and search using proptest.
//!
//! These tests check the invariants other SDKs rely on:
//!
//! - Decoding an encoded file reproduces the nodes and the node count
//! - Any single-bit flip in the payload is caught by the digest
//! - Any single-bit flip in the magic prefix is rejected as a foreign file
//! - Streaming yields the same nodes as whole-buffer decoding
//! - Cosine similarity stays bounded and never produces NaN
