// Checksums and block search for the rsync algorithm.
//
// This module provides:
// - Rolling weak checksum (rsync rollsum)
// - Truncated MD4 strong checksum
// - Arena-style weak-sum index over signature blocks
// - Block search and reverse block location
// - Signature parameters (block length, strong length)

pub mod config;
pub mod matching;
pub mod rolling;
pub mod strong;
pub mod table;
