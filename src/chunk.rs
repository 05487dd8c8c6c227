// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk payload compression. A Chunk record's `data` field holds zero or
//! more framed Schema/Channel/Message records, optionally compressed as a
//! whole. `compression` selects the codec: `""` (identity), `"lz4"`, or
//! `"zstd"`.
//!
//! The teacher's reader used `lz4_flex`'s raw block API
//! (`lz4_flex::decompress`), which does not interoperate with MCAP files
//! produced by the reference writer — MCAP's `lz4` compression is the LZ4
//! *frame* format, not a bare block. This module uses `lz4_flex::frame`
//! instead.

use std::io::{Read, Write};

use crate::byte_codec::crc32;
use crate::error::{McapError, Result};

/// A chunk compression codec, named by the Chunk record's `compression`
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Compression::None),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Ok(Compression::Zstd),
            other => Err(McapError::InvalidValue(format!(
                "unsupported chunk compression '{other}'"
            ))),
        }
    }
}

/// Compress `uncompressed` with the given codec, for use as a Chunk
/// record's `data` field.
pub fn compress(compression: Compression, uncompressed: &[u8]) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(uncompressed.to_vec()),
        Compression::Lz4 => {
            let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
            encoder
                .write_all(uncompressed)
                .map_err(McapError::Io)?;
            encoder
                .finish()
                .map_err(|e| McapError::InvalidValue(format!("lz4 frame encode failed: {e}")))
        }
        Compression::Zstd => zstd::stream::encode_all(uncompressed, 0).map_err(McapError::Io),
    }
}

/// Decompress a Chunk record's `data` field, then verify the uncompressed
/// payload against `expected_crc` (skipped when `expected_crc == 0`, the
/// file's convention for "not computed").
pub fn decompress_and_validate(
    compression: Compression,
    data: &[u8],
    uncompressed_size: u64,
    expected_crc: u32,
) -> Result<Vec<u8>> {
    let uncompressed = decompress(compression, data, uncompressed_size)?;
    if expected_crc != 0 {
        let actual = crc32(&uncompressed);
        if actual != expected_crc {
            return Err(McapError::CrcValidationError {
                expected: expected_crc,
                actual,
                record_kind: "chunk",
            });
        }
    }
    Ok(uncompressed)
}

fn decompress(compression: Compression, data: &[u8], uncompressed_size: u64) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Lz4 => {
            let mut decoder = lz4_flex::frame::FrameDecoder::new(data);
            let mut out = Vec::with_capacity(uncompressed_size as usize);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| McapError::InvalidValue(format!("lz4 frame decode failed: {e}")))?;
            Ok(out)
        }
        Compression::Zstd => {
            zstd::stream::decode_all(data).map_err(McapError::Io)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trip() {
        let data = b"hello chunk world".to_vec();
        let compressed = compress(Compression::None, &data).unwrap();
        let decompressed =
            decompress_and_validate(Compression::None, &compressed, data.len() as u64, 0)
                .unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn lz4_frame_round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(100);
        let compressed = compress(Compression::Lz4, &data).unwrap();
        let decompressed =
            decompress_and_validate(Compression::Lz4, &compressed, data.len() as u64, 0).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn zstd_round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(100);
        let compressed = compress(Compression::Zstd, &data).unwrap();
        let decompressed =
            decompress_and_validate(Compression::Zstd, &compressed, data.len() as u64, 0).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn crc_mismatch_is_detected() {
        let data = b"abc".to_vec();
        let compressed = compress(Compression::None, &data).unwrap();
        let err =
            decompress_and_validate(Compression::None, &compressed, data.len() as u64, 0xdead_beef)
                .unwrap_err();
        assert!(matches!(err, McapError::CrcValidationError { .. }));
    }

    #[test]
    fn unknown_compression_rejected() {
        assert!(Compression::parse("snappy").is_err());
    }
}
