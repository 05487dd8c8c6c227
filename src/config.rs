// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Writer and reader configuration. These are plain option structs, not
//! loaded from a config file format — in-process knobs don't need one.

use crate::chunk::Compression;

/// Which summary index groups a writer should maintain and emit.
///
/// A hand-rolled four-bit set rather than the `bitflags` crate: the
/// combinations here never grow past these four kinds, so a dependency for
/// it would buy nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexType(u8);

impl IndexType {
    pub const NONE: IndexType = IndexType(0);
    pub const ATTACHMENT: IndexType = IndexType(1 << 0);
    pub const CHUNK: IndexType = IndexType(1 << 1);
    pub const MESSAGE: IndexType = IndexType(1 << 2);
    pub const METADATA: IndexType = IndexType(1 << 3);
    pub const ALL: IndexType = IndexType(
        Self::ATTACHMENT.0 | Self::CHUNK.0 | Self::MESSAGE.0 | Self::METADATA.0,
    );

    pub fn contains(self, other: IndexType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for IndexType {
    type Output = IndexType;
    fn bitor(self, rhs: IndexType) -> IndexType {
        IndexType(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for IndexType {
    fn bitor_assign(&mut self, rhs: IndexType) {
        self.0 |= rhs.0;
    }
}

/// Writer configuration, per `spec.md` §4.5.1.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Target uncompressed size (bytes) that triggers chunk emission.
    pub chunk_size: u64,
    /// Chunk payload compression codec.
    pub compression: Compression,
    /// Which summary index groups to maintain.
    pub index_types: IndexType,
    /// Emit all schemas again in the summary section.
    pub repeat_schemas: bool,
    /// Emit all channels again in the summary section.
    pub repeat_channels: bool,
    /// If false, Messages/Schemas/Channels go straight into the data
    /// section with no Chunk wrapping.
    pub use_chunking: bool,
    /// Emit a Statistics record into the summary.
    pub use_statistics: bool,
    /// Emit SummaryOffset records after the summary body.
    pub use_summary_offsets: bool,
    /// Compute the chunk uncompressed CRC and the summary CRC.
    pub enable_crcs: bool,
    /// Also maintain the running data-section CRC for DataEnd.
    pub enable_data_crcs: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            compression: Compression::Zstd,
            index_types: IndexType::ALL,
            repeat_schemas: true,
            repeat_channels: true,
            use_chunking: true,
            use_statistics: true,
            use_summary_offsets: true,
            enable_crcs: true,
            enable_data_crcs: false,
        }
    }
}

/// Reader configuration, per `spec.md` §4.4.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Start mid-stream: skip the leading MAGIC check (used to read a
    /// standalone summary section).
    pub skip_magic: bool,
    /// Yield Chunk records raw instead of expanding their inner records.
    pub emit_chunks: bool,
    /// Verify chunk-uncompressed and data-section CRCs while reading.
    pub validate_crcs: bool,
    /// Reject any record whose declared length exceeds this, before
    /// allocating a buffer for its payload.
    pub record_size_limit: u64,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            skip_magic: false,
            emit_chunks: false,
            validate_crcs: false,
            record_size_limit: 4 * 1024 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_type_combines_and_checks() {
        let both = IndexType::CHUNK | IndexType::MESSAGE;
        assert!(both.contains(IndexType::CHUNK));
        assert!(both.contains(IndexType::MESSAGE));
        assert!(!both.contains(IndexType::ATTACHMENT));
    }

    #[test]
    fn all_contains_everything() {
        assert!(IndexType::ALL.contains(IndexType::ATTACHMENT));
        assert!(IndexType::ALL.contains(IndexType::CHUNK));
        assert!(IndexType::ALL.contains(IndexType::MESSAGE));
        assert!(IndexType::ALL.contains(IndexType::METADATA));
    }

    #[test]
    fn writer_defaults_match_reference() {
        let opts = WriterOptions::default();
        assert_eq!(opts.chunk_size, 1024 * 1024);
        assert_eq!(opts.compression, Compression::Zstd);
        assert!(!opts.enable_data_crcs);
        assert!(opts.enable_crcs);
    }
}
