// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-memory rollup of a file's summary section: schemas, channels, the
//! chunk/attachment/metadata indexes, and statistics. A [`Summary`] is
//! produced either by the seeking reader (parsed straight from the summary
//! section) or by the writer (built up incrementally as records are
//! written, then serialized at `finish`).

use std::collections::BTreeMap;

use crate::records::{
    AttachmentIndex, Channel, ChunkIndex, MetadataIndex, Schema, Statistics, SummaryOffset,
};

/// Everything the summary section of an MCAP file can hold.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub statistics: Option<Statistics>,
    pub schemas: BTreeMap<u16, Schema>,
    pub channels: BTreeMap<u16, Channel>,
    pub chunk_indexes: Vec<ChunkIndex>,
    pub attachment_indexes: Vec<AttachmentIndex>,
    pub metadata_indexes: Vec<MetadataIndex>,
    /// SummaryOffset records as actually found in the file (empty when the
    /// original writer had `use_summary_offsets` off, or when there is no
    /// summary section at all). Distinct from [`Summary::summary_offsets`],
    /// which *computes* a fresh set for a summary about to be written.
    pub summary_offset_records: Vec<SummaryOffset>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the list of [`SummaryOffset`] records describing each opcode
    /// group, given the file offset at which the summary section starts
    /// and the byte length each group occupied once serialized.
    ///
    /// `group_lengths` supplies, in write order, the serialized length of
    /// each non-empty opcode group this summary will emit (Schema,
    /// Channel, ChunkIndex, AttachmentIndex, Statistics, MetadataIndex),
    /// paired with that group's opcode.
    pub fn summary_offsets(
        summary_start: u64,
        groups: &[(u8, u64)],
    ) -> Vec<SummaryOffset> {
        let mut offsets = Vec::with_capacity(groups.len());
        let mut cursor = summary_start;
        for &(opcode, length) in groups {
            offsets.push(SummaryOffset {
                group_opcode: opcode,
                group_start: cursor,
                group_length: length,
            });
            cursor += length;
        }
        offsets
    }
}
