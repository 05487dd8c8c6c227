// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Error types for the MCAP container engine.

use thiserror::Error;

/// Errors that can occur while reading or writing an MCAP container.
#[derive(Debug, Error)]
pub enum McapError {
    /// The magic bytes at the start or end of the stream did not match.
    #[error("invalid MCAP magic bytes")]
    InvalidMagic,

    /// A read came up short while decoding a record.
    #[error("unexpected end of file while decoding a record")]
    EndOfFile,

    /// A framed record declared a length above the configured cap.
    #[error(
        "record length {length} for opcode 0x{opcode:02x} exceeds the configured limit of {limit} bytes"
    )]
    RecordLengthLimitExceeded {
        /// Opcode of the oversize record.
        opcode: u8,
        /// Declared record length.
        length: u64,
        /// Configured limit.
        limit: u64,
    },

    /// A CRC did not match the expected value.
    #[error("CRC validation failed in {record_kind}: expected {expected}, calculated {actual}")]
    CrcValidationError {
        /// Expected CRC value, as stored in the file.
        expected: u32,
        /// Actual CRC value, as calculated while reading.
        actual: u32,
        /// Which kind of record/section the CRC covers.
        record_kind: &'static str,
    },

    /// A value read from the stream was not well-formed (invalid UTF-8, a
    /// length-prefixed block that over- or under-ran its declared bounds).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// An append-mode re-registration of a schema or channel conflicted with
    /// an existing entry carrying different fields.
    #[error("{kind} '{name}' differs from previous {kind} record with the same identity")]
    AppendConflict {
        /// `"schema"` or `"channel"`.
        kind: &'static str,
        /// Name or topic of the conflicting record.
        name: String,
    },

    /// A writer or reader API call was not valid in the current state.
    #[error("invalid state: {0}")]
    StateError(String),

    /// No decoder plug-in accepted `(message_encoding, schema)`.
    #[error("no decoder found for message_encoding '{message_encoding}'")]
    DecoderNotFound {
        /// The message encoding that no plug-in claimed.
        message_encoding: String,
    },

    /// Underlying I/O error from the byte source.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type used throughout the MCAP container engine.
pub type Result<T> = std::result::Result<T, McapError>;
