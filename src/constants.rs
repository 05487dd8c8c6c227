// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP format constants: magic bytes, record opcodes, and well-known
//! profile/encoding strings.
//!
//! Using a single source of truth for these constants prevents bugs from
//! opcode mismatches between reader and writer implementations.

/// MCAP file magic bytes (at start and end of file).
pub const MCAP_MAGIC: [u8; 8] = [0x89, 0x4D, 0x43, 0x41, 0x50, 0x30, 0x0D, 0x0A];

// MCAP record opcodes.

/// Header record - must be first record after magic.
pub const OP_HEADER: u8 = 0x01;
/// Footer record - contains summary section offsets.
pub const OP_FOOTER: u8 = 0x02;
/// Schema record - defines message schemas.
pub const OP_SCHEMA: u8 = 0x03;
/// Channel record - defines channels/topics.
pub const OP_CHANNEL: u8 = 0x04;
/// Message record - contains message data.
pub const OP_MESSAGE: u8 = 0x05;
/// Chunk record - contains compressed messages.
pub const OP_CHUNK: u8 = 0x06;
/// Message index record - indexes messages within a chunk.
pub const OP_MESSAGE_INDEX: u8 = 0x07;
/// Chunk index record - indexes chunks in the summary section.
pub const OP_CHUNK_INDEX: u8 = 0x08;
/// Attachment record - contains an embedded file.
pub const OP_ATTACHMENT: u8 = 0x09;
/// Attachment index record - indexes attachments in the summary section.
pub const OP_ATTACHMENT_INDEX: u8 = 0x0A;
/// Statistics record - file-level counts and time bounds.
pub const OP_STATISTICS: u8 = 0x0B;
/// Metadata record - arbitrary key-value metadata.
pub const OP_METADATA: u8 = 0x0C;
/// Metadata index record - indexes metadata in the summary section.
pub const OP_METADATA_INDEX: u8 = 0x0D;
/// Summary offset record - describes a contiguous group in the summary section.
pub const OP_SUMMARY_OFFSET: u8 = 0x0E;
/// Data end record - marks the end of the data section.
pub const OP_DATA_END: u8 = 0x0F;

/// Well-known profile identifiers.
pub mod profiles {
    /// No particular conventions.
    pub const NONE: &str = "";
    /// ROS1 conventions.
    pub const ROS1: &str = "ros1";
    /// ROS2 conventions.
    pub const ROS2: &str = "ros2";
}

/// Well-known schema encodings.
pub mod schema_encodings {
    /// No schema.
    pub const NONE: &str = "";
    /// Protobuf `FileDescriptorSet`.
    pub const PROTOBUF: &str = "protobuf";
    /// FlatBuffers schema.
    pub const FLATBUFFER: &str = "flatbuffer";
    /// ROS1 `.msg` text.
    pub const ROS1MSG: &str = "ros1msg";
    /// ROS2 `.msg` text.
    pub const ROS2MSG: &str = "ros2msg";
    /// ROS2 `.idl` text.
    pub const ROS2IDL: &str = "ros2idl";
    /// JSON Schema.
    pub const JSONSCHEMA: &str = "jsonschema";
}

/// Well-known message encodings.
pub mod message_encodings {
    /// ROS1 serialization.
    pub const ROS1: &str = "ros1";
    /// Common Data Representation (ROS2/DDS).
    pub const CDR: &str = "cdr";
    /// Protobuf wire format.
    pub const PROTOBUF: &str = "protobuf";
    /// FlatBuffers wire format.
    pub const FLATBUFFER: &str = "flatbuffer";
    /// CBOR.
    pub const CBOR: &str = "cbor";
    /// JSON.
    pub const JSON: &str = "json";
}
