// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP record types: one struct per opcode, each with `encode_payload`
//! (writes just the record body) and `decode_payload` (reads exactly the
//! declared body length). Framing — `opcode | u64 length | payload` — is
//! handled by [`write_record`] and [`read_record`], which backpatch the
//! length by buffering the payload before writing it, rather than seeking
//! back through the output stream (the output is not assumed to be
//! seekable).

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use crate::byte_codec::{
    crc32, read_bytes32, read_bytes64, read_string, read_string_map, read_u16, read_u32, read_u64,
    read_u8, write_bytes32, write_bytes64, write_string, write_string_map, write_u16, write_u32,
    write_u64, write_u8, OrderedStringMap,
};
use crate::constants::*;
use crate::error::{McapError, Result};

/// Header record. Must be the first record after the leading magic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub profile: String,
    pub library: String,
}

/// Footer record. Points at the (optional) summary section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub summary_start: u64,
    pub summary_offset_start: u64,
    pub summary_crc: u32,
}

/// Schema record. `id` is nonzero and unique within a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: u16,
    pub name: String,
    pub encoding: String,
    pub data: Vec<u8>,
}

/// Channel record. `schema_id == 0` means the channel is schemaless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u16,
    pub schema_id: u16,
    pub topic: String,
    pub message_encoding: String,
    pub metadata: OrderedStringMap,
}

/// Message record: an opaque payload on a channel at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel_id: u16,
    pub sequence: u32,
    pub log_time: u64,
    pub publish_time: u64,
    pub data: Vec<u8>,
}

/// Chunk record. `data` holds the (possibly compressed) bytes of zero or
/// more Schema/Channel/Message records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub message_start_time: u64,
    pub message_end_time: u64,
    pub uncompressed_size: u64,
    pub uncompressed_crc: u32,
    pub compression: String,
    pub data: Vec<u8>,
}

/// MessageIndex record: `(log_time, offset_in_uncompressed_chunk)` pairs
/// for one channel, in insertion order, emitted immediately after a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIndex {
    pub channel_id: u16,
    pub records: Vec<(u64, u64)>,
}

/// ChunkIndex record: locates a Chunk and its MessageIndex records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIndex {
    pub message_start_time: u64,
    pub message_end_time: u64,
    pub chunk_start_offset: u64,
    pub chunk_length: u64,
    pub message_index_offsets: BTreeMap<u16, u64>,
    pub message_index_length: u64,
    pub compression: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

/// Attachment record: an embedded file, trailer-CRC protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub log_time: u64,
    pub create_time: u64,
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// AttachmentIndex record: locates an Attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentIndex {
    pub offset: u64,
    pub length: u64,
    pub log_time: u64,
    pub create_time: u64,
    pub data_size: u64,
    pub name: String,
    pub media_type: String,
}

/// Statistics record: file-level counts and time bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub message_count: u64,
    pub schema_count: u16,
    pub channel_count: u32,
    pub attachment_count: u32,
    pub metadata_count: u32,
    pub chunk_count: u32,
    pub message_start_time: u64,
    pub message_end_time: u64,
    pub channel_message_counts: BTreeMap<u16, u64>,
}

/// Metadata record: a named bag of key-value strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub metadata: OrderedStringMap,
}

/// MetadataIndex record: locates a Metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIndex {
    pub offset: u64,
    pub length: u64,
    pub name: String,
}

/// SummaryOffset record: describes one contiguous opcode group in the
/// summary section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOffset {
    pub group_opcode: u8,
    pub group_start: u64,
    pub group_length: u64,
}

/// DataEnd record: marks the end of the data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataEnd {
    pub data_section_crc: u32,
}

/// A decoded MCAP record of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(Header),
    Footer(Footer),
    Schema(Schema),
    Channel(Channel),
    Message(Message),
    Chunk(Chunk),
    MessageIndex(MessageIndex),
    ChunkIndex(ChunkIndex),
    Attachment(Attachment),
    AttachmentIndex(AttachmentIndex),
    Statistics(Statistics),
    Metadata(Metadata),
    MetadataIndex(MetadataIndex),
    SummaryOffset(SummaryOffset),
    DataEnd(DataEnd),
}

impl Record {
    pub fn opcode(&self) -> u8 {
        match self {
            Record::Header(_) => OP_HEADER,
            Record::Footer(_) => OP_FOOTER,
            Record::Schema(_) => OP_SCHEMA,
            Record::Channel(_) => OP_CHANNEL,
            Record::Message(_) => OP_MESSAGE,
            Record::Chunk(_) => OP_CHUNK,
            Record::MessageIndex(_) => OP_MESSAGE_INDEX,
            Record::ChunkIndex(_) => OP_CHUNK_INDEX,
            Record::Attachment(_) => OP_ATTACHMENT,
            Record::AttachmentIndex(_) => OP_ATTACHMENT_INDEX,
            Record::Statistics(_) => OP_STATISTICS,
            Record::Metadata(_) => OP_METADATA,
            Record::MetadataIndex(_) => OP_METADATA_INDEX,
            Record::SummaryOffset(_) => OP_SUMMARY_OFFSET,
            Record::DataEnd(_) => OP_DATA_END,
        }
    }

    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        match self {
            Record::Header(r) => r.encode_payload(w),
            Record::Footer(r) => r.encode_payload(w),
            Record::Schema(r) => r.encode_payload(w),
            Record::Channel(r) => r.encode_payload(w),
            Record::Message(r) => r.encode_payload(w),
            Record::Chunk(r) => r.encode_payload(w),
            Record::MessageIndex(r) => r.encode_payload(w),
            Record::ChunkIndex(r) => r.encode_payload(w),
            Record::Attachment(r) => return r.encode_full(w),
            Record::AttachmentIndex(r) => r.encode_payload(w),
            Record::Statistics(r) => r.encode_payload(w),
            Record::Metadata(r) => r.encode_payload(w),
            Record::MetadataIndex(r) => r.encode_payload(w),
            Record::SummaryOffset(r) => r.encode_payload(w),
            Record::DataEnd(r) => r.encode_payload(w),
        }
    }
}

impl Header {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_string(w, &self.profile)?;
        write_string(w, &self.library)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            profile: read_string(r)?,
            library: read_string(r)?,
        })
    }
}

impl Footer {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u64(w, self.summary_start)?;
        write_u64(w, self.summary_offset_start)?;
        write_u32(w, self.summary_crc)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            summary_start: read_u64(r)?,
            summary_offset_start: read_u64(r)?,
            summary_crc: read_u32(r)?,
        })
    }

    /// Byte length of a Footer's framed record (opcode + length + payload).
    /// Fixed at 29 bytes: 1 (opcode) + 8 (length) + 8 + 8 + 4 (payload).
    pub const FRAMED_SIZE: u64 = 1 + 8 + 8 + 8 + 4;
}

impl Schema {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u16(w, self.id)?;
        write_string(w, &self.name)?;
        write_string(w, &self.encoding)?;
        write_bytes32(w, &self.data)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            id: read_u16(r)?,
            name: read_string(r)?,
            encoding: read_string(r)?,
            data: read_bytes32(r)?,
        })
    }
}

impl Channel {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u16(w, self.id)?;
        write_u16(w, self.schema_id)?;
        write_string(w, &self.topic)?;
        write_string(w, &self.message_encoding)?;
        write_string_map(w, &self.metadata)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            id: read_u16(r)?,
            schema_id: read_u16(r)?,
            topic: read_string(r)?,
            message_encoding: read_string(r)?,
            metadata: read_string_map(r)?,
        })
    }
}

impl Message {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u16(w, self.channel_id)?;
        write_u32(w, self.sequence)?;
        write_u64(w, self.log_time)?;
        write_u64(w, self.publish_time)?;
        w.write_all(&self.data)
    }

    /// Message is the one record whose payload isn't self-delimiting: the
    /// trailing `data` field runs to the end of the declared record length.
    fn decode_payload<R: Read>(r: &mut R, length: u64) -> Result<Self> {
        const FIXED_FIELDS_LEN: u64 = 2 + 4 + 8 + 8;
        if length < FIXED_FIELDS_LEN {
            return Err(McapError::InvalidValue(format!(
                "Message record length {length} shorter than fixed fields"
            )));
        }
        let channel_id = read_u16(r)?;
        let sequence = read_u32(r)?;
        let log_time = read_u64(r)?;
        let publish_time = read_u64(r)?;
        let mut data = vec![0u8; (length - FIXED_FIELDS_LEN) as usize];
        r.read_exact(&mut data).map_err(|_| McapError::EndOfFile)?;
        Ok(Self {
            channel_id,
            sequence,
            log_time,
            publish_time,
            data,
        })
    }
}

impl Chunk {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u64(w, self.message_start_time)?;
        write_u64(w, self.message_end_time)?;
        write_u64(w, self.uncompressed_size)?;
        write_u32(w, self.uncompressed_crc)?;
        write_string(w, &self.compression)?;
        write_bytes64(w, &self.data)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            message_start_time: read_u64(r)?,
            message_end_time: read_u64(r)?,
            uncompressed_size: read_u64(r)?,
            uncompressed_crc: read_u32(r)?,
            compression: read_string(r)?,
            data: read_bytes64(r)?,
        })
    }
}

impl MessageIndex {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u16(w, self.channel_id)?;
        write_u32(w, (self.records.len() * 16) as u32)?;
        for (log_time, offset) in &self.records {
            write_u64(w, *log_time)?;
            write_u64(w, *offset)?;
        }
        Ok(())
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        let channel_id = read_u16(r)?;
        let block_len = read_u32(r)? as u64;
        let count = block_len / 16;
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let log_time = read_u64(r)?;
            let offset = read_u64(r)?;
            records.push((log_time, offset));
        }
        Ok(Self {
            channel_id,
            records,
        })
    }
}

impl ChunkIndex {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u64(w, self.message_start_time)?;
        write_u64(w, self.message_end_time)?;
        write_u64(w, self.chunk_start_offset)?;
        write_u64(w, self.chunk_length)?;
        write_u32(w, (self.message_index_offsets.len() * 10) as u32)?;
        for (channel_id, offset) in &self.message_index_offsets {
            write_u16(w, *channel_id)?;
            write_u64(w, *offset)?;
        }
        write_u64(w, self.message_index_length)?;
        write_string(w, &self.compression)?;
        write_u64(w, self.compressed_size)?;
        write_u64(w, self.uncompressed_size)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        let message_start_time = read_u64(r)?;
        let message_end_time = read_u64(r)?;
        let chunk_start_offset = read_u64(r)?;
        let chunk_length = read_u64(r)?;
        let block_len = read_u32(r)? as u64;
        let count = block_len / 10;
        let mut message_index_offsets = BTreeMap::new();
        for _ in 0..count {
            let channel_id = read_u16(r)?;
            let offset = read_u64(r)?;
            message_index_offsets.insert(channel_id, offset);
        }
        let message_index_length = read_u64(r)?;
        let compression = read_string(r)?;
        let compressed_size = read_u64(r)?;
        let uncompressed_size = read_u64(r)?;
        Ok(Self {
            message_start_time,
            message_end_time,
            chunk_start_offset,
            chunk_length,
            message_index_offsets,
            message_index_length,
            compression,
            compressed_size,
            uncompressed_size,
        })
    }
}

impl Attachment {
    /// Attachment framing is irregular: its trailing CRC32 covers the
    /// record payload *as serialized* (everything after the record length
    /// field, before the CRC itself), so it cannot be produced by a plain
    /// `encode_payload` — the record-length and CRC depend on each other's
    /// neighbor, not on the whole-file data-section accumulator.
    fn encode_full<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let mut payload = Vec::new();
        write_u64(&mut payload, self.log_time)?;
        write_u64(&mut payload, self.create_time)?;
        write_string(&mut payload, &self.name)?;
        write_string(&mut payload, &self.media_type)?;
        write_bytes64(&mut payload, &self.data)?;
        let crc = crc32(&payload);

        write_u8(w, OP_ATTACHMENT)?;
        write_u64(w, payload.len() as u64 + 4)?;
        w.write_all(&payload)?;
        write_u32(w, crc)
    }

    fn decode_body<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            log_time: read_u64(r)?,
            create_time: read_u64(r)?,
            name: read_string(r)?,
            media_type: read_string(r)?,
            data: read_bytes64(r)?,
        })
    }
}

impl AttachmentIndex {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u64(w, self.offset)?;
        write_u64(w, self.length)?;
        write_u64(w, self.log_time)?;
        write_u64(w, self.create_time)?;
        write_u64(w, self.data_size)?;
        write_string(w, &self.name)?;
        write_string(w, &self.media_type)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            offset: read_u64(r)?,
            length: read_u64(r)?,
            log_time: read_u64(r)?,
            create_time: read_u64(r)?,
            data_size: read_u64(r)?,
            name: read_string(r)?,
            media_type: read_string(r)?,
        })
    }
}

impl Statistics {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u64(w, self.message_count)?;
        write_u16(w, self.schema_count)?;
        write_u32(w, self.channel_count)?;
        write_u32(w, self.attachment_count)?;
        write_u32(w, self.metadata_count)?;
        write_u32(w, self.chunk_count)?;
        write_u64(w, self.message_start_time)?;
        write_u64(w, self.message_end_time)?;
        write_u32(w, (self.channel_message_counts.len() * 10) as u32)?;
        for (channel_id, count) in &self.channel_message_counts {
            write_u16(w, *channel_id)?;
            write_u64(w, *count)?;
        }
        Ok(())
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        let message_count = read_u64(r)?;
        let schema_count = read_u16(r)?;
        let channel_count = read_u32(r)?;
        let attachment_count = read_u32(r)?;
        let metadata_count = read_u32(r)?;
        let chunk_count = read_u32(r)?;
        let message_start_time = read_u64(r)?;
        let message_end_time = read_u64(r)?;
        let block_len = read_u32(r)? as u64;
        let count = block_len / 10;
        let mut channel_message_counts = BTreeMap::new();
        for _ in 0..count {
            let channel_id = read_u16(r)?;
            let msg_count = read_u64(r)?;
            channel_message_counts.insert(channel_id, msg_count);
        }
        Ok(Self {
            message_count,
            schema_count,
            channel_count,
            attachment_count,
            metadata_count,
            chunk_count,
            message_start_time,
            message_end_time,
            channel_message_counts,
        })
    }
}

impl Metadata {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_string(w, &self.name)?;
        write_string_map(w, &self.metadata)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            name: read_string(r)?,
            metadata: read_string_map(r)?,
        })
    }
}

impl MetadataIndex {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u64(w, self.offset)?;
        write_u64(w, self.length)?;
        write_string(w, &self.name)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            offset: read_u64(r)?,
            length: read_u64(r)?,
            name: read_string(r)?,
        })
    }
}

impl SummaryOffset {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u8(w, self.group_opcode)?;
        write_u64(w, self.group_start)?;
        write_u64(w, self.group_length)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            group_opcode: read_u8(r)?,
            group_start: read_u64(r)?,
            group_length: read_u64(r)?,
        })
    }
}

impl DataEnd {
    fn encode_payload<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u32(w, self.data_section_crc)
    }

    fn decode_payload<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            data_section_crc: read_u32(r)?,
        })
    }
}

/// Frame and write a record: `opcode | u64 length | payload`. The payload is
/// built into a scratch buffer first so the length can be written before
/// the payload without requiring the output stream to be seekable.
///
/// Attachment is the one exception: its CRC-bearing framing is written by
/// `Record::encode_payload` directly (it starts its own record rather than
/// delegating to this helper), since its trailing CRC sits outside the
/// normal payload/length relationship.
pub fn write_record<W: Write>(w: &mut W, record: &Record) -> std::io::Result<u64> {
    if let Record::Attachment(a) = record {
        let mut probe = Vec::new();
        a.encode_full(&mut probe)?;
        w.write_all(&probe)?;
        return Ok(probe.len() as u64);
    }
    let mut payload = Vec::new();
    record.encode_payload(&mut payload)?;
    write_u8(w, record.opcode())?;
    write_u64(w, payload.len() as u64)?;
    w.write_all(&payload)?;
    Ok(1 + 8 + payload.len() as u64)
}

/// Decode one record given its opcode and declared length. Returns `Ok(None)`
/// for an opcode this codec doesn't recognize — the caller is responsible
/// for having already reserved/skipped exactly `length` bytes for it, which
/// is what makes unknown opcodes forward-compatible rather than fatal.
pub fn decode_record<R: Read>(opcode: u8, length: u64, r: &mut R) -> Result<Option<Record>> {
    let mut limited = r.take(length);
    let record = match opcode {
        OP_HEADER => Some(Record::Header(Header::decode_payload(&mut limited)?)),
        OP_FOOTER => Some(Record::Footer(Footer::decode_payload(&mut limited)?)),
        OP_SCHEMA => Some(Record::Schema(Schema::decode_payload(&mut limited)?)),
        OP_CHANNEL => Some(Record::Channel(Channel::decode_payload(&mut limited)?)),
        OP_MESSAGE => Some(Record::Message(Message::decode_payload(
            &mut limited,
            length,
        )?)),
        OP_CHUNK => Some(Record::Chunk(Chunk::decode_payload(&mut limited)?)),
        OP_MESSAGE_INDEX => Some(Record::MessageIndex(MessageIndex::decode_payload(
            &mut limited,
        )?)),
        OP_CHUNK_INDEX => Some(Record::ChunkIndex(ChunkIndex::decode_payload(&mut limited)?)),
        OP_ATTACHMENT => {
            // The trailing 4-byte CRC is part of the declared length but
            // not part of Attachment::decode_body; read the payload into a
            // buffer first so its CRC32 can be checked against the
            // trailing value, per `spec.md` §3.3 invariant 6.
            let body_len = length.checked_sub(4).ok_or_else(|| {
                McapError::InvalidValue("attachment record shorter than its trailing CRC".into())
            })?;
            let mut payload = vec![0u8; body_len as usize];
            limited.read_exact(&mut payload)?;
            let attachment = Attachment::decode_body(&mut Cursor::new(&payload))?;
            let expected_crc = read_u32(&mut limited)?;
            let actual_crc = crc32(&payload);
            if expected_crc != 0 && expected_crc != actual_crc {
                return Err(McapError::CrcValidationError {
                    expected: expected_crc,
                    actual: actual_crc,
                    record_kind: "attachment",
                });
            }
            Some(Record::Attachment(attachment))
        }
        OP_ATTACHMENT_INDEX => Some(Record::AttachmentIndex(AttachmentIndex::decode_payload(
            &mut limited,
        )?)),
        OP_STATISTICS => Some(Record::Statistics(Statistics::decode_payload(
            &mut limited,
        )?)),
        OP_METADATA => Some(Record::Metadata(Metadata::decode_payload(&mut limited)?)),
        OP_METADATA_INDEX => Some(Record::MetadataIndex(MetadataIndex::decode_payload(
            &mut limited,
        )?)),
        OP_SUMMARY_OFFSET => Some(Record::SummaryOffset(SummaryOffset::decode_payload(
            &mut limited,
        )?)),
        OP_DATA_END => Some(Record::DataEnd(DataEnd::decode_payload(&mut limited)?)),
        _ => None,
    };
    // Drain any bytes this variant didn't consume (forward-compatible field
    // additions within a known opcode, or the entire body of an unknown one).
    let remaining = limited.limit();
    if remaining > 0 {
        std::io::copy(&mut limited, &mut std::io::sink()).map_err(|_| McapError::EndOfFile)?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(record: Record) {
        let mut buf = Vec::new();
        write_record(&mut buf, &record).unwrap();
        let mut cursor = Cursor::new(buf);
        let opcode = read_u8(&mut cursor).unwrap();
        let length = read_u64(&mut cursor).unwrap();
        let decoded = decode_record(opcode, length, &mut cursor).unwrap().unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn header_round_trip() {
        round_trip(Record::Header(Header {
            profile: "ros2".into(),
            library: "mcapkit".into(),
        }));
    }

    #[test]
    fn schema_round_trip() {
        round_trip(Record::Schema(Schema {
            id: 1,
            name: "S".into(),
            encoding: "jsonschema".into(),
            data: b"{}".to_vec(),
        }));
    }

    #[test]
    fn channel_round_trip_preserves_metadata_order() {
        let mut metadata = OrderedStringMap::new();
        metadata.insert("z", "1");
        metadata.insert("a", "2");
        round_trip(Record::Channel(Channel {
            id: 1,
            schema_id: 1,
            topic: "/a".into(),
            message_encoding: "json".into(),
            metadata,
        }));
    }

    #[test]
    fn message_round_trip() {
        round_trip(Record::Message(Message {
            channel_id: 1,
            sequence: 7,
            log_time: 100,
            publish_time: 100,
            data: b"payload".to_vec(),
        }));
    }

    #[test]
    fn chunk_round_trip() {
        round_trip(Record::Chunk(Chunk {
            message_start_time: 0,
            message_end_time: 100,
            uncompressed_size: 10,
            uncompressed_crc: 0,
            compression: "".into(),
            data: vec![1, 2, 3],
        }));
    }

    #[test]
    fn message_index_round_trip() {
        round_trip(Record::MessageIndex(MessageIndex {
            channel_id: 1,
            records: vec![(10, 0), (5, 20)],
        }));
    }

    #[test]
    fn chunk_index_round_trip() {
        let mut offsets = BTreeMap::new();
        offsets.insert(1u16, 42u64);
        round_trip(Record::ChunkIndex(ChunkIndex {
            message_start_time: 0,
            message_end_time: 100,
            chunk_start_offset: 9,
            chunk_length: 50,
            message_index_offsets: offsets,
            message_index_length: 20,
            compression: "zstd".into(),
            compressed_size: 30,
            uncompressed_size: 60,
        }));
    }

    #[test]
    fn attachment_round_trip_and_crc() {
        let attachment = Attachment {
            log_time: 1,
            create_time: 2,
            name: "a".into(),
            media_type: "text/plain".into(),
            data: b"foo".to_vec(),
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &Record::Attachment(attachment.clone())).unwrap();

        // Verify the trailing CRC actually covers the payload as serialized.
        let crc_bytes = &buf[buf.len() - 4..];
        let crc = u32::from_le_bytes(crc_bytes.try_into().unwrap());
        assert_eq!(crc, crc32(&buf[9..buf.len() - 4]));

        let mut cursor = Cursor::new(buf);
        let opcode = read_u8(&mut cursor).unwrap();
        let length = read_u64(&mut cursor).unwrap();
        let decoded = decode_record(opcode, length, &mut cursor).unwrap().unwrap();
        assert_eq!(decoded, Record::Attachment(attachment));
    }

    #[test]
    fn attachment_crc_mismatch_is_rejected() {
        let attachment = Attachment {
            log_time: 1,
            create_time: 2,
            name: "a".into(),
            media_type: "text/plain".into(),
            data: b"foo".to_vec(),
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &Record::Attachment(attachment)).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xff;

        let mut cursor = Cursor::new(buf);
        let opcode = read_u8(&mut cursor).unwrap();
        let length = read_u64(&mut cursor).unwrap();
        assert!(matches!(
            decode_record(opcode, length, &mut cursor),
            Err(McapError::CrcValidationError {
                record_kind: "attachment",
                ..
            })
        ));
    }

    #[test]
    fn unknown_opcode_is_skipped_not_fatal() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 0x80).unwrap();
        write_u64(&mut buf, 5).unwrap();
        buf.extend_from_slice(b"abcde");
        let mut cursor = Cursor::new(buf);
        let opcode = read_u8(&mut cursor).unwrap();
        let length = read_u64(&mut cursor).unwrap();
        let decoded = decode_record(opcode, length, &mut cursor).unwrap();
        assert!(decoded.is_none());
        // Stream position should have advanced past the unknown payload.
        assert_eq!(cursor.position(), 14);
    }

    #[test]
    fn statistics_round_trip() {
        let mut counts = BTreeMap::new();
        counts.insert(1u16, 3u64);
        round_trip(Record::Statistics(Statistics {
            message_count: 3,
            schema_count: 1,
            channel_count: 1,
            attachment_count: 0,
            metadata_count: 0,
            chunk_count: 1,
            message_start_time: 0,
            message_end_time: 100,
            channel_message_counts: counts,
        }));
    }
}
