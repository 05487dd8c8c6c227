// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The chunked, append-first MCAP writer.
//!
//! Messages accumulate in an in-memory chunk builder; when the builder
//! crosses `chunk_size` it is compressed, framed as a Chunk record, and
//! followed immediately by a MessageIndex record per channel. `finish`
//! flushes the trailing chunk, writes `DataEnd`, the summary section, the
//! footer, and the trailing magic.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::byte_codec::{read_u64, read_u8, write_u64, write_u8, OrderedStringMap};
use crate::chunk;
use crate::config::{IndexType, WriterOptions};
use crate::constants::{MCAP_MAGIC, OP_FOOTER};
use crate::error::{McapError, Result};
use crate::reader::seeking::SeekingReader;
use crate::reader::streaming::StreamReader;
use crate::records::{
    decode_record, write_record, Attachment, AttachmentIndex, Channel, Chunk, ChunkIndex, DataEnd,
    Footer, Header, Message, Metadata, MetadataIndex, Record, Schema, Statistics,
};
use crate::summary::Summary;

/// Writer lifecycle, per `spec.md` §4.5.5. `start` is the only valid
/// transition out of `Init`; it moves straight through the momentary
/// `Started` point into `Writing` once the Header record has been
/// written, since nothing in this API distinguishes the two. `Finished`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Init,
    Writing,
    Finished,
}

#[derive(Default)]
struct ChunkBuilder {
    buffer: Vec<u8>,
    message_start_time: Option<u64>,
    message_end_time: Option<u64>,
    message_index: BTreeMap<u16, Vec<(u64, u64)>>,
}

impl ChunkBuilder {
    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn record_message_time(&mut self, log_time: u64) {
        self.message_start_time = Some(match self.message_start_time {
            Some(existing) => existing.min(log_time),
            None => log_time,
        });
        self.message_end_time = Some(match self.message_end_time {
            Some(existing) => existing.max(log_time),
            None => log_time,
        });
    }
}

/// Write-side counterpart of [`crate::byte_codec::CrcReader`]: tracks both
/// the running data-section CRC and the absolute byte position of the
/// underlying sink, since MCAP writing is append-only and never seeks.
struct TrackingWriter<W> {
    inner: W,
    hasher: crc32fast::Hasher,
    crc_enabled: bool,
    position: u64,
}

impl<W: Write> TrackingWriter<W> {
    fn new(inner: W, crc_enabled: bool) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            crc_enabled,
            position: 0,
        }
    }

    fn with_state(inner: W, crc_enabled: bool, position: u64, seed_crc: u32) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new_with_initial(seed_crc),
            crc_enabled,
            position,
        }
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn checksum(&self) -> u32 {
        if self.crc_enabled {
            self.hasher.clone().finalize()
        } else {
            0
        }
    }

    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TrackingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        if self.crc_enabled {
            self.hasher.update(&buf[..n]);
        }
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// The MCAP writer. Generic over any `Write` sink for the normal
/// streaming-write path; append mode (which needs to truncate and reopen
/// a file) is exposed only for `std::fs::File` via [`McapWriter::open_append`].
pub struct McapWriter<W: Write> {
    sink: TrackingWriter<W>,
    options: WriterOptions,
    state: WriterState,
    append_mode: bool,

    schemas: BTreeMap<u16, Schema>,
    channels: BTreeMap<u16, Channel>,
    next_schema_id: u16,
    next_channel_id: u16,

    chunk_builder: ChunkBuilder,
    chunk_indexes: Vec<ChunkIndex>,
    attachment_indexes: Vec<AttachmentIndex>,
    metadata_indexes: Vec<MetadataIndex>,

    statistics: Statistics,
}

impl<W: Write> McapWriter<W> {
    pub fn new(sink: W, options: WriterOptions) -> Self {
        let crc_enabled = options.enable_data_crcs;
        Self {
            sink: TrackingWriter::new(sink, crc_enabled),
            options,
            state: WriterState::Init,
            append_mode: false,
            schemas: BTreeMap::new(),
            channels: BTreeMap::new(),
            next_schema_id: 1,
            next_channel_id: 1,
            chunk_builder: ChunkBuilder::default(),
            chunk_indexes: Vec::new(),
            attachment_indexes: Vec::new(),
            metadata_indexes: Vec::new(),
            statistics: Statistics::default(),
        }
    }

    /// Unwrap the writer, returning the underlying sink. Intended for
    /// callers writing to an in-memory buffer (e.g. `Vec<u8>`) who want the
    /// finished bytes; a writer over `std::fs::File` should simply drop the
    /// writer and reopen the path instead.
    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }

    fn require_writing(&self) -> Result<()> {
        match self.state {
            WriterState::Writing => Ok(()),
            other => Err(McapError::StateError(format!(
                "expected Writing state, found {other:?}"
            ))),
        }
    }

    /// Write MAGIC and the Header record, per `spec.md` §4.5.2 step 1.
    pub fn start(&mut self, profile: &str, library: &str) -> Result<()> {
        if self.state != WriterState::Init {
            return Err(McapError::StateError(
                "start is only valid from the Init state".into(),
            ));
        }
        self.sink.write_all(&MCAP_MAGIC)?;
        write_record(
            &mut self.sink,
            &Record::Header(Header {
                profile: profile.to_string(),
                library: library.to_string(),
            }),
        )?;
        self.state = WriterState::Writing;
        Ok(())
    }

    /// Emit a record either into the current chunk buffer (when chunking
    /// is enabled) or straight to the sink.
    fn emit(&mut self, record: &Record) -> Result<()> {
        if self.options.use_chunking {
            write_record(&mut self.chunk_builder.buffer, record)?;
        } else {
            write_record(&mut self.sink, record)?;
        }
        Ok(())
    }

    /// Register a schema, returning its id. In append mode, a `(name,
    /// encoding, data)` tuple matching an existing schema returns that
    /// schema's id instead of minting a new one; a name collision with a
    /// different tuple is an [`McapError::AppendConflict`].
    pub fn register_schema(&mut self, name: &str, encoding: &str, data: &[u8]) -> Result<u16> {
        self.require_writing()?;
        if self.append_mode {
            if let Some(existing) = self.schemas.values().find(|s| s.name == name) {
                if existing.encoding == encoding && existing.data == data {
                    return Ok(existing.id);
                }
                return Err(McapError::AppendConflict {
                    kind: "schema",
                    name: name.to_string(),
                });
            }
        }
        let id = self.next_schema_id;
        self.next_schema_id += 1;
        let schema = Schema {
            id,
            name: name.to_string(),
            encoding: encoding.to_string(),
            data: data.to_vec(),
        };
        self.schemas.insert(id, schema.clone());
        self.statistics.schema_count = self.schemas.len() as u16;
        self.emit(&Record::Schema(schema))?;
        Ok(id)
    }

    /// Register a channel, returning its id. Conflict semantics mirror
    /// [`Self::register_schema`], keyed by `topic`.
    pub fn register_channel(
        &mut self,
        topic: &str,
        message_encoding: &str,
        schema_id: u16,
        metadata: OrderedStringMap,
    ) -> Result<u16> {
        self.require_writing()?;
        if schema_id != 0 && !self.schemas.contains_key(&schema_id) {
            return Err(McapError::InvalidValue(format!(
                "channel references unknown schema id {schema_id}"
            )));
        }
        if self.append_mode {
            if let Some(existing) = self.channels.values().find(|c| c.topic == topic) {
                if existing.schema_id == schema_id
                    && existing.message_encoding == message_encoding
                    && existing.metadata == metadata
                {
                    return Ok(existing.id);
                }
                return Err(McapError::AppendConflict {
                    kind: "channel",
                    name: topic.to_string(),
                });
            }
        }
        let id = self.next_channel_id;
        self.next_channel_id += 1;
        let channel = Channel {
            id,
            schema_id,
            topic: topic.to_string(),
            message_encoding: message_encoding.to_string(),
            metadata,
        };
        self.channels.insert(id, channel.clone());
        self.statistics.channel_count = self.channels.len() as u32;
        self.emit(&Record::Channel(channel))?;
        Ok(id)
    }

    /// Append a message to the current chunk (or the data section
    /// directly when `use_chunking` is off), per `spec.md` §4.5.2 step 4.
    pub fn add_message(
        &mut self,
        channel_id: u16,
        sequence: u32,
        log_time: u64,
        publish_time: u64,
        data: &[u8],
    ) -> Result<()> {
        self.require_writing()?;
        if !self.channels.contains_key(&channel_id) {
            return Err(McapError::InvalidValue(format!(
                "message references unknown channel id {channel_id}"
            )));
        }

        self.statistics.message_count += 1;
        self.statistics.message_start_time = if self.statistics.message_count == 1 {
            log_time
        } else {
            self.statistics.message_start_time.min(log_time)
        };
        self.statistics.message_end_time = self.statistics.message_end_time.max(log_time);
        *self
            .statistics
            .channel_message_counts
            .entry(channel_id)
            .or_insert(0) += 1;

        let message = Message {
            channel_id,
            sequence,
            log_time,
            publish_time,
            data: data.to_vec(),
        };

        if self.options.use_chunking {
            let offset = self.chunk_builder.buffer.len() as u64;
            write_record(&mut self.chunk_builder.buffer, &Record::Message(message))?;
            self.chunk_builder.record_message_time(log_time);
            self.chunk_builder
                .message_index
                .entry(channel_id)
                .or_default()
                .push((log_time, offset));
            if self.chunk_builder.buffer.len() as u64 >= self.options.chunk_size {
                self.finalize_chunk()?;
            }
        } else {
            write_record(&mut self.sink, &Record::Message(message))?;
        }
        Ok(())
    }

    /// Finalize the open chunk (if any): compress, write the Chunk
    /// record, then a MessageIndex record per channel, then remember a
    /// ChunkIndex for the summary, per `spec.md` §4.5.3.
    fn finalize_chunk(&mut self) -> Result<()> {
        if self.chunk_builder.is_empty() {
            return Ok(());
        }
        let builder = std::mem::take(&mut self.chunk_builder);
        let uncompressed = builder.buffer;
        let uncompressed_crc = if self.options.enable_crcs {
            crate::byte_codec::crc32(&uncompressed)
        } else {
            0
        };
        let compressed = chunk::compress(self.options.compression, &uncompressed)?;
        let compressed_size = compressed.len() as u64;
        let uncompressed_size = uncompressed.len() as u64;

        let chunk_start_offset = self.sink.position();
        write_record(
            &mut self.sink,
            &Record::Chunk(Chunk {
                message_start_time: builder.message_start_time.unwrap_or(0),
                message_end_time: builder.message_end_time.unwrap_or(0),
                uncompressed_size,
                uncompressed_crc,
                compression: self.options.compression.as_str().to_string(),
                data: compressed,
            }),
        )?;
        debug!(
            chunk_start_offset,
            uncompressed_size, compressed_size, "finalized chunk"
        );

        let chunk_end_offset = self.sink.position();
        let chunk_length = chunk_end_offset - chunk_start_offset;

        let mut message_index_offsets = BTreeMap::new();
        if self.options.index_types.contains(IndexType::MESSAGE) {
            for (channel_id, records) in &builder.message_index {
                let offset = self.sink.position();
                message_index_offsets.insert(*channel_id, offset);
                write_record(
                    &mut self.sink,
                    &Record::MessageIndex(crate::records::MessageIndex {
                        channel_id: *channel_id,
                        records: records.clone(),
                    }),
                )?;
            }
        }
        let message_index_length = self.sink.position() - chunk_end_offset;

        self.statistics.chunk_count += 1;
        if self.options.index_types.contains(IndexType::CHUNK) {
            self.chunk_indexes.push(ChunkIndex {
                message_start_time: builder.message_start_time.unwrap_or(0),
                message_end_time: builder.message_end_time.unwrap_or(0),
                chunk_start_offset,
                chunk_length,
                message_index_offsets,
                message_index_length,
                compression: self.options.compression.as_str().to_string(),
                compressed_size,
                uncompressed_size,
            });
        }
        Ok(())
    }

    /// Flush any open chunk, then write an Attachment record (with its
    /// trailing CRC) and remember an AttachmentIndex.
    pub fn add_attachment(
        &mut self,
        log_time: u64,
        create_time: u64,
        name: &str,
        media_type: &str,
        data: &[u8],
    ) -> Result<()> {
        self.require_writing()?;
        self.finalize_chunk()?;
        let offset = self.sink.position();
        let attachment = Attachment {
            log_time,
            create_time,
            name: name.to_string(),
            media_type: media_type.to_string(),
            data: data.to_vec(),
        };
        write_record(&mut self.sink, &Record::Attachment(attachment))?;
        let length = self.sink.position() - offset;
        self.statistics.attachment_count += 1;
        if self.options.index_types.contains(IndexType::ATTACHMENT) {
            self.attachment_indexes.push(AttachmentIndex {
                offset,
                length,
                log_time,
                create_time,
                data_size: data.len() as u64,
                name: name.to_string(),
                media_type: media_type.to_string(),
            });
        }
        Ok(())
    }

    /// Write a Metadata record and remember a MetadataIndex.
    pub fn add_metadata(&mut self, name: &str, metadata: OrderedStringMap) -> Result<()> {
        self.require_writing()?;
        let offset = self.sink.position();
        write_record(
            &mut self.sink,
            &Record::Metadata(Metadata {
                name: name.to_string(),
                metadata,
            }),
        )?;
        let length = self.sink.position() - offset;
        self.statistics.metadata_count += 1;
        if self.options.index_types.contains(IndexType::METADATA) {
            self.metadata_indexes.push(MetadataIndex {
                offset,
                length,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Finalize the trailing chunk, write `DataEnd`, the summary section,
    /// the footer, and the trailing magic, per `spec.md` §4.5.2 step 8.
    /// A no-op if already finished.
    pub fn finish(&mut self) -> Result<()> {
        if self.state == WriterState::Finished {
            return Ok(());
        }
        self.require_writing()?;
        self.finalize_chunk()?;

        let data_section_crc = self.sink.checksum();
        write_record(
            &mut self.sink,
            &Record::DataEnd(DataEnd { data_section_crc }),
        )?;

        let summary_start = self.sink.position();
        let mut summary_buf = Vec::new();
        let mut groups: Vec<(u8, u64)> = Vec::new();

        if self.options.repeat_schemas && !self.schemas.is_empty() {
            let start = summary_buf.len() as u64;
            for schema in self.schemas.values() {
                write_record(&mut summary_buf, &Record::Schema(schema.clone()))?;
            }
            groups.push((crate::constants::OP_SCHEMA, summary_buf.len() as u64 - start));
        }
        if self.options.repeat_channels && !self.channels.is_empty() {
            let start = summary_buf.len() as u64;
            for channel in self.channels.values() {
                write_record(&mut summary_buf, &Record::Channel(channel.clone()))?;
            }
            groups.push((
                crate::constants::OP_CHANNEL,
                summary_buf.len() as u64 - start,
            ));
        }
        if self.options.use_statistics {
            let start = summary_buf.len() as u64;
            write_record(
                &mut summary_buf,
                &Record::Statistics(self.statistics.clone()),
            )?;
            groups.push((
                crate::constants::OP_STATISTICS,
                summary_buf.len() as u64 - start,
            ));
        }
        if self.options.index_types.contains(IndexType::CHUNK) && !self.chunk_indexes.is_empty() {
            let start = summary_buf.len() as u64;
            for chunk_index in &self.chunk_indexes {
                write_record(&mut summary_buf, &Record::ChunkIndex(chunk_index.clone()))?;
            }
            groups.push((
                crate::constants::OP_CHUNK_INDEX,
                summary_buf.len() as u64 - start,
            ));
        }
        if self.options.index_types.contains(IndexType::ATTACHMENT)
            && !self.attachment_indexes.is_empty()
        {
            let start = summary_buf.len() as u64;
            for attachment_index in &self.attachment_indexes {
                write_record(
                    &mut summary_buf,
                    &Record::AttachmentIndex(attachment_index.clone()),
                )?;
            }
            groups.push((
                crate::constants::OP_ATTACHMENT_INDEX,
                summary_buf.len() as u64 - start,
            ));
        }
        if self.options.index_types.contains(IndexType::METADATA)
            && !self.metadata_indexes.is_empty()
        {
            let start = summary_buf.len() as u64;
            for metadata_index in &self.metadata_indexes {
                write_record(
                    &mut summary_buf,
                    &Record::MetadataIndex(metadata_index.clone()),
                )?;
            }
            groups.push((
                crate::constants::OP_METADATA_INDEX,
                summary_buf.len() as u64 - start,
            ));
        }

        let (summary_start, summary_offset_start) = if summary_buf.is_empty() {
            (0u64, 0u64)
        } else {
            (summary_start, summary_start + summary_buf.len() as u64)
        };

        if self.options.use_summary_offsets && !groups.is_empty() {
            let offsets = Summary::summary_offsets(summary_start, &groups);
            for offset in &offsets {
                write_record(&mut summary_buf, &Record::SummaryOffset(*offset))?;
            }
        }

        self.sink.write_all(&summary_buf)?;

        let summary_offset_start = if self.options.use_summary_offsets && !groups.is_empty() {
            summary_offset_start
        } else {
            0
        };

        let mut crc_hasher = crc32fast::Hasher::new();
        crc_hasher.update(&summary_buf);
        let mut footer_prefix = Vec::new();
        write_u8(&mut footer_prefix, OP_FOOTER)?;
        write_u64(&mut footer_prefix, 20)?;
        write_u64(&mut footer_prefix, summary_start)?;
        write_u64(&mut footer_prefix, summary_offset_start)?;
        crc_hasher.update(&footer_prefix);
        let summary_crc = if self.options.enable_crcs {
            crc_hasher.finalize()
        } else {
            0
        };

        write_record(
            &mut self.sink,
            &Record::Footer(Footer {
                summary_start,
                summary_offset_start,
                summary_crc,
            }),
        )?;
        self.sink.write_all(&MCAP_MAGIC)?;
        self.state = WriterState::Finished;
        Ok(())
    }
}

/// Read the Footer from the last `Footer::FRAMED_SIZE + 8` bytes of a
/// seekable source, verifying the trailing magic.
fn read_footer<S: Read + Seek>(source: &mut S) -> Result<Footer> {
    let footer_and_magic = Footer::FRAMED_SIZE + 8;
    let len = source.seek(SeekFrom::End(0))?;
    if len < footer_and_magic {
        return Err(McapError::EndOfFile);
    }
    source.seek(SeekFrom::End(-8))?;
    let mut trailing_magic = [0u8; 8];
    source.read_exact(&mut trailing_magic)?;
    if trailing_magic != MCAP_MAGIC {
        return Err(McapError::InvalidMagic);
    }
    source.seek(SeekFrom::End(-(footer_and_magic as i64)))?;
    let opcode = read_u8(source)?;
    let length = read_u64(source)?;
    if opcode != OP_FOOTER {
        return Err(McapError::InvalidValue(
            "file does not end with a Footer record".into(),
        ));
    }
    match decode_record(opcode, length, source)?.unwrap() {
        Record::Footer(f) => Ok(f),
        _ => unreachable!(),
    }
}

/// Reconstruct which index groups a loaded summary was actually maintaining,
/// for `open_append` to resume with matching flags instead of trusting
/// caller-supplied options (`spec.md` §4.5.4, §8.1 property 10).
fn index_types_from_summary(summary: &crate::summary::Summary) -> IndexType {
    let mut types = IndexType::NONE;
    if !summary.chunk_indexes.is_empty() {
        types |= IndexType::CHUNK;
    }
    if !summary.attachment_indexes.is_empty() {
        types |= IndexType::ATTACHMENT;
    }
    if !summary.metadata_indexes.is_empty() {
        types |= IndexType::METADATA;
    }
    if summary
        .chunk_indexes
        .iter()
        .any(|ci| !ci.message_index_offsets.is_empty())
    {
        types |= IndexType::MESSAGE;
    }
    types
}

impl McapWriter<std::fs::File> {
    /// Reopen an existing MCAP file in place and resume writing, per
    /// `spec.md` §4.5.4. Requires a non-zero `Footer.summary_start`;
    /// otherwise this returns a `StateError`.
    pub fn open_append(path: impl AsRef<Path>, mut options: WriterOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let footer = read_footer(&mut file)?;
        if footer.summary_start == 0 {
            return Err(McapError::StateError(
                "cannot append to MCAP without summary".into(),
            ));
        }

        let summary = {
            let mut seeking = SeekingReader::new(&mut file, crate::config::ReaderOptions::default());
            seeking.get_summary()?.clone()
        };

        debug!(
            schemas = summary.schemas.len(),
            channels = summary.channels.len(),
            "reloaded summary for append"
        );

        options.use_statistics = summary.statistics.is_some();
        options.repeat_schemas = !summary.schemas.is_empty();
        options.repeat_channels = !summary.channels.is_empty();
        options.use_summary_offsets = !summary.summary_offset_records.is_empty();
        options.index_types = index_types_from_summary(&summary);

        let data_section_crc = if options.enable_data_crcs {
            file.seek(SeekFrom::Start(0))?;
            let mut stream = StreamReader::new(
                &mut file,
                crate::config::ReaderOptions {
                    skip_magic: false,
                    emit_chunks: true,
                    validate_crcs: true,
                    record_size_limit: crate::config::ReaderOptions::default().record_size_limit,
                },
            );
            let mut crc_before_data_end = 0u32;
            loop {
                let crc_so_far = stream.checksum();
                match stream.next_record()? {
                    Some(Record::DataEnd(_)) => {
                        crc_before_data_end = crc_so_far;
                        break;
                    }
                    Some(_) => continue,
                    None => break,
                }
            }
            crc_before_data_end
        } else {
            0
        };

        file.set_len(footer.summary_start)?;
        file.seek(SeekFrom::Start(footer.summary_start))?;

        let next_schema_id = summary.schemas.keys().max().copied().unwrap_or(0) + 1;
        let next_channel_id = summary.channels.keys().max().copied().unwrap_or(0) + 1;

        Ok(Self {
            sink: TrackingWriter::with_state(
                file,
                options.enable_data_crcs,
                footer.summary_start,
                data_section_crc,
            ),
            options,
            state: WriterState::Writing,
            append_mode: true,
            schemas: summary.schemas,
            channels: summary.channels,
            next_schema_id,
            next_channel_id,
            chunk_builder: ChunkBuilder::default(),
            chunk_indexes: summary.chunk_indexes,
            attachment_indexes: summary.attachment_indexes,
            metadata_indexes: summary.metadata_indexes,
            statistics: summary.statistics.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderOptions;

    #[test]
    fn minimal_file_round_trips_through_seeking_reader() {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default());
        writer.start("", "test").unwrap();
        let schema_id = writer
            .register_schema("S", "jsonschema", b"{}")
            .unwrap();
        let channel_id = writer
            .register_channel("/a", "json", schema_id, OrderedStringMap::new())
            .unwrap();
        writer.add_message(channel_id, 0, 100, 100, b"a").unwrap();
        writer.add_message(channel_id, 1, 0, 0, b"b").unwrap();
        writer.add_message(channel_id, 2, 1, 1, b"c").unwrap();
        writer.finish().unwrap();
        let bytes = writer.sink.inner;

        let mut reader = SeekingReader::new(std::io::Cursor::new(bytes), ReaderOptions::default());
        let times: Vec<u64> = reader
            .iter_messages(None, 0, None, true, false)
            .unwrap()
            .map(|v| v.unwrap().message.log_time)
            .collect();
        assert_eq!(times, vec![0, 1, 100]);

        let summary = reader.get_summary().unwrap();
        assert_eq!(summary.statistics.as_ref().unwrap().message_count, 3);
        assert_eq!(summary.statistics.as_ref().unwrap().channel_count, 1);
        assert_eq!(summary.statistics.as_ref().unwrap().schema_count, 1);
        assert_eq!(summary.statistics.as_ref().unwrap().chunk_count, 1);
        assert_eq!(summary.statistics.as_ref().unwrap().message_start_time, 0);
        assert_eq!(summary.statistics.as_ref().unwrap().message_end_time, 100);
    }

    #[test]
    fn state_machine_rejects_add_before_start() {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default());
        assert!(matches!(
            writer.register_schema("S", "jsonschema", b"{}"),
            Err(McapError::StateError(_))
        ));
    }

    #[test]
    fn finish_is_idempotent() {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default());
        writer.start("", "test").unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn schemaless_channel_round_trips_without_schema() {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default());
        writer.start("", "test").unwrap();
        let channel_id = writer
            .register_channel("/b", "json", 0, OrderedStringMap::new())
            .unwrap();
        writer.add_message(channel_id, 0, 0, 0, b"x").unwrap();
        writer.finish().unwrap();
        let bytes = writer.sink.inner;

        let mut reader = SeekingReader::new(std::io::Cursor::new(bytes), ReaderOptions::default());
        let view = reader
            .iter_messages(None, 0, None, true, false)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert!(view.schema.is_none());
    }
}
