// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Random-access reader: locate the footer, read the summary, then pull
//! only the chunks a query actually needs, merging their messages in time
//! order via [`MergeQueue`].

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::byte_codec::{crc32, read_u64, read_u8, write_u64, write_u8};
use crate::chunk::{self, Compression};
use crate::config::ReaderOptions;
use crate::constants::{MCAP_MAGIC, OP_FOOTER};
use crate::error::{McapError, Result};
use crate::merge_queue::{MergeQueue, QueueItem};
use crate::records::{decode_record, Attachment, Channel, Footer, Header, Metadata, Record, Schema};
use crate::summary::Summary;

use super::{MessageView, StreamReader};

/// A seekable MCAP reader: footer → summary driven, pulling chunks on
/// demand rather than scanning the whole file.
pub struct SeekingReader<R> {
    source: R,
    options: ReaderOptions,
    summary: Option<Summary>,
}

impl<R: Read + Seek> SeekingReader<R> {
    pub fn new(source: R, options: ReaderOptions) -> Self {
        Self {
            source,
            options,
            summary: None,
        }
    }

    /// Read the Header record by seeking to the start of the file and
    /// reading one record through the streaming path, per `spec.md` §6.2.
    pub fn get_header(&mut self) -> Result<Header> {
        self.source.seek(SeekFrom::Start(0))?;
        let mut reader_options = self.options;
        reader_options.skip_magic = false;
        reader_options.emit_chunks = true;
        let mut stream = StreamReader::new(&mut self.source, reader_options);
        match stream.next_record()? {
            Some(Record::Header(header)) => Ok(header),
            Some(_) => Err(McapError::InvalidValue(
                "first record after MAGIC was not a Header".into(),
            )),
            None => Err(McapError::EndOfFile),
        }
    }

    /// Fetch (loading on first use) the file's summary, per `spec.md` §4.6.1.
    pub fn get_summary(&mut self) -> Result<&Summary> {
        if self.summary.is_none() {
            let summary = self.load_summary()?;
            self.summary = Some(summary);
        }
        Ok(self.summary.as_ref().unwrap())
    }

    fn load_summary(&mut self) -> Result<Summary> {
        let file_len = self.source.seek(SeekFrom::End(0))?;
        let footer_and_magic = Footer::FRAMED_SIZE + 8;
        if file_len < footer_and_magic {
            return Err(McapError::EndOfFile);
        }
        self.source.seek(SeekFrom::End(-8))?;
        let mut trailing_magic = [0u8; 8];
        self.source.read_exact(&mut trailing_magic)?;
        if trailing_magic != MCAP_MAGIC {
            return Err(McapError::InvalidMagic);
        }

        self.source
            .seek(SeekFrom::End(-(footer_and_magic as i64)))?;
        let opcode = read_u8(&mut self.source)?;
        let length = read_u64(&mut self.source)?;
        if opcode != OP_FOOTER {
            return Err(McapError::InvalidValue(
                "file does not end with a Footer record".into(),
            ));
        }
        let footer_record_start = file_len - footer_and_magic;
        let footer = match decode_record(opcode, length, &mut self.source)?.unwrap() {
            Record::Footer(f) => f,
            _ => unreachable!(),
        };

        if footer.summary_start == 0 {
            return self.build_summary_via_streaming();
        }

        if self.options.validate_crcs && footer.summary_crc != 0 {
            self.verify_summary_crc(&footer, footer_record_start)?;
        }

        self.source.seek(SeekFrom::Start(footer.summary_start))?;
        let mut summary = Summary::new();
        loop {
            let opcode = read_u8(&mut self.source)?;
            if opcode == OP_FOOTER {
                break;
            }
            let length = read_u64(&mut self.source)?;
            match decode_record(opcode, length, &mut self.source)? {
                Some(Record::Schema(s)) => {
                    summary.schemas.insert(s.id, s);
                }
                Some(Record::Channel(c)) => {
                    summary.channels.insert(c.id, c);
                }
                Some(Record::Statistics(s)) => summary.statistics = Some(s),
                Some(Record::ChunkIndex(ci)) => summary.chunk_indexes.push(ci),
                Some(Record::AttachmentIndex(ai)) => summary.attachment_indexes.push(ai),
                Some(Record::MetadataIndex(mi)) => summary.metadata_indexes.push(mi),
                Some(Record::SummaryOffset(so)) => summary.summary_offset_records.push(so),
                _ => {}
            }
        }
        Ok(summary)
    }

    /// Recompute `Footer.summary_crc` per `spec.md` §3.3 invariant 6: CRC32
    /// over the summary section bytes (everything from `summary_start` up
    /// to the Footer record) concatenated with the Footer's own framing up
    /// to, but not including, the `summary_crc` field itself.
    fn verify_summary_crc(&mut self, footer: &Footer, footer_record_start: u64) -> Result<()> {
        let summary_len = footer_record_start - footer.summary_start;
        self.source.seek(SeekFrom::Start(footer.summary_start))?;
        let mut combined = vec![0u8; summary_len as usize];
        self.source.read_exact(&mut combined)?;
        write_u8(&mut combined, OP_FOOTER)?;
        write_u64(&mut combined, 20)?;
        write_u64(&mut combined, footer.summary_start)?;
        write_u64(&mut combined, footer.summary_offset_start)?;
        let actual = crc32(&combined);
        if actual != footer.summary_crc {
            return Err(McapError::CrcValidationError {
                expected: footer.summary_crc,
                actual,
                record_kind: "summary",
            });
        }
        Ok(())
    }

    /// Used when `Footer.summary_start == 0`: there is no summary, so
    /// schemas/channels/statistics are reconstructed with a full forward
    /// scan instead. No chunk/attachment/metadata indexes are available
    /// in this mode — there is nothing to rebuild them from.
    fn build_summary_via_streaming(&mut self) -> Result<Summary> {
        self.source.seek(SeekFrom::Start(0))?;
        let mut reader_options = self.options;
        reader_options.emit_chunks = false;
        let mut stream = StreamReader::new(&mut self.source, reader_options);
        let mut summary = Summary::new();
        let mut message_count = 0u64;
        let mut message_start_time = u64::MAX;
        let mut message_end_time = 0u64;
        let mut channel_message_counts: std::collections::BTreeMap<u16, u64> =
            std::collections::BTreeMap::new();
        while let Some(record) = stream.next_record()? {
            match record {
                Record::Schema(s) => {
                    summary.schemas.insert(s.id, s);
                }
                Record::Channel(c) => {
                    summary.channels.insert(c.id, c);
                }
                Record::Message(m) => {
                    message_count += 1;
                    message_start_time = message_start_time.min(m.log_time);
                    message_end_time = message_end_time.max(m.log_time);
                    *channel_message_counts.entry(m.channel_id).or_insert(0) += 1;
                }
                _ => {}
            }
        }
        if message_count == 0 {
            message_start_time = 0;
        }
        summary.statistics = Some(crate::records::Statistics {
            message_count,
            schema_count: summary.schemas.len() as u16,
            channel_count: summary.channels.len() as u32,
            attachment_count: 0,
            metadata_count: 0,
            chunk_count: 0,
            message_start_time,
            message_end_time,
            channel_message_counts,
        });
        Ok(summary)
    }

    /// Iterate messages across `topics` (all channels when `None`) within
    /// `[start_time, end_time)`, merged in time order (or FIFO, when
    /// `log_time_order` is false). Per `spec.md` §4.7, `reverse` without
    /// `log_time_order` is an error.
    pub fn iter_messages<'a>(
        &'a mut self,
        topics: Option<&[String]>,
        start_time: u64,
        end_time: Option<u64>,
        log_time_order: bool,
        reverse: bool,
    ) -> Result<MessageIter<'a, R>> {
        if reverse && !log_time_order {
            return Err(McapError::StateError(
                "reverse=true requires log_time_order=true".into(),
            ));
        }
        let validate_crcs = self.options.validate_crcs;
        let summary = self.get_summary()?.clone();
        let end = end_time.unwrap_or(u64::MAX);

        let channel_ids: Option<HashSet<u16>> = topics.map(|topics| {
            summary
                .channels
                .values()
                .filter(|c| topics.iter().any(|t| t == &c.topic))
                .map(|c| c.id)
                .collect()
        });

        if summary.chunk_indexes.is_empty() {
            // There is no chunk index to seed a query from — either the
            // file has no summary at all (`Footer.summary_start == 0`), or
            // it was written without chunking/chunk-indexing. Per
            // `spec.md` §4.6.1, fall back to the streaming path rather
            // than yielding an empty result: collect the whole file,
            // filter by topic/time range, sort (or not) exactly as
            // `StreamReader::iter_messages` already does, then reverse if
            // asked.
            self.source.seek(SeekFrom::Start(0))?;
            let mut reader_options = self.options;
            reader_options.skip_magic = false;
            reader_options.emit_chunks = false;
            let stream = StreamReader::new(&mut self.source, reader_options);
            let mut views = stream.iter_messages(log_time_order)?;
            views.retain(|v| {
                let topic_matches = channel_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&v.channel.id));
                topic_matches && v.message.log_time >= start_time && v.message.log_time < end
            });
            if reverse {
                views.reverse();
            }
            return Ok(MessageIter::Streaming(views.into_iter()));
        }

        let mut queue = MergeQueue::new(log_time_order, reverse);
        for chunk_index in &summary.chunk_indexes {
            if chunk_index.message_end_time < start_time || chunk_index.message_start_time >= end {
                continue;
            }
            // `message_index_offsets` only names the chunk's channels when
            // IndexType::MESSAGE was enabled at write time; when it's
            // empty (MESSAGE indexing off) we can't tell which channels
            // the chunk holds, so don't prune on that basis.
            if let Some(ids) = &channel_ids {
                if !chunk_index.message_index_offsets.is_empty()
                    && !chunk_index
                        .message_index_offsets
                        .keys()
                        .any(|channel_id| ids.contains(channel_id))
                {
                    continue;
                }
            }
            queue.push(QueueItem::PendingChunk(chunk_index.clone()));
        }

        Ok(MessageIter::Indexed(IndexedMessages {
            reader: self,
            summary,
            queue,
            channel_ids,
            start_time,
            end,
            validate_crcs,
        }))
    }

    /// Convenience wrapper applying decoder plug-ins to the message stream,
    /// per `spec.md` §6.2's `iter_decoded_messages`.
    pub fn iter_decoded_messages<'a>(
        &'a mut self,
        topics: Option<&[String]>,
        start_time: u64,
        end_time: Option<u64>,
        log_time_order: bool,
        reverse: bool,
        plugins: &'a [super::DecoderPlugin],
    ) -> Result<super::DecodedMessages<'a, MessageIter<'a, R>>> {
        let inner = self.iter_messages(topics, start_time, end_time, log_time_order, reverse)?;
        Ok(super::DecodedMessages::new(inner, plugins))
    }

    /// All attachments in the file, via the summary's index when one
    /// exists, otherwise a full forward scan.
    pub fn iter_attachments(&mut self) -> Result<Vec<Attachment>> {
        let indexes = self.get_summary()?.attachment_indexes.clone();
        if indexes.is_empty() {
            return self.scan_attachments();
        }
        let mut out = Vec::with_capacity(indexes.len());
        for index in indexes {
            self.source.seek(SeekFrom::Start(index.offset))?;
            let opcode = read_u8(&mut self.source)?;
            let length = read_u64(&mut self.source)?;
            match decode_record(opcode, length, &mut self.source)? {
                Some(Record::Attachment(a)) => out.push(a),
                _ => {
                    return Err(McapError::InvalidValue(
                        "attachment index did not point at an Attachment record".into(),
                    ))
                }
            }
        }
        Ok(out)
    }

    fn scan_attachments(&mut self) -> Result<Vec<Attachment>> {
        self.source.seek(SeekFrom::Start(0))?;
        let mut reader_options = self.options;
        reader_options.emit_chunks = true;
        let mut stream = StreamReader::new(&mut self.source, reader_options);
        let mut out = Vec::new();
        while let Some(record) = stream.next_record()? {
            if let Record::Attachment(a) = record {
                out.push(a);
            }
        }
        Ok(out)
    }

    /// All metadata records in the file, via the summary's index when one
    /// exists, otherwise a full forward scan.
    pub fn iter_metadata(&mut self) -> Result<Vec<Metadata>> {
        let indexes = self.get_summary()?.metadata_indexes.clone();
        if indexes.is_empty() {
            return self.scan_metadata();
        }
        let mut out = Vec::with_capacity(indexes.len());
        for index in indexes {
            self.source.seek(SeekFrom::Start(index.offset))?;
            let opcode = read_u8(&mut self.source)?;
            let length = read_u64(&mut self.source)?;
            match decode_record(opcode, length, &mut self.source)? {
                Some(Record::Metadata(m)) => out.push(m),
                _ => {
                    return Err(McapError::InvalidValue(
                        "metadata index did not point at a Metadata record".into(),
                    ))
                }
            }
        }
        Ok(out)
    }

    fn scan_metadata(&mut self) -> Result<Vec<Metadata>> {
        self.source.seek(SeekFrom::Start(0))?;
        let mut reader_options = self.options;
        reader_options.emit_chunks = true;
        let mut stream = StreamReader::new(&mut self.source, reader_options);
        let mut out = Vec::new();
        while let Some(record) = stream.next_record()? {
            if let Record::Metadata(m) = record {
                out.push(m);
            }
        }
        Ok(out)
    }
}

/// Lazy, time-ordered message iterator over a summary's chunk indexes.
/// Holds at most one decompressed chunk plus the merge queue at any time,
/// per `spec.md` §5's backpressure rule.
pub struct IndexedMessages<'a, R> {
    reader: &'a mut SeekingReader<R>,
    summary: Summary,
    queue: MergeQueue,
    channel_ids: Option<HashSet<u16>>,
    start_time: u64,
    end: u64,
    validate_crcs: bool,
}

impl<'a, R: Read + Seek> IndexedMessages<'a, R> {
    fn load_chunk(&mut self, chunk_index: &crate::records::ChunkIndex) -> Result<()> {
        self.reader
            .source
            .seek(SeekFrom::Start(chunk_index.chunk_start_offset))?;
        let opcode = read_u8(&mut self.reader.source)?;
        let length = read_u64(&mut self.reader.source)?;
        let record = decode_record(opcode, length, &mut self.reader.source)?.ok_or_else(|| {
            McapError::InvalidValue("chunk_start_offset did not point at a known record".into())
        })?;
        let chunk = match record {
            Record::Chunk(c) => c,
            _ => {
                return Err(McapError::InvalidValue(
                    "chunk_start_offset did not point at a Chunk record".into(),
                ))
            }
        };

        let compression = Compression::parse(&chunk.compression)?;
        let expected_crc = if self.validate_crcs {
            chunk.uncompressed_crc
        } else {
            0
        };
        let uncompressed = chunk::decompress_and_validate(
            compression,
            &chunk.data,
            chunk.uncompressed_size,
            expected_crc,
        )?;

        let mut local_schemas: HashMap<u16, Schema> = HashMap::new();
        let mut local_channels: HashMap<u16, Channel> = HashMap::new();
        let mut cursor = Cursor::new(uncompressed);
        let mut message_offset_in_chunk = 0u64;
        loop {
            let opcode = match read_u8(&mut cursor) {
                Ok(op) => op,
                Err(McapError::EndOfFile) => break,
                Err(e) => return Err(e),
            };
            let length = read_u64(&mut cursor)?;
            match decode_record(opcode, length, &mut cursor)? {
                Some(Record::Schema(s)) => {
                    local_schemas.insert(s.id, s);
                }
                Some(Record::Channel(c)) => {
                    local_channels.insert(c.id, c.clone());
                }
                Some(Record::Message(message)) => {
                    message_offset_in_chunk += 1;
                    if let Some(ids) = &self.channel_ids {
                        if !ids.contains(&message.channel_id) {
                            continue;
                        }
                    }
                    if message.log_time < self.start_time || message.log_time >= self.end {
                        continue;
                    }
                    let channel = local_channels
                        .get(&message.channel_id)
                        .or_else(|| self.summary.channels.get(&message.channel_id))
                        .cloned()
                        .ok_or_else(|| {
                            McapError::InvalidValue(format!(
                                "message references unknown channel {}",
                                message.channel_id
                            ))
                        })?;
                    let schema = if channel.schema_id == 0 {
                        None
                    } else {
                        local_schemas
                            .get(&channel.schema_id)
                            .or_else(|| self.summary.schemas.get(&channel.schema_id))
                            .cloned()
                    };
                    self.queue.push(QueueItem::Message {
                        schema,
                        channel,
                        message,
                        chunk_start_offset: chunk_index.chunk_start_offset,
                        message_offset_in_chunk,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl<'a, R: Read + Seek> Iterator for IndexedMessages<'a, R> {
    type Item = Result<MessageView>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.queue.pop()? {
                QueueItem::Message {
                    schema,
                    channel,
                    message,
                    ..
                } => {
                    return Some(Ok(MessageView {
                        schema,
                        channel,
                        message,
                    }))
                }
                QueueItem::PendingChunk(chunk_index) => {
                    if let Err(e) = self.load_chunk(&chunk_index) {
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

/// Message iterator returned by [`SeekingReader::iter_messages`]. Walks the
/// summary's chunk indexes when one exists; transparently falls back to a
/// buffered streaming scan (`spec.md` §4.6.1) for files with no summary or
/// no chunk indexing.
pub enum MessageIter<'a, R> {
    Indexed(IndexedMessages<'a, R>),
    Streaming(std::vec::IntoIter<MessageView>),
}

impl<'a, R: Read + Seek> Iterator for MessageIter<'a, R> {
    type Item = Result<MessageView>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            MessageIter::Indexed(inner) => inner.next(),
            MessageIter::Streaming(inner) => inner.next().map(Ok),
        }
    }
}
