// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Forward-only record iterator over any `Read` source.
//!
//! Walks `opcode|length` records from MAGIC to the trailing MAGIC,
//! optionally expanding Chunk records into their inner Schema/Channel/
//! Message records inline. Single-pass: there is no way to restart once
//! consumed, matching `spec.md` §4.4 ("the iterator is single-pass and not
//! restartable").

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};

use tracing::{debug, trace, warn};

use crate::byte_codec::{read_u64, read_u8, CrcReader};
use crate::chunk::{self, Compression};
use crate::config::ReaderOptions;
use crate::constants::MCAP_MAGIC;
use crate::error::{McapError, Result};
use crate::records::{decode_record, Channel, Record, Schema};

use super::MessageView;

/// A forward-only reader over an MCAP byte stream.
pub struct StreamReader<R> {
    source: CrcReader<R>,
    options: ReaderOptions,
    started: bool,
    finished: bool,
    pending: VecDeque<Record>,
    schemas: HashMap<u16, Schema>,
    channels: HashMap<u16, Channel>,
}

impl<R: Read> StreamReader<R> {
    pub fn new(source: R, options: ReaderOptions) -> Self {
        Self {
            source: CrcReader::new(source, options.validate_crcs),
            options,
            started: false,
            finished: false,
            pending: VecDeque::new(),
            schemas: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    /// The lazy sequence of decoded records, per `spec.md` §6.2.
    pub fn records(self) -> Self {
        self
    }

    /// Convenience accessor for schemas/channels observed so far — useful
    /// once iteration has progressed past their defining records.
    pub fn known_channel(&self, id: u16) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn known_schema(&self, id: u16) -> Option<&Schema> {
        self.schemas.get(&id)
    }

    /// Current running CRC of every byte consumed so far. Used by
    /// append-mode writers to re-seed the data-section CRC accumulator
    /// after replaying the preserved data section.
    pub fn checksum(&self) -> u32 {
        self.source.checksum()
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        if !self.options.skip_magic {
            let mut magic = [0u8; 8];
            self.source
                .read_exact(&mut magic)
                .map_err(|_| McapError::EndOfFile)?;
            if magic != MCAP_MAGIC {
                return Err(McapError::InvalidMagic);
            }
        }
        Ok(())
    }

    fn expand_chunk(&mut self, chunk: crate::records::Chunk) -> Result<()> {
        let compression = Compression::parse(&chunk.compression)?;
        let expected_crc = if self.options.validate_crcs {
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
        debug!(
            bytes = uncompressed.len(),
            compression = %chunk.compression,
            "expanding chunk"
        );
        let mut cursor = Cursor::new(uncompressed);
        loop {
            let opcode = match read_u8(&mut cursor) {
                Ok(op) => op,
                Err(McapError::EndOfFile) => break,
                Err(e) => return Err(e),
            };
            let length = read_u64(&mut cursor)?;
            if length > self.options.record_size_limit {
                return Err(McapError::RecordLengthLimitExceeded {
                    opcode,
                    length,
                    limit: self.options.record_size_limit,
                });
            }
            match decode_record(opcode, length, &mut cursor)? {
                Some(record) => self.pending.push_back(record),
                None => trace!(opcode, "skipping unknown opcode inside chunk"),
            }
        }
        Ok(())
    }

    fn track(&mut self, record: &Record) {
        match record {
            Record::Schema(s) => {
                self.schemas.insert(s.id, s.clone());
            }
            Record::Channel(c) => {
                self.channels.insert(c.id, c.clone());
            }
            _ => {}
        }
    }

    /// Pull the next decoded record, or `None` once the trailing Footer
    /// and MAGIC have been consumed.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        self.ensure_started()?;
        loop {
            if let Some(record) = self.pending.pop_front() {
                self.track(&record);
                return Ok(Some(record));
            }
            if self.finished {
                return Ok(None);
            }

            let crc_before_record = self.source.checksum();
            let opcode = match read_u8(&mut self.source) {
                Ok(op) => op,
                Err(McapError::EndOfFile) => {
                    self.finished = true;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let length = read_u64(&mut self.source)?;
            if length > self.options.record_size_limit {
                return Err(McapError::RecordLengthLimitExceeded {
                    opcode,
                    length,
                    limit: self.options.record_size_limit,
                });
            }

            let decoded = decode_record(opcode, length, &mut self.source)?;
            let record = match decoded {
                Some(r) => r,
                None => {
                    trace!(opcode, length, "skipping unknown opcode");
                    continue;
                }
            };

            match record {
                Record::Chunk(chunk) if !self.options.emit_chunks => {
                    self.expand_chunk(chunk)?;
                    continue;
                }
                Record::DataEnd(ref data_end) => {
                    if self.options.validate_crcs
                        && !self.options.skip_magic
                        && data_end.data_section_crc != 0
                        && data_end.data_section_crc != crc_before_record
                    {
                        warn!(
                            expected = data_end.data_section_crc,
                            actual = crc_before_record,
                            "data section CRC mismatch"
                        );
                        return Err(McapError::CrcValidationError {
                            expected: data_end.data_section_crc,
                            actual: crc_before_record,
                            record_kind: "data_end",
                        });
                    }
                    return Ok(Some(record));
                }
                Record::Footer(_) => {
                    self.finished = true;
                    let mut trailing = [0u8; 8];
                    self.source
                        .get_mut()
                        .read_exact(&mut trailing)
                        .map_err(|_| McapError::EndOfFile)?;
                    if trailing != MCAP_MAGIC {
                        return Err(McapError::InvalidMagic);
                    }
                    return Ok(Some(record));
                }
                _ => {
                    self.track(&record);
                    return Ok(Some(record));
                }
            }
        }
    }

    /// Collect `(schema?, channel, message)` triples across the whole
    /// stream. When `log_time_order` is true, the full matching set is
    /// buffered in memory and stable-sorted by `log_time` — the explicit,
    /// caller-visible cost `spec.md` §9 calls for; streaming reads
    /// otherwise make no ordering guarantee.
    pub fn iter_messages(mut self, log_time_order: bool) -> Result<Vec<MessageView>> {
        let mut views = Vec::new();
        while let Some(record) = self.next_record()? {
            if let Record::Message(message) = record {
                let channel = self
                    .channels
                    .get(&message.channel_id)
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
                    self.schemas.get(&channel.schema_id).cloned()
                };
                views.push(MessageView {
                    schema,
                    channel,
                    message,
                });
            }
        }
        if log_time_order {
            views.sort_by_key(|v| v.message.log_time);
        }
        Ok(views)
    }
}

impl<R: Read> Iterator for StreamReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{write_record, Header};

    fn minimal_file() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MCAP_MAGIC);
        write_record(
            &mut buf,
            &Record::Header(Header {
                profile: "".into(),
                library: "test".into(),
            }),
        )
        .unwrap();
        write_record(
            &mut buf,
            &Record::Footer(crate::records::Footer {
                summary_start: 0,
                summary_offset_start: 0,
                summary_crc: 0,
            }),
        )
        .unwrap();
        buf.extend_from_slice(&MCAP_MAGIC);
        buf
    }

    #[test]
    fn reads_header_then_footer_then_stops() {
        let data = minimal_file();
        let mut reader = StreamReader::new(Cursor::new(data), ReaderOptions::default());
        let first = reader.next_record().unwrap().unwrap();
        assert!(matches!(first, Record::Header(_)));
        let second = reader.next_record().unwrap().unwrap();
        assert!(matches!(second, Record::Footer(_)));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut data = minimal_file();
        data[0] = 0x00;
        let mut reader = StreamReader::new(Cursor::new(data), ReaderOptions::default());
        assert!(matches!(
            reader.next_record(),
            Err(McapError::InvalidMagic)
        ));
    }

    #[test]
    fn unknown_opcode_is_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(&MCAP_MAGIC);
        write_record(
            &mut data,
            &Record::Header(Header {
                profile: "".into(),
                library: "test".into(),
            }),
        )
        .unwrap();
        // Unknown opcode 0x80, 5-byte arbitrary payload.
        data.push(0x80);
        data.extend_from_slice(&5u64.to_le_bytes());
        data.extend_from_slice(b"abcde");
        write_record(
            &mut data,
            &Record::Footer(crate::records::Footer {
                summary_start: 0,
                summary_offset_start: 0,
                summary_crc: 0,
            }),
        )
        .unwrap();
        data.extend_from_slice(&MCAP_MAGIC);

        let mut reader = StreamReader::new(Cursor::new(data), ReaderOptions::default());
        let first = reader.next_record().unwrap().unwrap();
        assert!(matches!(first, Record::Header(_)));
        let second = reader.next_record().unwrap().unwrap();
        assert!(matches!(second, Record::Footer(_)));
    }
}
