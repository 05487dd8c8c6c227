// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! End-to-end scenario tests, lifted from the container format's literal
//! test scenarios: a minimal file, a time-range filter, a schemaless
//! channel, CRC corruption, and the record length limit.

use std::io::Cursor;

use mcapkit::byte_codec::OrderedStringMap;
use mcapkit::config::{ReaderOptions, WriterOptions};
use mcapkit::error::McapError;
use mcapkit::reader::SeekingReader;
use mcapkit::writer::McapWriter;

fn minimal_writer() -> McapWriter<Vec<u8>> {
    McapWriter::new(Vec::new(), WriterOptions::default())
}

/// S1 — minimal file: messages written out of order come back sorted by
/// log_time, and statistics/chunk bounds reflect the full set.
#[test]
fn minimal_file_sorts_by_log_time_and_reports_statistics() {
    let mut writer = minimal_writer();
    writer.start("", "test").unwrap();
    let schema_id = writer.register_schema("S", "jsonschema", b"{}").unwrap();
    let channel_id = writer
        .register_channel("/a", "json", schema_id, OrderedStringMap::new())
        .unwrap();
    writer.add_message(channel_id, 0, 100, 100, b"first").unwrap();
    writer.add_message(channel_id, 1, 0, 0, b"second").unwrap();
    writer.add_message(channel_id, 2, 1, 1, b"third").unwrap();
    writer.finish().unwrap();
    let bytes = writer.into_inner();

    let mut reader = SeekingReader::new(Cursor::new(bytes), ReaderOptions::default());
    let times: Vec<u64> = reader
        .iter_messages(None, 0, None, true, false)
        .unwrap()
        .map(|v| v.unwrap().message.log_time)
        .collect();
    assert_eq!(times, vec![0, 1, 100]);

    let summary = reader.get_summary().unwrap();
    let stats = summary.statistics.as_ref().unwrap();
    assert_eq!(stats.channel_count, 1);
    assert_eq!(stats.message_count, 3);
    assert_eq!(stats.schema_count, 1);
    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.message_start_time, 0);
    assert_eq!(stats.message_end_time, 100);

    let chunk_index = &summary.chunk_indexes[0];
    assert_eq!(chunk_index.message_start_time, 0);
    assert_eq!(chunk_index.message_end_time, 100);
}

/// S2 — range filter: `end_time` is exclusive.
#[test]
fn range_filter_excludes_end_time() {
    let mut writer = minimal_writer();
    writer.start("", "test").unwrap();
    let schema_id = writer.register_schema("S", "jsonschema", b"{}").unwrap();
    let channel_id = writer
        .register_channel("/a", "json", schema_id, OrderedStringMap::new())
        .unwrap();
    for t in 0..=5u64 {
        writer.add_message(channel_id, t as u32, t, t, b"x").unwrap();
    }
    writer.finish().unwrap();
    let bytes = writer.into_inner();

    let mut reader = SeekingReader::new(Cursor::new(bytes), ReaderOptions::default());
    let times: Vec<u64> = reader
        .iter_messages(None, 1, Some(4), true, false)
        .unwrap()
        .map(|v| v.unwrap().message.log_time)
        .collect();
    assert_eq!(times, vec![1, 2, 3]);
}

/// S3 — schemaless channel: the reader yields `schema: None`, and a
/// decoder plug-in that only accepts schema-bearing channels reports
/// `DecoderNotFound`.
#[test]
fn schemaless_channel_yields_no_schema_and_no_decoder() {
    let mut writer = minimal_writer();
    writer.start("", "test").unwrap();
    let channel_id = writer
        .register_channel("/b", "json", 0, OrderedStringMap::new())
        .unwrap();
    writer.add_message(channel_id, 0, 0, 0, b"x").unwrap();
    writer.finish().unwrap();
    let bytes = writer.into_inner();

    let mut reader = SeekingReader::new(Cursor::new(bytes.clone()), ReaderOptions::default());
    let view = reader
        .iter_messages(None, 0, None, true, false)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert!(view.schema.is_none());

    // A plug-in that only claims schema-bearing channels never resolves
    // for this one, so every message on it fails with DecoderNotFound.
    let plugins: Vec<mcapkit::reader::DecoderPlugin> = vec![Box::new(|_encoding, schema| {
        schema.map(|_| -> mcapkit::reader::DecoderFn {
            std::rc::Rc::new(|data: &[u8]| Box::new(data.to_vec()))
        })
    })];
    let mut reader2 = SeekingReader::new(Cursor::new(bytes), ReaderOptions::default());
    let result = reader2
        .iter_decoded_messages(None, 0, None, true, false, &plugins)
        .unwrap()
        .next()
        .unwrap();
    assert!(matches!(result, Err(McapError::DecoderNotFound { .. })));
}

/// Scan the records following the leading MAGIC for the first Chunk
/// record, and return the file offset of the last byte of its (possibly
/// compressed) `data` field — a safe place to flip a bit without
/// disturbing any record's framing.
fn last_byte_of_first_chunk_data(bytes: &[u8]) -> usize {
    use mcapkit::byte_codec::{read_u64, read_u8};
    use mcapkit::constants::OP_CHUNK;

    let mut cursor = Cursor::new(bytes);
    cursor.set_position(8); // past the leading MAGIC
    loop {
        let record_start = cursor.position();
        let opcode = read_u8(&mut cursor).unwrap();
        let length = read_u64(&mut cursor).unwrap();
        if opcode == OP_CHUNK {
            let _message_start_time = read_u64(&mut cursor).unwrap();
            let _message_end_time = read_u64(&mut cursor).unwrap();
            let _uncompressed_size = read_u64(&mut cursor).unwrap();
            let _uncompressed_crc = mcapkit::byte_codec::read_u32(&mut cursor).unwrap();
            let _compression = mcapkit::byte_codec::read_string(&mut cursor).unwrap();
            let data_len = read_u64(&mut cursor).unwrap();
            let data_field_start = cursor.position();
            return (data_field_start + data_len - 1) as usize;
        }
        cursor.set_position(record_start + 1 + 8 + length);
    }
}

/// S5 — CRC corruption: flipping a byte inside the chunk's compressed
/// payload trips `CRCValidationError` only when validation is requested;
/// without it, iteration still succeeds (on possibly-garbled bytes).
#[test]
fn crc_corruption_detected_only_when_validating() {
    let mut options = WriterOptions::default();
    options.compression = mcapkit::chunk::Compression::None;
    let mut writer = McapWriter::new(Vec::new(), options);
    writer.start("", "test").unwrap();
    let schema_id = writer.register_schema("S", "jsonschema", b"{}").unwrap();
    let channel_id = writer
        .register_channel("/a", "json", schema_id, OrderedStringMap::new())
        .unwrap();
    writer.add_message(channel_id, 0, 0, 0, b"payload bytes").unwrap();
    writer.finish().unwrap();
    let mut bytes = writer.into_inner();

    let corrupt_at = last_byte_of_first_chunk_data(&bytes);
    bytes[corrupt_at] ^= 0xFF;

    let mut validating = ReaderOptions::default();
    validating.validate_crcs = true;
    let mut reader = SeekingReader::new(Cursor::new(bytes.clone()), validating);
    let result: Result<Vec<_>, _> = reader
        .iter_messages(None, 0, None, true, false)
        .unwrap()
        .collect();
    assert!(matches!(result, Err(McapError::CrcValidationError { .. })));

    let mut reader_lenient = SeekingReader::new(Cursor::new(bytes), ReaderOptions::default());
    let result_lenient: Result<Vec<_>, _> = reader_lenient
        .iter_messages(None, 0, None, true, false)
        .unwrap()
        .collect();
    assert!(result_lenient.is_ok());
}

/// S6 — record length limit: an oversize record is rejected with
/// `RecordLengthLimitExceeded` naming the opcode, declared length, and
/// configured limit.
#[test]
fn record_length_limit_is_enforced() {
    use mcapkit::constants::MCAP_MAGIC;
    use mcapkit::records::{write_record, Header, Record};

    let mut buf = Vec::new();
    buf.extend_from_slice(&MCAP_MAGIC);
    write_record(
        &mut buf,
        &Record::Header(Header {
            profile: "".into(),
            library: "0123456789abcd".into(),
        }),
    )
    .unwrap();

    let mut options = ReaderOptions::default();
    options.record_size_limit = 10;
    let mut reader = mcapkit::reader::StreamReader::new(Cursor::new(buf), options);
    let err = reader.next_record().unwrap_err();
    match err {
        McapError::RecordLengthLimitExceeded {
            opcode,
            length,
            limit,
        } => {
            assert_eq!(opcode, mcapkit::constants::OP_HEADER);
            assert_eq!(length, 22);
            assert_eq!(limit, 10);
        }
        other => panic!("expected RecordLengthLimitExceeded, got {other:?}"),
    }
}
