// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format-compatibility tests against the `mcap` crate (crates.io), used
//! here only as an independent test oracle — the engine under test never
//! depends on it for its own reading or writing.

use mcapkit::byte_codec::OrderedStringMap;
use mcapkit::chunk::Compression;
use mcapkit::config::WriterOptions;
use mcapkit::writer::McapWriter;

fn build_sample(compression: Compression) -> Vec<u8> {
    let mut options = WriterOptions::default();
    options.compression = compression;
    let mut writer = McapWriter::new(Vec::new(), options);
    writer.start("ros1", "mcapkit-test").unwrap();
    let schema_id = writer
        .register_schema("std_msgs/String", "ros1msg", b"string data")
        .unwrap();
    let mut metadata = OrderedStringMap::new();
    metadata.insert("key", "value");
    let channel_id = writer
        .register_channel("/chatter", "ros1", schema_id, metadata)
        .unwrap();
    for t in 0..10u64 {
        writer
            .add_message(channel_id, t as u32, t * 1000, t * 1000, b"hello world")
            .unwrap();
    }
    writer.finish().unwrap();
    writer.into_inner()
}

#[test]
fn uncompressed_file_readable_by_mcap_crate() {
    let bytes = build_sample(Compression::None);
    let summary = mcap::Summary::read(&bytes)
        .expect("mcap crate failed to parse summary")
        .expect("summary section should be present");

    assert_eq!(summary.schemas.len(), 1);
    assert_eq!(summary.channels.len(), 1);
    let channel = summary.channels.values().next().unwrap();
    assert_eq!(channel.topic, "/chatter");
    assert_eq!(channel.metadata.get("key"), Some(&"value".to_string()));
}

#[test]
fn zstd_chunk_readable_by_mcap_crate() {
    let bytes = build_sample(Compression::Zstd);
    let messages: Vec<_> = mcap::MessageStream::new(&bytes)
        .expect("mcap crate failed to build a message stream")
        .collect::<Result<Vec<_>, _>>()
        .expect("mcap crate failed to decode a message");
    assert_eq!(messages.len(), 10);
    let log_times: Vec<u64> = messages.iter().map(|m| m.log_time).collect();
    assert_eq!(log_times, (0..10).map(|t| t * 1000).collect::<Vec<_>>());
    for m in &messages {
        assert_eq!(m.data.to_vec(), b"hello world".to_vec());
    }
}

#[test]
fn lz4_chunk_readable_by_mcap_crate() {
    let bytes = build_sample(Compression::Lz4);
    let messages: Vec<_> = mcap::MessageStream::new(&bytes)
        .expect("mcap crate failed to build a message stream")
        .collect::<Result<Vec<_>, _>>()
        .expect("mcap crate failed to decode a message");
    assert_eq!(messages.len(), 10);
}
