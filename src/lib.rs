// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # mcapkit
//!
//! A container-format engine for [MCAP](https://mcap.dev) files: byte and
//! record codecs, chunk compression, a forward-only streaming reader, a
//! random-access seeking reader, and a chunked writer with append support.
//!
//! ## Example: writing a file
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mcapkit::byte_codec::OrderedStringMap;
//! use mcapkit::config::WriterOptions;
//! use mcapkit::writer::McapWriter;
//!
//! let file = std::fs::File::create("output.mcap")?;
//! let mut writer = McapWriter::new(file, WriterOptions::default());
//! writer.start("", "mcapkit")?;
//! let schema_id = writer.register_schema("Pose", "jsonschema", b"{}")?;
//! let channel_id = writer.register_channel("/pose", "json", schema_id, OrderedStringMap::new())?;
//! writer.add_message(channel_id, 0, 0, 0, b"{}")?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: reading a file in time order
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mcapkit::config::ReaderOptions;
//! use mcapkit::reader::SeekingReader;
//!
//! let file = std::fs::File::open("input.mcap")?;
//! let mut reader = SeekingReader::new(file, ReaderOptions::default());
//! for view in reader.iter_messages(None, 0, None, true, false)? {
//!     let view = view?;
//!     println!("{}: {} bytes", view.channel.topic, view.message.data.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod byte_codec;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod error;
pub mod merge_queue;
pub mod reader;
pub mod records;
pub mod summary;
pub mod writer;

pub use error::{McapError, Result};
pub use reader::{
    DecodedMessages, DecoderFn, DecoderPlugin, MessageView, SeekingReader, StreamReader,
};
pub use records::Record;
pub use writer::McapWriter;
