// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Little-endian primitive read/write helpers and the running CRC32
//! accumulator used to cover chunk payloads, the data section, and the
//! summary section.
//!
//! These are free functions over `std::io::{Read, Write}` rather than
//! methods on a single writer struct: the record codec builds record
//! payloads into an in-memory `Vec<u8>` before framing them (so the
//! record length can be backpatched), while the CRC-bearing wrappers
//! below sit around the outermost file stream.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{McapError, Result};

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_u8(v)
}

pub fn write_u16<W: Write>(w: &mut W, v: u16) -> io::Result<()> {
    w.write_u16::<LittleEndian>(v)
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_u32::<LittleEndian>(v)
}

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_u64::<LittleEndian>(v)
}

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    r.read_u8().map_err(eof)
}

pub fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    r.read_u16::<LittleEndian>().map_err(eof)
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    r.read_u32::<LittleEndian>().map_err(eof)
}

pub fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    r.read_u64::<LittleEndian>().map_err(eof)
}

/// A short read is reported as `EndOfFile`; any other I/O error passes through.
fn eof(err: io::Error) -> McapError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        McapError::EndOfFile
    } else {
        McapError::Io(err)
    }
}

/// Write a `u32`-length-prefixed UTF-8 string with no trailing NUL.
pub fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_u32(w, s.len() as u32)?;
    w.write_all(s.as_bytes())
}

/// Read a `u32`-length-prefixed UTF-8 string.
pub fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(eof)?;
    String::from_utf8(buf).map_err(|e| McapError::InvalidValue(format!("non-UTF-8 string: {e}")))
}

/// Write a `u32`-length-prefixed byte buffer (used by Schema data).
pub fn write_bytes32<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    write_u32(w, data.len() as u32)?;
    w.write_all(data)
}

/// Read a `u32`-length-prefixed byte buffer.
pub fn read_bytes32<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(eof)?;
    Ok(buf)
}

/// Write a `u64`-length-prefixed byte buffer (used by Attachment and Chunk data).
pub fn write_bytes64<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    write_u64(w, data.len() as u64)?;
    w.write_all(data)
}

/// Read a `u64`-length-prefixed byte buffer.
pub fn read_bytes64<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u64(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(eof)?;
    Ok(buf)
}

/// An insertion-ordered `string -> string` map, as MCAP's `map<string,string>`
/// wire format requires (Channel metadata, Metadata records).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedStringMap(pub Vec<(String, String)>);

impl OrderedStringMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Byte length of the serialized block, not counting its own length prefix.
    fn encoded_len(&self) -> u64 {
        self.0
            .iter()
            .map(|(k, v)| 4 + k.len() as u64 + 4 + v.len() as u64)
            .sum()
    }
}

impl FromIterator<(String, String)> for OrderedStringMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Write a byte-length-prefixed sequence of `(string, string)` pairs.
pub fn write_string_map<W: Write>(w: &mut W, map: &OrderedStringMap) -> io::Result<()> {
    write_u32(w, map.encoded_len() as u32)?;
    for (k, v) in map.iter() {
        write_string(w, k)?;
        write_string(w, v)?;
    }
    Ok(())
}

/// Read a byte-length-prefixed sequence of `(string, string)` pairs.
pub fn read_string_map<R: Read>(r: &mut R) -> Result<OrderedStringMap> {
    let block_len = read_u32(r)? as u64;
    let mut remaining = block_len;
    let mut map = OrderedStringMap::new();
    while remaining > 0 {
        let before = remaining;
        let (key, key_consumed) = read_string_counted(r)?;
        let (value, value_consumed) = read_string_counted(r)?;
        let consumed = key_consumed + value_consumed;
        if consumed > before {
            return Err(McapError::InvalidValue(
                "string map entry overran its declared block length".into(),
            ));
        }
        remaining -= consumed;
        map.insert(key, value);
    }
    Ok(map)
}

fn read_string_counted<R: Read>(r: &mut R) -> Result<(String, u64)> {
    let len = read_u32(r)?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf).map_err(eof)?;
    let s =
        String::from_utf8(buf).map_err(|e| McapError::InvalidValue(format!("non-UTF-8: {e}")))?;
    Ok((s, 4 + len as u64))
}

/// A running CRC32 (IEEE 802.3, zlib-compatible) accumulator that wraps a
/// `Write` stream. Unlike a one-shot hash, it can cover an arbitrarily long
/// region (the whole data section) without buffering the bytes.
pub struct CrcWriter<W> {
    inner: W,
    hasher: crc32fast::Hasher,
    enabled: bool,
}

impl<W: Write> CrcWriter<W> {
    pub fn new(inner: W, enabled: bool) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            enabled,
        }
    }

    /// Current checksum of all bytes written so far. Returns 0 if disabled.
    pub fn checksum(&self) -> u32 {
        if self.enabled {
            self.hasher.clone().finalize()
        } else {
            0
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for CrcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if self.enabled {
            self.hasher.update(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// The read-side counterpart of [`CrcWriter`]: accumulates a running CRC32
/// over every byte actually consumed from the wrapped stream. Used by the
/// streaming reader to cover the data section from MAGIC through the byte
/// before `DataEnd`'s opcode without buffering it.
pub struct CrcReader<R> {
    inner: R,
    hasher: crc32fast::Hasher,
    enabled: bool,
}

impl<R: Read> CrcReader<R> {
    pub fn new(inner: R, enabled: bool) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            enabled,
        }
    }

    /// Current checksum of all bytes read so far. Returns 0 if disabled.
    pub fn checksum(&self) -> u32 {
        if self.enabled {
            self.hasher.clone().finalize()
        } else {
            0
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: Read> Read for CrcReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if self.enabled {
            self.hasher.update(&buf[..n]);
        }
        Ok(n)
    }
}

/// Compute the CRC32 of a byte slice in one shot (used for chunk
/// uncompressed-payload CRCs, which are checksummed over an
/// already-materialized buffer).
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "hello").unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        assert_eq!(read_string(&mut cursor).unwrap(), "hello");
    }

    #[test]
    fn string_map_round_trip_preserves_order() {
        let mut map = OrderedStringMap::new();
        map.insert("b", "2");
        map.insert("a", "1");
        let mut buf = Vec::new();
        write_string_map(&mut buf, &map).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_string_map(&mut cursor).unwrap();
        assert_eq!(
            decoded.0,
            vec![("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn crc_writer_accumulates_across_writes() {
        let mut w = CrcWriter::new(Vec::new(), true);
        w.write_all(b"hello").unwrap();
        w.write_all(b"world").unwrap();
        assert_eq!(w.checksum(), crc32(b"helloworld"));
    }

    #[test]
    fn crc_writer_disabled_reports_zero() {
        let mut w = CrcWriter::new(Vec::new(), false);
        w.write_all(b"hello").unwrap();
        assert_eq!(w.checksum(), 0);
    }

    #[test]
    fn crc_reader_matches_crc_writer() {
        let mut r = CrcReader::new(std::io::Cursor::new(b"helloworld".to_vec()), true);
        let mut buf = [0u8; 5];
        r.read_exact(&mut buf).unwrap();
        r.read_exact(&mut buf).unwrap();
        assert_eq!(r.checksum(), crc32(b"helloworld"));
    }
}
