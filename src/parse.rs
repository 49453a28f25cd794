use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::QueryError;

/// Some servers prefix names with this colour escape. When it shows up
/// anywhere in a string, the first four bytes of that string are dropped.
const COLOR_MARKER: &[u8; 4] = b"\x1b\n\xf5\n";

/// Forward-only reader over the body of a single reply datagram.
pub struct PacketReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        PacketReader {
            cursor: Cursor::new(data),
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    /// True while unread bytes remain.
    pub fn has_data(&self) -> bool {
        self.remaining() > 0
    }

    /// Get 4 bytes (as a little-endian [i32]).
    pub fn get_i32(&mut self) -> Result<i32, QueryError> {
        let remaining = self.remaining();
        self.cursor
            .read_i32::<LittleEndian>()
            .map_err(|_| QueryError::Truncated { needed: 4, remaining })
    }

    /// Get a length-prefixed string.
    ///
    /// The prefix byte counts the string's trailing NUL, so a prefix of `L`
    /// consumes `L + 1` bytes and yields `L - 1` bytes of text. A prefix of 0
    /// consumes only itself.
    pub fn get_string(&mut self) -> Result<String, QueryError> {
        let remaining = self.remaining();
        let length = self
            .cursor
            .read_u8()
            .map_err(|_| QueryError::Truncated { needed: 1, remaining })? as usize;
        if length == 0 {
            return Ok(String::new());
        }

        let remaining = self.remaining();
        let mut raw = vec![0u8; length];
        self.cursor
            .read_exact(&mut raw)
            .map_err(|_| QueryError::Truncated { needed: length, remaining })?;
        raw.truncate(length - 1);

        if find_bytes(&raw, COLOR_MARKER).is_some() {
            raw.drain(..COLOR_MARKER.len());
        }

        Ok(decode_text(raw))
    }
}

/// Index of the first occurrence of `needle` in `haystack`.
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Servers send whatever their locale gives them; anything that isn't UTF-8
/// is read as Latin-1.
fn decode_text(raw: Vec<u8>) -> String {
    String::from_utf8(raw)
        .unwrap_or_else(|err| err.into_bytes().into_iter().map(char::from).collect())
}


#[cfg(test)]
mod tests {
    use super::encode::{put_i32, put_raw_string, put_string};
    use super::*;

    #[test]
    fn reads_little_endian_i32() {
        let data = [0x61, 0x1e, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.get_i32().unwrap(), 7777);
        assert_eq!(reader.get_i32().unwrap(), -1);
        assert!(!reader.has_data());
    }

    #[test]
    fn short_i32_is_truncated() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = PacketReader::new(&data);
        match reader.get_i32() {
            Err(QueryError::Truncated { needed, remaining }) => {
                assert_eq!(needed, 4);
                assert_eq!(remaining, 3);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn string_length_counts_the_nul() {
        let data = b"\x06Arena\x00\x09";
        let mut reader = PacketReader::new(data);
        assert_eq!(reader.get_string().unwrap(), "Arena");
        assert_eq!(reader.position(), 7);
        assert!(reader.has_data());
    }

    #[test]
    fn empty_string_advances_one_byte_anywhere() {
        let mut data = Vec::new();
        put_string(&mut data, "");
        put_i32(&mut data, 3);
        put_string(&mut data, "");
        put_string(&mut data, "x");
        put_string(&mut data, "");

        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.get_string().unwrap(), "");
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.get_i32().unwrap(), 3);
        assert_eq!(reader.get_string().unwrap(), "");
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.get_string().unwrap(), "x");
        assert_eq!(reader.get_string().unwrap(), "");
        assert_eq!(reader.position(), data.len());
    }

    #[test]
    fn nul_only_string_is_empty() {
        let data = [0x01, 0x00];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.get_string().unwrap(), "");
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn marker_strips_leading_four_bytes() {
        let mut data = Vec::new();
        put_raw_string(&mut data, b"\x1b\n\xf5\nPlayer");
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.get_string().unwrap(), "Player");
    }

    #[test]
    fn marker_anywhere_still_strips_the_prefix() {
        let mut data = Vec::new();
        put_raw_string(&mut data, b"abcdXY\x1b\n\xf5\nZ");
        let mut reader = PacketReader::new(&data);
        // the marker itself is not removed, only the first four bytes
        assert_eq!(reader.get_string().unwrap(), "XY\u{1b}\n\u{f5}\nZ");
    }

    #[test]
    fn plain_string_is_unmodified() {
        let mut data = Vec::new();
        put_raw_string(&mut data, b"\x1b\nplain");
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.get_string().unwrap(), "\u{1b}\nplain");
    }

    #[test]
    fn latin1_bytes_decode_per_byte() {
        let mut data = Vec::new();
        put_raw_string(&mut data, b"Caf\xe9");
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.get_string().unwrap(), "Café");
    }

    #[test]
    fn string_past_the_end_is_truncated() {
        let data = [0x08, b'a', b'b'];
        let mut reader = PacketReader::new(&data);
        assert!(matches!(
            reader.get_string(),
            Err(QueryError::Truncated { needed: 8, remaining: 2 })
        ));
    }

    #[test]
    fn find_bytes_locates_first_match() {
        assert_eq!(find_bytes(b"xxabcab", b"ab"), Some(2));
        assert_eq!(find_bytes(b"xyz", b"ab"), None);
        assert_eq!(find_bytes(b"a", b"abc"), None);
    }
}
