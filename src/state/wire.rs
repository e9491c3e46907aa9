//! Cursor-based byte reader/writer shared by the live sysex codec and the
//! state blob. Every read is bounds-checked.

use crate::error::ProtocolError;

/// Reads single bytes and strings from a sysex payload
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(ProtocolError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(ProtocolError::Truncated(self.data.len()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// NUL-terminated string without a length prefix (live sysex format)
    pub fn cstr(&mut self) -> Result<String, ProtocolError> {
        let rest = &self.data[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::Unterminated(self.pos))?;
        let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(s)
    }

    /// String whose already-consumed length byte counts the trailing NUL
    /// (state blob format). The NUL is optional on read.
    pub fn sized_cstr(&mut self, len: u8) -> Result<String, ProtocolError> {
        let raw = self.bytes(len as usize)?;
        let text = match raw.iter().position(|&b| b == 0) {
            Some(nul) => &raw[..nul],
            None => raw,
        };
        Ok(String::from_utf8_lossy(text).into_owned())
    }
}

/// Builds a sysex payload byte by byte
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn cstr(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self
    }

    /// Length byte (string length + 1), the bytes, then NUL
    pub fn sized_cstr(&mut self, s: &str) -> Result<&mut Self, ProtocolError> {
        let len = s.len() + 1;
        if len > u8::MAX as usize {
            return Err(ProtocolError::StringTooLong(s.len()));
        }
        self.buf.push(len as u8);
        Ok(self.cstr(s))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_past_end_fail_without_advancing() {
        let mut r = ByteReader::new(&[7]);
        assert_eq!(r.u8(), Ok(7));
        assert_eq!(r.u8(), Err(ProtocolError::Truncated(1)));
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn cstr_requires_terminator() {
        let mut r = ByteReader::new(b"kick.wav\0snare");
        assert_eq!(r.cstr().unwrap(), "kick.wav");
        assert_eq!(r.cstr(), Err(ProtocolError::Unterminated(9)));
    }

    #[test]
    fn sized_cstr_counts_the_nul() {
        let mut w = ByteWriter::new();
        w.sized_cstr("hat").unwrap();
        let bytes = w.finish();
        assert_eq!(bytes, vec![4, b'h', b'a', b't', 0]);

        let mut r = ByteReader::new(&bytes);
        let len = r.u8().unwrap();
        assert_eq!(r.sized_cstr(len).unwrap(), "hat");
        assert!(r.is_empty());
    }

    #[test]
    fn sized_cstr_rejects_declared_length_beyond_buffer() {
        let mut r = ByteReader::new(&[b'a', b'b']);
        assert_eq!(r.sized_cstr(9), Err(ProtocolError::Truncated(2)));
    }

    #[test]
    fn overlong_strings_are_rejected() {
        let long = "x".repeat(255);
        let mut w = ByteWriter::new();
        assert_eq!(
            w.sized_cstr(&long).err(),
            Some(ProtocolError::StringTooLong(255))
        );
    }
}
