//! Borsh-style primitive encoding.
//!
//! Only the subset the agent wallet program uses is implemented:
//!
//! | Type   | Encoding                                |
//! |--------|-----------------------------------------|
//! | u8     | 1 byte                                  |
//! | u64    | 8 bytes little-endian                   |
//! | i64    | 8 bytes little-endian two's complement  |
//! | bool   | 1 byte, 0 or 1                          |
//! | string | u32 LE byte length, then UTF-8 bytes    |
//! | pubkey | 32 raw bytes                            |

use agentwallet_crypto::Pubkey;

use crate::error::{WireError, WireResult};

/// Append-only encoder.
#[derive(Debug, Default, Clone)]
pub struct BorshWriter {
    buf: Vec<u8>,
}

impl BorshWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a leading discriminator or tag.
    pub fn with_prefix(prefix: &[u8]) -> Self {
        Self {
            buf: prefix.to_vec(),
        }
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64(mut self, v: i64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn bool(self, v: bool) -> Self {
        self.u8(v as u8)
    }

    pub fn string(mut self, v: &str) -> Self {
        self.buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(v.as_bytes());
        self
    }

    pub fn pubkey(mut self, v: &Pubkey) -> Self {
        self.buf.extend_from_slice(v.as_bytes());
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-based decoder. Every read names its field so a short buffer
/// reports exactly where decoding stopped.
#[derive(Debug, Clone)]
pub struct BorshReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BorshReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> WireResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(WireError::BufferTooShort {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    pub fn skip(&mut self, field: &'static str, n: usize) -> WireResult<()> {
        self.take(field, n).map(|_| ())
    }

    pub fn bytes(&mut self, field: &'static str, n: usize) -> WireResult<&'a [u8]> {
        self.take(field, n)
    }

    pub fn u8(&mut self, field: &'static str) -> WireResult<u8> {
        Ok(self.take(field, 1)?[0])
    }

    pub fn u16(&mut self, field: &'static str) -> WireResult<u16> {
        Ok(u16::from_le_bytes(self.array(field)?))
    }

    pub fn u32(&mut self, field: &'static str) -> WireResult<u32> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }

    pub fn u64(&mut self, field: &'static str) -> WireResult<u64> {
        Ok(u64::from_le_bytes(self.array(field)?))
    }

    pub fn i64(&mut self, field: &'static str) -> WireResult<i64> {
        Ok(i64::from_le_bytes(self.array(field)?))
    }

    pub fn bool(&mut self, field: &'static str) -> WireResult<bool> {
        match self.u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(WireError::InvalidBool { field, value }),
        }
    }

    pub fn string(&mut self, field: &'static str) -> WireResult<String> {
        let len = self.u32(field)? as usize;
        let raw = self.take(field, len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| WireError::InvalidUtf8(field))
    }

    pub fn pubkey(&mut self, field: &'static str) -> WireResult<Pubkey> {
        Ok(Pubkey::new(self.array(field)?))
    }
}
