//! Binary serialization of a [`VectorIndex`].
//!
//! Layout, all integers and floats little-endian:
//!
//! ```text
//! magic    b"SSVI"
//! version  u16
//! dims     u32
//! count    u64
//! vectors  count * dims f32
//! texts    count * (u32 byte length, UTF-8 bytes)
//! ```

use super::VectorIndex;
use crate::error::{Result, ScribeError};

const MAGIC: &[u8; 4] = b"SSVI";
const VERSION: u16 = 1;

impl VectorIndex {
    /// Serialize dimensionality, vectors and texts in insertion order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let text_bytes: usize = self.texts.iter().map(|t| 4 + t.len()).sum();
        let mut out = Vec::with_capacity(18 + self.vectors.len() * 4 + text_bytes);

        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dimensions as u32).to_le_bytes());
        out.extend_from_slice(&(self.texts.len() as u64).to_le_bytes());
        out.extend(self.vectors.iter().flat_map(|f| f.to_le_bytes()));
        for text in &self.texts {
            out.extend_from_slice(&(text.len() as u32).to_le_bytes());
            out.extend_from_slice(text.as_bytes());
        }

        out
    }

    /// Rebuild an index from [`VectorIndex::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };

        if reader.take(4)? != MAGIC {
            return Err(ScribeError::IndexFormat("bad magic".into()));
        }
        let version = u16::from_le_bytes(reader.array()?);
        if version != VERSION {
            return Err(ScribeError::IndexFormat(format!("unsupported version {}", version)));
        }

        let dimensions = u32::from_le_bytes(reader.array()?) as usize;
        let count = usize::try_from(u64::from_le_bytes(reader.array()?))
            .map_err(|_| ScribeError::IndexFormat("entry count overflows".into()))?;

        let float_count = count
            .checked_mul(dimensions)
            .ok_or_else(|| ScribeError::IndexFormat("vector block overflows".into()))?;
        let float_bytes = float_count
            .checked_mul(4)
            .ok_or_else(|| ScribeError::IndexFormat("vector block overflows".into()))?;
        let vectors: Vec<f32> = reader
            .take(float_bytes)?
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let mut texts = Vec::with_capacity(count.min(reader.remaining() / 4));
        for _ in 0..count {
            let len = u32::from_le_bytes(reader.array()?) as usize;
            let raw = reader.take(len)?;
            let text = std::str::from_utf8(raw)
                .map_err(|e| ScribeError::IndexFormat(format!("text is not UTF-8: {}", e)))?;
            texts.push(text.to_string());
        }

        if reader.remaining() != 0 {
            return Err(ScribeError::IndexFormat(format!(
                "{} trailing bytes",
                reader.remaining()
            )));
        }

        Ok(Self {
            dimensions,
            vectors,
            texts,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ScribeError::IndexFormat(format!(
                "truncated: wanted {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take(N)?);
        Ok(arr)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
