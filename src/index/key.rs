use std::cmp::Ordering;

use anyhow::{Result, anyhow};
use byteorder::{ByteOrder, LittleEndian};

use crate::error::IndexError;

/// Attribute type of the indexed column. Keys are stored as fixed-width
/// byte strings; the type decides how those bytes are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Int,
    Float,
    Str,
}

impl KeyType {
    pub fn tag(self) -> i32 {
        match self {
            KeyType::Int => 0,
            KeyType::Float => 1,
            KeyType::Str => 2,
        }
    }

    pub fn from_tag(tag: i32) -> Result<Self, IndexError> {
        match tag {
            0 => Ok(KeyType::Int),
            1 => Ok(KeyType::Float),
            2 => Ok(KeyType::Str),
            other => Err(IndexError::UnknownKeyType(other)),
        }
    }

    /// Total order over two keys of this type. Both slices carry the
    /// configured key width. Float keys use the IEEE total order, so
    /// equality stays bitwise-consistent; NaN keys are not permitted.
    pub fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            KeyType::Int => LittleEndian::read_i32(a).cmp(&LittleEndian::read_i32(b)),
            KeyType::Float => LittleEndian::read_f32(a).total_cmp(&LittleEndian::read_f32(b)),
            KeyType::Str => a.cmp(b),
        }
    }

    /// Parse a key from command-line text into its stored form.
    pub fn encode(self, text: &str, key_len: usize) -> Result<Vec<u8>> {
        match self {
            KeyType::Int => {
                let v: i32 = text.parse()?;
                let mut buf = vec![0u8; key_len];
                LittleEndian::write_i32(&mut buf, v);
                Ok(buf)
            }
            KeyType::Float => {
                let v: f32 = text.parse()?;
                if v.is_nan() {
                    return Err(anyhow!("NaN keys are not orderable"));
                }
                let mut buf = vec![0u8; key_len];
                LittleEndian::write_f32(&mut buf, v);
                Ok(buf)
            }
            KeyType::Str => {
                let bytes = text.as_bytes();
                if bytes.len() > key_len {
                    return Err(anyhow!(
                        "key {:?} is longer than the {}-byte key width",
                        text,
                        key_len
                    ));
                }
                let mut buf = vec![0u8; key_len];
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(buf)
            }
        }
    }

    /// Human-readable form of a stored key, for the dump commands.
    pub fn render(self, bytes: &[u8]) -> String {
        match self {
            KeyType::Int => LittleEndian::read_i32(bytes).to_string(),
            KeyType::Float => LittleEndian::read_f32(bytes).to_string(),
            KeyType::Str => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                String::from_utf8_lossy(&bytes[..end]).into_owned()
            }
        }
    }
}
