use std::io::Cursor;

use anyhow::{Result, anyhow};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::IndexError;
use crate::index::key::KeyType;
use crate::index::node::NODE_INFO_SIZE;
use crate::storage::page::PAGE_SIZE;

pub const INDEX_HEADER_SIZE: usize = 28;

/// Size of one RID/child slab entry: `(page_id: i32, slot_id: i32)`.
pub const RID_ENTRY_SIZE: usize = 8;

/// Persistent index configuration, serialized at offset 0 of page 0 and
/// rewritten after every mutating operation. The rest of page 0 is
/// unused.
#[derive(Debug, Clone)]
pub struct IndexHeader {
    /// Page id of the current root, always > 0.
    pub root_node: i32,
    /// Monotone page counter; the next allocated page id is one past it.
    /// Ids are never reused.
    pub cur_node_num: i32,
    pub key_type: KeyType,
    pub key_len: i32,
    /// Byte size of the node header prefix inside each node page.
    pub node_info_size: i32,
    /// Reserved byte span of the RID/child slab inside each node page.
    pub max_rid_size: i32,
    /// Split threshold: a node splits when its entry count reaches this.
    pub max_key_num: i32,
}

impl IndexHeader {
    /// Layout for a fresh index. With `max_key_num` unset, the threshold
    /// is sized so both slabs fill the page.
    pub fn new(key_type: KeyType, key_len: usize, max_key_num: Option<usize>) -> Result<Self> {
        match key_type {
            KeyType::Int | KeyType::Float if key_len != 4 => {
                return Err(anyhow!(
                    "int and float keys are 4 bytes wide, got {key_len}"
                ));
            }
            KeyType::Str if key_len == 0 => {
                return Err(anyhow!("string keys need a non-zero width"));
            }
            _ => {}
        }

        let per_entry = RID_ENTRY_SIZE + key_len;
        let max = match max_key_num {
            Some(m) => m,
            None => (PAGE_SIZE - NODE_INFO_SIZE) / per_entry,
        };

        let needed = NODE_INFO_SIZE + max * per_entry;
        if max < 2 || needed > PAGE_SIZE {
            return Err(IndexError::LayoutTooLarge {
                needed,
                page_size: PAGE_SIZE,
            }
            .into());
        }

        Ok(Self {
            root_node: 1,
            cur_node_num: 1,
            key_type,
            key_len: key_len as i32,
            node_info_size: NODE_INFO_SIZE as i32,
            max_rid_size: (max * RID_ENTRY_SIZE) as i32,
            max_key_num: max as i32,
        })
    }

    pub fn key_len(&self) -> usize {
        self.key_len as usize
    }

    pub fn max_keys(&self) -> usize {
        self.max_key_num as usize
    }

    pub fn to_bytes(&self) -> Result<[u8; INDEX_HEADER_SIZE]> {
        let mut bytes = [0u8; INDEX_HEADER_SIZE];
        let mut cursor = Cursor::new(&mut bytes[..]);

        cursor.write_i32::<LittleEndian>(self.root_node)?;
        cursor.write_i32::<LittleEndian>(self.cur_node_num)?;
        cursor.write_i32::<LittleEndian>(self.key_type.tag())?;
        cursor.write_i32::<LittleEndian>(self.key_len)?;
        cursor.write_i32::<LittleEndian>(self.node_info_size)?;
        cursor.write_i32::<LittleEndian>(self.max_rid_size)?;
        cursor.write_i32::<LittleEndian>(self.max_key_num)?;

        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let root_node = cursor.read_i32::<LittleEndian>()?;
        let cur_node_num = cursor.read_i32::<LittleEndian>()?;
        let key_type = KeyType::from_tag(cursor.read_i32::<LittleEndian>()?)?;
        let key_len = cursor.read_i32::<LittleEndian>()?;
        let node_info_size = cursor.read_i32::<LittleEndian>()?;
        let max_rid_size = cursor.read_i32::<LittleEndian>()?;
        let max_key_num = cursor.read_i32::<LittleEndian>()?;

        let needed = node_info_size as usize
            + max_rid_size as usize
            + max_key_num as usize * key_len as usize;
        if needed > PAGE_SIZE {
            return Err(IndexError::LayoutTooLarge {
                needed,
                page_size: PAGE_SIZE,
            }
            .into());
        }

        Ok(Self {
            root_node,
            cur_node_num,
            key_type,
            key_len,
            node_info_size,
            max_rid_size,
            max_key_num,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let header = IndexHeader::new(KeyType::Int, 4, Some(4)).unwrap();
        let bytes = header.to_bytes().unwrap();
        let back = IndexHeader::from_bytes(&bytes).unwrap();

        assert_eq!(back.root_node, 1);
        assert_eq!(back.cur_node_num, 1);
        assert_eq!(back.key_type, KeyType::Int);
        assert_eq!(back.key_len, 4);
        assert_eq!(back.node_info_size, NODE_INFO_SIZE as i32);
        assert_eq!(back.max_rid_size, 32);
        assert_eq!(back.max_key_num, 4);
    }

    #[test]
    fn test_default_threshold_fills_page() {
        let header = IndexHeader::new(KeyType::Int, 4, None).unwrap();
        let max = header.max_keys();
        let used = NODE_INFO_SIZE + max * (RID_ENTRY_SIZE + 4);
        assert!(used <= PAGE_SIZE);
        assert!(used + RID_ENTRY_SIZE + 4 > PAGE_SIZE);
    }

    #[test]
    fn test_oversized_layout_rejected() {
        assert!(IndexHeader::new(KeyType::Str, 4096, Some(16)).is_err());
        assert!(IndexHeader::new(KeyType::Int, 4, Some(1)).is_err());
    }

    #[test]
    fn test_bad_tag_rejected() {
        let mut bytes = IndexHeader::new(KeyType::Int, 4, Some(4))
            .unwrap()
            .to_bytes()
            .unwrap();
        bytes[8] = 0xEE;
        assert!(IndexHeader::from_bytes(&bytes).is_err());
    }
}
