use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::error::IndexError;
use crate::index::header::{INDEX_HEADER_SIZE, IndexHeader};
use crate::index::key::KeyType;
use crate::index::node::Node;
use crate::index::Rid;
use crate::storage::buffer::{BufferPool, GlobalPageId};

/// Outcome a recursive insert hands back to its caller. A split reports
/// the minimum keys of both halves plus the new right sibling's page, so
/// the parent can rewrite its separators.
enum Ascent {
    None,
    Split {
        left_min: Vec<u8>,
        right_min: Vec<u8>,
        right_page: i32,
    },
}

/// Handle over one open index file. Page 0 holds the persistent header;
/// every other page is a tree node. All traversal is by page id through
/// the buffer pool; nodes are copied out on load and written back
/// explicitly, so no reference into pool memory outlives a call.
///
/// Deletion never rebalances by borrow or merge: a node that empties is
/// unlinked from its parent and its page id is abandoned. Callers must
/// serialize access to a handle; there is no internal locking.
pub struct IndexHandle {
    pool: Arc<BufferPool>,
    file_id: u32,
    header: IndexHeader,
}

impl IndexHandle {
    /// Initialize a fresh index in an (empty) registered file: header on
    /// page 0, an empty root leaf on page 1. `max_key_num` is the split
    /// threshold; `None` sizes it to fill a page.
    pub fn create(
        pool: Arc<BufferPool>,
        file_id: u32,
        key_type: KeyType,
        key_len: usize,
        max_key_num: Option<usize>,
    ) -> Result<Self> {
        let header = IndexHeader::new(key_type, key_len, max_key_num)?;

        pool.create_page(GlobalPageId { file_id, page_id: 0 })?;
        pool.create_page(GlobalPageId { file_id, page_id: 1 })?;

        let handle = Self {
            pool,
            file_id,
            header,
        };

        let mut root = Node::alloc(&handle.header, 1);
        root.init(true, 0, 0, 0);
        handle.force_write(&root)?;
        handle.update_file_config()?;

        Ok(handle)
    }

    /// Open an existing index by reading the header from page 0.
    pub fn open(pool: Arc<BufferPool>, file_id: u32) -> Result<Self> {
        let page = pool.fetch_page(GlobalPageId { file_id, page_id: 0 })?;
        let header = {
            let guard = page.read();
            IndexHeader::from_bytes(&guard.data)?
        };

        Ok(Self {
            pool,
            file_id,
            header,
        })
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Write every dirty cached page of the pool out to disk.
    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all()
    }

    /// Place `(key, rid)` in the tree. Duplicate keys are accepted and
    /// keep insertion order within a leaf. Returns true when placed.
    pub fn insert(&mut self, key: &[u8], rid: Rid) -> Result<bool> {
        self.check_key(key)?;
        let root = self.header.root_node;

        let (placed, ascent) = self.recur_insert(root, key, rid)?;

        if let Ascent::Split {
            left_min,
            right_min,
            right_page,
        } = ascent
        {
            // The root itself split: grow the tree by one level.
            let new_root_id = self.allocate_node()?;
            let mut new_root = Node::alloc(&self.header, new_root_id);
            new_root.init(false, 0, 0, 0);
            new_root.insert_entry(0, &left_min, Rid::new(root, -1));
            new_root.insert_entry(1, &right_min, Rid::new(right_page, -1));
            self.modify_parent(root, new_root_id)?;
            self.modify_parent(right_page, new_root_id)?;
            self.force_write(&new_root)?;
            self.header.root_node = new_root_id;
        }

        self.update_file_config()?;
        Ok(placed)
    }

    /// Remove the entry matching `key` and `rid` exactly. Returns false
    /// when no such entry is reachable.
    pub fn delete(&mut self, key: &[u8], rid: Rid) -> Result<bool> {
        self.check_key(key)?;
        let root = self.header.root_node;

        let (removed, _) = self.recur_delete(root, key, rid)?;

        self.update_file_config()?;
        Ok(removed)
    }

    /// Rightmost matching position among equal keys along the descent
    /// path, as `(page, index)`.
    pub fn search_last(&self, key: &[u8]) -> Result<Option<(i32, usize)>> {
        self.check_key(key)?;
        self.recur_search_last(self.header.root_node, key)
    }

    /// Leftmost matching position. Equal keys may extend across leaf
    /// boundaries to the left of the descent target, so this walks the
    /// sibling chain backwards until the run of equal keys ends.
    pub fn search_first(&self, key: &[u8]) -> Result<Option<(i32, usize)>> {
        self.check_key(key)?;
        let Some((start_id, start_index)) = self.recur_search_last(self.header.root_node, key)?
        else {
            return Ok(None);
        };

        let mut node = self.load_node(start_id)?;
        let mut ret = (start_id, start_index);
        let mut start = start_index as i64;
        loop {
            let mut i = start;
            while i >= 0 {
                if self.cmp(key, node.key(i as usize)) == Ordering::Equal {
                    ret = (node.self_id, i as usize);
                    i -= 1;
                } else {
                    return Ok(Some(ret));
                }
            }
            if node.prev > 0 {
                node = self.load_node(node.prev)?;
                start = node.cur_num as i64 - 1;
            } else {
                return Ok(Some(ret));
            }
        }
    }

    /// Every RID stored under `key`, gathered by the same leftward walk
    /// as `search_first`. Order follows the walk (rightmost leaf first).
    pub fn search_all(&self, key: &[u8]) -> Result<Vec<Rid>> {
        self.check_key(key)?;
        let mut out = Vec::new();
        let Some((start_id, start_index)) = self.recur_search_last(self.header.root_node, key)?
        else {
            return Ok(out);
        };

        let mut node = self.load_node(start_id)?;
        let mut start = start_index as i64;
        loop {
            let mut i = start;
            while i >= 0 {
                if self.cmp(key, node.key(i as usize)) == Ordering::Equal {
                    out.push(node.rid(i as usize));
                    i -= 1;
                } else {
                    return Ok(out);
                }
            }
            if node.prev > 0 {
                node = self.load_node(node.prev)?;
                start = node.cur_num as i64 - 1;
            } else {
                return Ok(out);
            }
        }
    }

    /// Walk the whole leaf level in stored order, returning keys and
    /// RIDs as parallel vectors. Globally non-decreasing by key.
    pub fn iter_leaves(&self) -> Result<(Vec<Vec<u8>>, Vec<Rid>)> {
        let mut keys = Vec::new();
        let mut rids = Vec::new();

        let mut node = self.load_node(self.header.root_node)?;
        while !node.is_leaf {
            if node.is_empty() {
                return Ok((keys, rids));
            }
            node = self.load_node(node.page(0))?;
        }

        loop {
            for i in 0..node.len() {
                keys.push(node.key(i).to_vec());
                rids.push(node.rid(i));
            }
            if node.next > 0 {
                node = self.load_node(node.next)?;
            } else {
                return Ok((keys, rids));
            }
        }
    }

    /// View of the leftmost leaf.
    pub fn first_leaf(&self) -> Result<Node> {
        let mut node = self.load_node(self.header.root_node)?;
        while !node.is_leaf {
            if node.is_empty() {
                return Err(anyhow!("index has no leaf level below the root"));
            }
            node = self.load_node(node.page(0))?;
        }
        Ok(node)
    }

    /// Indented recursive dump of the subtree under `page_id`.
    /// Developer aid only.
    pub fn debug(&self, page_id: i32) -> Result<String> {
        let mut out = String::new();
        self.dump_node(page_id, 0, &mut out)?;
        Ok(out)
    }

    pub fn load_node(&self, page_id: i32) -> Result<Node> {
        let page = self.pool.fetch_page(self.gid(page_id))?;
        let guard = page.read();
        Ok(Node::load(&guard.data, page_id, &self.header))
    }

    /// Write a node back to its page and mark it dirty. A non-positive
    /// `self_id` is the "no such page" sentinel and turns this into a
    /// no-op.
    fn force_write(&self, node: &Node) -> Result<()> {
        if node.self_id <= 0 {
            return Ok(());
        }
        let page = self.pool.fetch_page(self.gid(node.self_id))?;
        let mut guard = page.write();
        node.store(&mut guard.data);
        guard.dirty = true;
        Ok(())
    }

    fn gid(&self, page_id: i32) -> GlobalPageId {
        GlobalPageId {
            file_id: self.file_id,
            page_id: page_id as u32,
        }
    }

    fn cmp(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.header.key_type.compare(a, b)
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.header.key_len() {
            return Err(IndexError::KeyWidthMismatch {
                expected: self.header.key_len(),
                got: key.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Claim the next page id and materialize a zeroed page for it.
    fn allocate_node(&mut self) -> Result<i32> {
        self.header.cur_node_num += 1;
        let id = self.header.cur_node_num;
        self.pool.create_page(self.gid(id))?;
        Ok(id)
    }

    /// Rewrite page 0 from the in-memory header. Runs at the end of
    /// every mutating public operation.
    fn update_file_config(&self) -> Result<()> {
        let page = self.pool.fetch_page(self.gid(0))?;
        let mut guard = page.write();
        let bytes = self.header.to_bytes()?;
        guard.data[..INDEX_HEADER_SIZE].copy_from_slice(&bytes);
        guard.dirty = true;
        Ok(())
    }

    fn recur_insert(&mut self, node_id: i32, key: &[u8], rid: Rid) -> Result<(bool, Ascent)> {
        let mut node = self.load_node(node_id)?;
        let mut placed = false;

        if !node.is_leaf {
            let n = node.len();
            let mut descended = false;
            for i in (0..n).rev() {
                // First child from the right whose recorded minimum the
                // key reaches; child 0 also catches under-minimum keys.
                if i == 0 || self.cmp(key, node.key(i)) != Ordering::Less {
                    let child = node.page(i);
                    let (p, ascent) = self.recur_insert(child, key, rid)?;
                    placed = p;
                    if let Ascent::Split {
                        left_min,
                        right_min,
                        right_page,
                    } = ascent
                    {
                        let c = self.which_child(&node, child)?;
                        node.insert_entry(c + 1, &right_min, Rid::new(right_page, -1));
                        node.set_key(c, &left_min);
                    }
                    descended = true;
                    break;
                }
            }
            if !descended {
                // Internal root with no children left; nowhere to place.
                return Ok((false, Ascent::None));
            }
        } else {
            let mut i = node.len();
            while i > 0 && self.cmp(key, node.key(i - 1)) == Ordering::Less {
                i -= 1;
            }
            node.insert_entry(i, key, rid);
            placed = true;
        }

        let ascent = if node.len() >= self.header.max_keys() {
            self.split_node(&mut node)?
        } else {
            Ascent::None
        };

        self.force_write(&node)?;
        Ok((placed, ascent))
    }

    /// Split a full node: the upper half moves to a freshly allocated
    /// right sibling. Moved children are reparented; the leaf chain is
    /// rewired on both sides.
    fn split_node(&mut self, node: &mut Node) -> Result<Ascent> {
        let right_id = self.allocate_node()?;
        let mut right = Node::alloc(&self.header, right_id);
        right.init(node.is_leaf, node.self_id, node.next, node.parent);

        let m = node.len() / 2;
        let count = node.len() - m;
        for j in 0..count {
            right.set_key(j, node.key(m + j));
            right.set_rid(j, node.rid(m + j));
        }
        right.cur_num = count as i32;

        node.cur_num = m as i32;
        node.next = right_id;

        if !right.is_leaf {
            for j in 0..count {
                let child = right.page(j);
                if child > 0 {
                    self.modify_parent(child, right_id)?;
                }
            }
        } else if right.next > 0 {
            self.modify_prev(right.next, right_id)?;
        }

        self.force_write(&right)?;

        Ok(Ascent::Split {
            left_min: node.key(0).to_vec(),
            right_min: right.key(0).to_vec(),
            right_page: right_id,
        })
    }

    /// Returns `(removed, became_empty)`; the caller drops an emptied
    /// child from its own entry array.
    fn recur_delete(&mut self, node_id: i32, key: &[u8], rid: Rid) -> Result<(bool, bool)> {
        let mut node = self.load_node(node_id)?;
        let mut removed = false;

        if !node.is_leaf {
            let n = node.len();
            if n == 0 {
                return Ok((false, false));
            }

            let mut start = 0;
            for i in 0..n {
                start = i;
                if i == n - 1 || self.cmp(key, node.key(i + 1)) == Ordering::Less {
                    break;
                }
            }

            for i in (start..n).rev() {
                if i == start || self.cmp(key, node.key(i)) != Ordering::Less {
                    let child = node.page(i);
                    let (r, child_empty) = self.recur_delete(child, key, rid)?;
                    if child_empty {
                        let c = self.which_child(&node, child)?;
                        node.remove_entry(c);
                    }
                    removed |= r;
                    if removed {
                        break;
                    }
                }
            }

            if !removed {
                return Ok((false, false));
            }
        } else {
            let mut found = None;
            for i in 0..node.len() {
                if self.cmp(key, node.key(i)) == Ordering::Equal && node.rid(i) == rid {
                    found = Some(i);
                    break;
                }
            }
            match found {
                Some(i) => {
                    node.remove_entry(i);
                    removed = true;
                }
                None => return Ok((false, false)),
            }
        }

        let mut became_empty = false;
        if node.is_empty() {
            if node.is_leaf {
                // Splice out of the sibling chain before the parent
                // forgets this node.
                if node.prev > 0 {
                    self.modify_next(node.prev, node.next)?;
                }
                if node.next > 0 {
                    self.modify_prev(node.next, node.prev)?;
                }
            }
            // An empty root stays the root.
            if node_id != self.header.root_node {
                became_empty = true;
            }
        }

        self.force_write(&node)?;
        Ok((removed, became_empty))
    }

    fn recur_search_last(&self, node_id: i32, key: &[u8]) -> Result<Option<(i32, usize)>> {
        let node = self.load_node(node_id)?;

        if !node.is_leaf {
            let n = node.len();
            for i in (0..n).rev() {
                if i == 0 || self.cmp(key, node.key(i)) != Ordering::Less {
                    return self.recur_search_last(node.page(i), key);
                }
            }
            Ok(None)
        } else {
            for i in (0..node.len()).rev() {
                if self.cmp(key, node.key(i)) == Ordering::Equal {
                    return Ok(Some((node_id, i)));
                }
            }
            Ok(None)
        }
    }

    /// Position of `child` among the parent's children. Absence means
    /// the parent/child pointers disagree, which is a structural fault,
    /// not a lookup miss.
    fn which_child(&self, parent: &Node, child: i32) -> Result<usize> {
        for i in 0..parent.len() {
            if parent.page(i) == child {
                return Ok(i);
            }
        }
        Err(IndexError::ChildNotFound {
            child,
            parent: parent.self_id,
        }
        .into())
    }

    fn modify_parent(&self, id: i32, parent: i32) -> Result<()> {
        let mut node = self.load_node(id)?;
        node.parent = parent;
        self.force_write(&node)
    }

    fn modify_prev(&self, id: i32, prev: i32) -> Result<()> {
        let mut node = self.load_node(id)?;
        node.prev = prev;
        self.force_write(&node)
    }

    fn modify_next(&self, id: i32, next: i32) -> Result<()> {
        let mut node = self.load_node(id)?;
        node.next = next;
        self.force_write(&node)
    }

    fn dump_node(&self, page_id: i32, depth: usize, out: &mut String) -> Result<()> {
        let node = self.load_node(page_id)?;
        let indent = "  ".repeat(depth);
        let kind = if node.is_leaf { "leaf" } else { "node" };
        let _ = writeln!(
            out,
            "{indent}{kind} page={} parent={} prev={} next={} entries={}",
            node.self_id, node.parent, node.prev, node.next, node.cur_num
        );
        for i in 0..node.len() {
            let key = self.header.key_type.render(node.key(i));
            if node.is_leaf {
                let _ = writeln!(
                    out,
                    "{indent}  [{i}] {key} -> rid({}, {})",
                    node.page(i),
                    node.slot(i)
                );
            } else {
                let _ = writeln!(out, "{indent}  [{i}] {key} -> child {}", node.page(i));
            }
        }
        if !node.is_leaf {
            for i in 0..node.len() {
                self.dump_node(node.page(i), depth + 1, out)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::pager::Pager;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn setup(max: usize) -> (NamedTempFile, IndexHandle) {
        let file = NamedTempFile::new().unwrap();
        let pager = Arc::new(Pager::open(file.path()).unwrap());
        let pool = Arc::new(BufferPool::new(32));
        pool.register_pager(0, pager);
        let handle = IndexHandle::create(pool, 0, KeyType::Int, 4, Some(max)).unwrap();
        (file, handle)
    }

    fn k(v: i32) -> [u8; 4] {
        v.to_le_bytes()
    }

    fn rid(n: i32) -> Rid {
        Rid::new(n, n)
    }

    fn iter_keys(h: &IndexHandle) -> Vec<i32> {
        let (keys, _) = h.iter_leaves().unwrap();
        keys.iter()
            .map(|b| i32::from_le_bytes(b[..4].try_into().unwrap()))
            .collect()
    }

    fn leaf_ids(h: &IndexHandle) -> Vec<i32> {
        let mut node = h.first_leaf().unwrap();
        let mut ids = vec![node.self_id];
        while node.next > 0 {
            node = h.load_node(node.next).unwrap();
            ids.push(node.self_id);
        }
        ids
    }

    fn check_leaf_chain(h: &IndexHandle) {
        let ids = leaf_ids(h);
        for w in ids.windows(2) {
            let a = h.load_node(w[0]).unwrap();
            let b = h.load_node(w[1]).unwrap();
            assert_eq!(a.next, w[1]);
            assert_eq!(b.prev, w[0]);
        }
        assert!(h.load_node(ids[0]).unwrap().prev <= 0);
        assert!(h.load_node(*ids.last().unwrap()).unwrap().next <= 0);
    }

    // Structural sweep: parent pointers, in-node key order, fill bounds.
    // With `strict_separators` every internal key must equal its child
    // subtree's minimum. Relaxed runs (after deletes or under-minimum
    // inserts) only require separators past position 0 to stay lower
    // bounds; position 0 is the catch-all and may sit above its child's
    // minimum.
    fn check_node(h: &IndexHandle, id: i32, is_root: bool, strict_separators: bool) {
        let node = h.load_node(id).unwrap();
        assert!(node.cur_num < h.header.max_key_num);
        if !is_root {
            assert!(node.cur_num > 0);
        }
        for i in 1..node.len() {
            assert_ne!(
                h.cmp(node.key(i - 1), node.key(i)),
                Ordering::Greater,
                "keys out of order in page {id}"
            );
        }
        if !node.is_leaf {
            for i in 0..node.len() {
                let child = h.load_node(node.page(i)).unwrap();
                assert_eq!(child.parent, id, "bad parent pointer on page {}", node.page(i));
                if strict_separators {
                    assert_eq!(node.key(i), child.key(0));
                } else if i > 0 {
                    assert_ne!(h.cmp(node.key(i), child.key(0)), Ordering::Greater);
                }
                check_node(h, node.page(i), false, strict_separators);
            }
        }
    }

    fn check_tree(h: &IndexHandle, strict_separators: bool) {
        let root = h.load_node(h.header.root_node).unwrap();
        assert!(root.parent <= 0);
        check_node(h, h.header.root_node, true, strict_separators);
        check_leaf_chain(h);
    }

    #[test]
    fn test_empty_index() {
        let (_f, h) = setup(4);
        assert_eq!(h.search_first(&k(1)).unwrap(), None);
        assert_eq!(h.search_last(&k(1)).unwrap(), None);
        assert!(h.search_all(&k(1)).unwrap().is_empty());
        assert_eq!(iter_keys(&h), Vec::<i32>::new());
    }

    #[test]
    fn test_single_leaf_basics() {
        let (_f, mut h) = setup(4);
        assert!(h.insert(&k(10), rid(100)).unwrap());
        assert!(h.insert(&k(20), rid(200)).unwrap());
        assert!(h.insert(&k(30), rid(300)).unwrap());

        let (page, idx) = h.search_last(&k(20)).unwrap().unwrap();
        let node = h.load_node(page).unwrap();
        assert_eq!(node.rid(idx), rid(200));

        assert!(h.search_all(&k(25)).unwrap().is_empty());

        let (keys, rids) = h.iter_leaves().unwrap();
        assert_eq!(keys, vec![k(10).to_vec(), k(20).to_vec(), k(30).to_vec()]);
        assert_eq!(rids, vec![rid(100), rid(200), rid(300)]);
    }

    #[test]
    fn test_key_width_mismatch_is_fatal() {
        let (_f, mut h) = setup(4);
        let err = h.insert(&[1, 2], rid(1)).unwrap_err();
        assert!(err.downcast_ref::<IndexError>().is_some());
    }

    #[test]
    fn test_sequential_inserts_split() {
        let (_f, mut h) = setup(4);
        for v in 1..=7 {
            assert!(h.insert(&k(v), rid(v)).unwrap());
        }

        assert_eq!(iter_keys(&h), (1..=7).collect::<Vec<_>>());
        assert!(leaf_ids(&h).len() >= 2);

        let root = h.load_node(h.header.root_node).unwrap();
        assert!(!root.is_leaf);
        check_tree(&h, true);
    }

    #[test]
    fn test_duplicates_across_split() {
        let (_f, mut h) = setup(4);
        for n in 1..=5 {
            assert!(h.insert(&k(5), rid(n)).unwrap());
        }

        let mut found = h.search_all(&k(5)).unwrap();
        found.sort_by_key(|r| r.page);
        assert_eq!(found, (1..=5).map(rid).collect::<Vec<_>>());
        check_leaf_chain(&h);
    }

    #[test]
    fn test_delete_collapses_root_leaf() {
        let (_f, mut h) = setup(4);
        for v in 1..=3 {
            h.insert(&k(v), rid(v)).unwrap();
        }
        for v in 1..=3 {
            assert!(h.delete(&k(v), rid(v)).unwrap());
        }

        assert_eq!(iter_keys(&h), Vec::<i32>::new());
        assert!(h.search_all(&k(2)).unwrap().is_empty());

        assert!(h.insert(&k(4), rid(4)).unwrap());
        assert_eq!(h.search_all(&k(4)).unwrap(), vec![rid(4)]);
    }

    #[test]
    fn test_delete_missing_rid() {
        let (_f, mut h) = setup(4);
        h.insert(&k(10), rid(1)).unwrap();
        assert!(!h.delete(&k(10), Rid::new(9, 9)).unwrap());
        assert_eq!(h.search_all(&k(10)).unwrap(), vec![rid(1)]);
    }

    #[test]
    fn test_delete_idempotent() {
        let (_f, mut h) = setup(4);
        for v in 1..=4 {
            h.insert(&k(v), rid(v)).unwrap();
        }
        assert!(h.delete(&k(2), rid(2)).unwrap());
        assert!(!h.delete(&k(2), rid(2)).unwrap());
        assert_eq!(iter_keys(&h), vec![1, 3, 4]);
    }

    #[test]
    fn test_duplicate_range_walk() {
        let (_f, mut h) = setup(4);
        h.insert(&k(7), rid(1)).unwrap();
        h.insert(&k(7), rid(2)).unwrap();
        h.insert(&k(7), rid(3)).unwrap();
        h.insert(&k(8), rid(9)).unwrap();

        let (first_page, first_idx) = h.search_first(&k(7)).unwrap().unwrap();
        let (last_page, last_idx) = h.search_last(&k(7)).unwrap().unwrap();
        let first_node = h.load_node(first_page).unwrap();
        let last_node = h.load_node(last_page).unwrap();
        assert_eq!(first_node.key(first_idx), &k(7));
        assert_eq!(last_node.key(last_idx), &k(7));

        // Rightward walk from the first match until the key changes.
        let mut node = first_node;
        let mut idx = first_idx;
        let mut seen = Vec::new();
        loop {
            if idx >= node.len() {
                if node.next > 0 {
                    node = h.load_node(node.next).unwrap();
                    idx = 0;
                    continue;
                }
                break;
            }
            if h.cmp(node.key(idx), &k(7)) != Ordering::Equal {
                break;
            }
            seen.push(node.rid(idx));
            idx += 1;
        }
        assert_eq!(seen, vec![rid(1), rid(2), rid(3)]);
    }

    #[test]
    fn test_delete_splices_inner_leaf() {
        let (_f, mut h) = setup(4);
        for v in 1..=7 {
            h.insert(&k(v), rid(v)).unwrap();
        }

        assert!(h.delete(&k(3), rid(3)).unwrap());
        assert!(h.delete(&k(4), rid(4)).unwrap());

        assert_eq!(iter_keys(&h), vec![1, 2, 5, 6, 7]);
        assert!(h.search_all(&k(3)).unwrap().is_empty());
        assert!(h.search_all(&k(4)).unwrap().is_empty());
        check_tree(&h, false);
    }

    #[test]
    fn test_bulk_ascending() {
        let (_f, mut h) = setup(4);
        for v in 1..=100 {
            assert!(h.insert(&k(v), rid(v)).unwrap());
        }

        assert_eq!(iter_keys(&h), (1..=100).collect::<Vec<_>>());
        for v in 1..=100 {
            assert_eq!(h.search_all(&k(v)).unwrap(), vec![rid(v)], "key {v}");
        }
        assert!(h.search_all(&k(101)).unwrap().is_empty());
        check_tree(&h, true);
    }

    #[test]
    fn test_bulk_descending() {
        let (_f, mut h) = setup(4);
        for v in (1..=30).rev() {
            assert!(h.insert(&k(v), rid(v)).unwrap());
        }

        assert_eq!(iter_keys(&h), (1..=30).collect::<Vec<_>>());
        for v in 1..=30 {
            assert_eq!(h.search_all(&k(v)).unwrap(), vec![rid(v)]);
        }
        check_tree(&h, false);
    }

    #[test]
    fn test_insert_below_minimum() {
        let (_f, mut h) = setup(4);
        for v in [10, 20, 30, 40] {
            h.insert(&k(v), rid(v)).unwrap();
        }
        h.insert(&k(5), rid(5)).unwrap();

        assert_eq!(iter_keys(&h), vec![5, 10, 20, 30, 40]);
        assert_eq!(h.search_all(&k(5)).unwrap(), vec![rid(5)]);
        assert_eq!(h.search_first(&k(5)).unwrap(), h.search_last(&k(5)).unwrap());
        check_tree(&h, false);
    }

    #[test]
    fn test_bulk_with_deletes() {
        let (_f, mut h) = setup(4);
        for v in 1..=40 {
            h.insert(&k(v), rid(v)).unwrap();
        }
        for v in (2..=40).step_by(2) {
            assert!(h.delete(&k(v), rid(v)).unwrap(), "delete {v}");
        }

        assert_eq!(iter_keys(&h), (1..=40).step_by(2).collect::<Vec<_>>());
        for v in (2..=40).step_by(2) {
            assert!(h.search_all(&k(v)).unwrap().is_empty());
            assert!(!h.delete(&k(v), rid(v)).unwrap());
        }
        for v in (1..=40).step_by(2) {
            assert_eq!(h.search_all(&k(v)).unwrap(), vec![rid(v)]);
        }
        check_tree(&h, false);
    }

    #[test]
    fn test_reopen_persistence() {
        let file = NamedTempFile::new().unwrap();
        {
            let pager = Arc::new(Pager::open(file.path()).unwrap());
            let pool = Arc::new(BufferPool::new(32));
            pool.register_pager(0, pager);
            let mut h = IndexHandle::create(pool, 0, KeyType::Int, 4, Some(4)).unwrap();
            for v in 1..=10 {
                h.insert(&k(v), rid(v)).unwrap();
            }
            h.flush().unwrap();
        }

        let pager = Arc::new(Pager::open(file.path()).unwrap());
        let pool = Arc::new(BufferPool::new(32));
        pool.register_pager(0, pager);
        let mut h = IndexHandle::open(pool, 0).unwrap();

        assert_eq!(iter_keys(&h), (1..=10).collect::<Vec<_>>());
        assert!(h.insert(&k(11), rid(11)).unwrap());
        assert_eq!(h.search_all(&k(11)).unwrap(), vec![rid(11)]);
        check_tree(&h, true);
    }

    #[test]
    fn test_float_keys() {
        let file = NamedTempFile::new().unwrap();
        let pager = Arc::new(Pager::open(file.path()).unwrap());
        let pool = Arc::new(BufferPool::new(32));
        pool.register_pager(0, pager);
        let mut h = IndexHandle::create(pool, 0, KeyType::Float, 4, Some(4)).unwrap();

        let fk = |v: f32| v.to_le_bytes();
        h.insert(&fk(2.25), rid(3)).unwrap();
        h.insert(&fk(-1.5), rid(1)).unwrap();
        h.insert(&fk(0.0), rid(2)).unwrap();

        let (keys, _) = h.iter_leaves().unwrap();
        let decoded: Vec<f32> = keys
            .iter()
            .map(|b| f32::from_le_bytes(b[..4].try_into().unwrap()))
            .collect();
        assert_eq!(decoded, vec![-1.5, 0.0, 2.25]);
        assert_eq!(h.search_all(&fk(0.0)).unwrap(), vec![rid(2)]);
    }

    #[test]
    fn test_string_keys() {
        let file = NamedTempFile::new().unwrap();
        let pager = Arc::new(Pager::open(file.path()).unwrap());
        let pool = Arc::new(BufferPool::new(32));
        pool.register_pager(0, pager);
        let mut h = IndexHandle::create(pool, 0, KeyType::Str, 8, Some(4)).unwrap();

        let apple = KeyType::Str.encode("apple", 8).unwrap();
        let banana = KeyType::Str.encode("banana", 8).unwrap();
        h.insert(&banana, rid(3)).unwrap();
        h.insert(&apple, rid(1)).unwrap();
        h.insert(&apple, rid(2)).unwrap();

        assert_eq!(h.search_all(&apple).unwrap().len(), 2);
        let (keys, _) = h.iter_leaves().unwrap();
        assert_eq!(KeyType::Str.render(&keys[0]), "apple");
        assert_eq!(KeyType::Str.render(&keys[2]), "banana");
    }

    #[test]
    fn test_debug_dump_mentions_every_level() {
        let (_f, mut h) = setup(4);
        for v in 1..=7 {
            h.insert(&k(v), rid(v)).unwrap();
        }
        let dump = h.debug(h.header.root_node).unwrap();
        assert!(dump.contains("node page="));
        assert!(dump.contains("leaf page="));
        assert!(dump.contains("-> rid("));
    }
}
