pub mod header;
pub mod key;
pub mod node;
pub mod tree;

pub use header::IndexHeader;
pub use key::KeyType;
pub use node::Node;
pub use tree::IndexHandle;

/// Record identifier: names a tuple in the underlying record file.
/// Internal tree nodes reuse the pair as `(child_page_id, -1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page: i32,
    pub slot: i32,
}

impl Rid {
    pub fn new(page: i32, slot: i32) -> Self {
        Self { page, slot }
    }

    pub fn matches(&self, page: i32, slot: i32) -> bool {
        self.page == page && self.slot == slot
    }
}
