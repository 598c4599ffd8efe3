use thiserror::Error;

/// Fatal faults: internal state inconsistencies and unusable on-disk
/// metadata. Distinct from the boolean "not found / not placed" outcomes
/// of the tree operations, which are not errors.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("page {child} is not registered as a child of node {parent}")]
    ChildNotFound { child: i32, parent: i32 },

    #[error("unknown key type tag {0} in index header")]
    UnknownKeyType(i32),

    #[error("node layout of {needed} bytes exceeds the {page_size}-byte page")]
    LayoutTooLarge { needed: usize, page_size: usize },

    #[error("key is {got} bytes, index stores {expected}-byte keys")]
    KeyWidthMismatch { expected: usize, got: usize },
}
