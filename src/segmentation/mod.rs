//! Mask segmentation: connected components plus the split-pattern correction.

pub mod labeling;
pub mod patterns;
pub mod union_find;

pub use self::labeling::label;
pub use self::patterns::{count_split_patterns, find_split_patterns, PatternMatch};
pub use self::union_find::UnionFind;
