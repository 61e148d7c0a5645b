//! Diff blocks over lines or characters

use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::hash::Hash;

/// One contiguous region of a diff from `old` to `new`.
///
/// `line` is the offset into the old sequence where the block starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeBlock<T = String> {
    Keep { line: usize, lines: Vec<T> },
    /// Present only in `new`
    Insert { line: usize, lines: Vec<T> },
    /// Present only in `old`
    Remove { line: usize, lines: Vec<T> },
    /// `replaced` from `old` stands where `new` has `replacement`
    Replace {
        line: usize,
        replaced: Vec<T>,
        replacement: Vec<T>,
    },
}

impl<T> MergeBlock<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, MergeBlock::Keep { .. })
    }
}

/// Myers diff of two sequences, adjacent remove/insert runs coalesced into `Replace`.
pub fn diff_sequences<T>(old: &[T], new: &[T]) -> Vec<MergeBlock<T>>
where
    T: Clone + Eq + Hash + Ord,
{
    let mut blocks: Vec<MergeBlock<T>> = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, old, new) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let line = old_range.start;
        let block = match tag {
            DiffTag::Equal => MergeBlock::Keep {
                line,
                lines: old[old_range].to_vec(),
            },
            DiffTag::Delete => MergeBlock::Remove {
                line,
                lines: old[old_range].to_vec(),
            },
            DiffTag::Insert => MergeBlock::Insert {
                line,
                lines: new[new_range].to_vec(),
            },
            DiffTag::Replace => MergeBlock::Replace {
                line,
                replaced: old[old_range].to_vec(),
                replacement: new[new_range].to_vec(),
            },
        };
        push_coalescing(&mut blocks, block);
    }
    blocks
}

// Join a removal directly followed by an insertion (either order) into one replacement.
fn push_coalescing<T>(blocks: &mut Vec<MergeBlock<T>>, block: MergeBlock<T>) {
    let block = match (blocks.pop(), block) {
        (Some(MergeBlock::Remove { line, lines: replaced }), MergeBlock::Insert { lines, .. })
        | (Some(MergeBlock::Insert { line, lines }), MergeBlock::Remove { lines: replaced, .. }) => {
            MergeBlock::Replace {
                line,
                replaced,
                replacement: lines,
            }
        }
        (previous, block) => {
            blocks.extend(previous);
            block
        }
    };
    blocks.push(block);
}
