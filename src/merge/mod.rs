//! Merge/Diff Engine
//!
//! Line diffs between two versions of a text file and a policy-driven merge that reduces
//! the diff back to bytes. The `current` side is the local working copy, `incoming` the
//! side being merged in.

pub mod blocks;
pub mod eol;
pub mod resolver;

pub use blocks::{diff_sequences, MergeBlock};
pub use eol::{detect_eol, is_binary, Eol};
pub use resolver::{ConflictChoice, ConflictResolver, FixedResolver, ScriptedResolver};

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How a granularity (file, line or character) resolves differing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeOperation {
    /// Keep additions of both sides, drop nothing
    Insert,
    /// Apply deletions only
    Remove,
    /// Replicate the incoming side
    #[default]
    Both,
    /// Prompt on true conflicts
    Ask,
}

/// Policy for one merge call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub line: MergeOperation,
    pub char: MergeOperation,
    /// Use incoming line endings instead of keeping the local ones
    pub eol: bool,
}

/// How a text file differs from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextDiff {
    /// Byte-identical
    Identical,
    /// Same lines, different terminators
    LineEndingsOnly,
    Changed(Vec<MergeBlock>),
}

fn owned_lines(text: &str, eol: Option<Eol>) -> Vec<String> {
    eol::split_lines(text, eol)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Line blocks transforming `old` into `new`. Both sides must be UTF-8.
pub fn diff_blocks(old: &[u8], new: &[u8]) -> Result<Vec<MergeBlock>, ApiError> {
    let old = eol::decode(old)?;
    let new = eol::decode(new)?;
    Ok(diff_sequences(
        &owned_lines(old, detect_eol(old)),
        &owned_lines(new, detect_eol(new)),
    ))
}

/// Classify the difference between two versions of a text file.
pub fn diff_text(old: &[u8], new: &[u8]) -> Result<TextDiff, ApiError> {
    if old == new {
        return Ok(TextDiff::Identical);
    }
    let blocks = diff_blocks(old, new)?;
    if blocks.iter().all(MergeBlock::is_keep) {
        return Ok(TextDiff::LineEndingsOnly);
    }
    Ok(TextDiff::Changed(blocks))
}

/// Merge `incoming` into `current` under `options`.
///
/// With `MergeOperation::Both` the result is `incoming` (in the chosen line endings).
pub fn merge(
    incoming: &[u8],
    current: &[u8],
    options: &MergeOptions,
    resolver: &mut dyn ConflictResolver,
) -> Result<Vec<u8>, ApiError> {
    let incoming = eol::decode(incoming)?;
    let current = eol::decode(current)?;
    let incoming_eol = detect_eol(incoming);
    let current_eol = detect_eol(current);
    if let (Some(mine), Some(theirs)) = (current_eol, incoming_eol) {
        if mine != theirs {
            warn!(
                "Differing line endings ({:?} locally, {:?} incoming); keeping {}",
                mine,
                theirs,
                if options.eol { "incoming" } else { "local" }
            );
        }
    }
    let eol = if options.eol {
        incoming_eol.or(current_eol)
    } else {
        current_eol.or(incoming_eol)
    }
    .unwrap_or(Eol::Lf);

    let blocks = diff_sequences(
        &owned_lines(current, current_eol),
        &owned_lines(incoming, incoming_eol),
    );
    let mut output: Vec<String> = Vec::new();
    for block in blocks {
        match block {
            MergeBlock::Keep { lines, .. } => output.extend(lines),
            MergeBlock::Insert { lines, .. } => {
                if options.line != MergeOperation::Remove {
                    output.extend(lines);
                }
            }
            MergeBlock::Remove { lines, .. } => {
                if options.line == MergeOperation::Insert {
                    output.extend(lines);
                }
            }
            MergeBlock::Replace {
                line,
                replaced,
                replacement,
            } => match options.line {
                MergeOperation::Insert => {
                    output.extend(replacement);
                    output.extend(replaced);
                }
                MergeOperation::Remove => {}
                MergeOperation::Both => output.extend(replacement),
                MergeOperation::Ask => {
                    let choice = resolver.resolve_lines(line, &replaced, &replacement)?;
                    debug!(line, ?choice, "line conflict resolved");
                    match choice {
                        ConflictChoice::Mine => output.extend(replaced),
                        ConflictChoice::Theirs => output.extend(replacement),
                        ConflictChoice::Both => {
                            output.extend(replacement);
                            output.extend(replaced);
                        }
                        ConflictChoice::Descend => output.push(merge_chars(
                            &replaced.join(eol.as_str()),
                            &replacement.join(eol.as_str()),
                            options.char,
                            resolver,
                        )?),
                    }
                }
            },
        }
    }
    Ok(output.join(eol.as_str()).into_bytes())
}

/// Character-level merge of one conflicting region.
pub fn merge_chars(
    current: &str,
    incoming: &str,
    operation: MergeOperation,
    resolver: &mut dyn ConflictResolver,
) -> Result<String, ApiError> {
    let mine: Vec<char> = current.chars().collect();
    let theirs: Vec<char> = incoming.chars().collect();
    let mut output = String::with_capacity(current.len().max(incoming.len()));
    for block in diff_sequences(&mine, &theirs) {
        match block {
            MergeBlock::Keep { lines, .. } => output.extend(lines),
            MergeBlock::Insert { lines, .. } => {
                if operation != MergeOperation::Remove {
                    output.extend(lines);
                }
            }
            MergeBlock::Remove { lines, .. } => {
                if operation == MergeOperation::Insert {
                    output.extend(lines);
                }
            }
            MergeBlock::Replace {
                replaced,
                replacement,
                ..
            } => {
                let choice = match operation {
                    MergeOperation::Insert => ConflictChoice::Both,
                    MergeOperation::Remove => continue,
                    MergeOperation::Both => ConflictChoice::Theirs,
                    MergeOperation::Ask => {
                        let mine: String = replaced.iter().collect();
                        let theirs: String = replacement.iter().collect();
                        resolver.resolve_chars(&mine, &theirs)?
                    }
                };
                match choice {
                    ConflictChoice::Mine => output.extend(replaced),
                    ConflictChoice::Theirs => output.extend(replacement),
                    ConflictChoice::Both | ConflictChoice::Descend => {
                        output.extend(replacement);
                        output.extend(replaced);
                    }
                }
            }
        }
    }
    Ok(output)
}
