//! Conflict resolution seam for `Ask` merges

use crate::error::ApiError;
use std::collections::VecDeque;

/// Answer to a conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Keep the local side
    Mine,
    /// Take the incoming side
    Theirs,
    /// Keep incoming followed by local
    Both,
    /// Resolve at the next finer granularity
    Descend,
}

/// Decides true conflicts. The CLI prompts; tests script the answers.
pub trait ConflictResolver {
    fn resolve_lines(
        &mut self,
        line: usize,
        mine: &[String],
        theirs: &[String],
    ) -> Result<ConflictChoice, ApiError>;

    fn resolve_chars(&mut self, mine: &str, theirs: &str) -> Result<ConflictChoice, ApiError>;

    /// Whole-file choice for content that cannot be merged textually.
    fn resolve_binary(&mut self, path: &str) -> Result<ConflictChoice, ApiError>;
}

/// Always answers the same.
#[derive(Debug, Clone, Copy)]
pub struct FixedResolver(pub ConflictChoice);

impl ConflictResolver for FixedResolver {
    fn resolve_lines(
        &mut self,
        _line: usize,
        _mine: &[String],
        _theirs: &[String],
    ) -> Result<ConflictChoice, ApiError> {
        Ok(self.0)
    }

    fn resolve_chars(&mut self, _mine: &str, _theirs: &str) -> Result<ConflictChoice, ApiError> {
        Ok(self.0)
    }

    fn resolve_binary(&mut self, _path: &str) -> Result<ConflictChoice, ApiError> {
        Ok(self.0)
    }
}

/// Answers from a queue; fails once the queue is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    answers: VecDeque<ConflictChoice>,
    asked: usize,
}

impl ScriptedResolver {
    pub fn new(answers: impl IntoIterator<Item = ConflictChoice>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// Number of prompts answered so far
    pub fn asked(&self) -> usize {
        self.asked
    }

    fn next(&mut self) -> Result<ConflictChoice, ApiError> {
        self.asked += 1;
        self.answers
            .pop_front()
            .ok_or_else(|| ApiError::MergeConflict("no answer left for conflict".to_string()))
    }
}

impl ConflictResolver for ScriptedResolver {
    fn resolve_lines(
        &mut self,
        _line: usize,
        _mine: &[String],
        _theirs: &[String],
    ) -> Result<ConflictChoice, ApiError> {
        self.next()
    }

    fn resolve_chars(&mut self, _mine: &str, _theirs: &str) -> Result<ConflictChoice, ApiError> {
        self.next()
    }

    fn resolve_binary(&mut self, _path: &str) -> Result<ConflictChoice, ApiError> {
        self.next()
    }
}
