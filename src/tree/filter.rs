//! Glob patterns for ignore rules and tracking scopes

use crate::config::SosConfig;
use crate::error::ApiError;
use regex::Regex;

/// A compiled glob.
///
/// `*` matches within one path segment, `**` across segments, `?` one character,
/// `[...]` / `[!...]` a character class.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
    wildcards: Vec<Wildcard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wildcard {
    Star,
    DoubleStar,
    Single,
    Class,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, ApiError> {
        let (body, wildcards) = translate(pattern)?;
        let regex = Regex::new(&format!("^{}$", body))
            .map_err(|e| ApiError::UsageError(format!("Invalid pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            wildcards,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// Text matched by each wildcard, in order, if `candidate` matches.
    pub fn captures(&self, candidate: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(candidate)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }

    /// Substitute captured wildcard text into this pattern's wildcards.
    ///
    /// Both patterns must use the same wildcard sequence.
    pub fn substitute(&self, source: &GlobPattern, captured: &[String]) -> Result<String, ApiError> {
        if self.wildcards != source.wildcards {
            return Err(ApiError::UsageError(format!(
                "Patterns '{}' and '{}' use different wildcards",
                source.as_str(),
                self.as_str()
            )));
        }
        let mut out = String::new();
        let mut values = captured.iter();
        let mut chars = self.source.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                    }
                    out.push_str(values.next().map(String::as_str).unwrap_or(""));
                }
                '?' => out.push_str(values.next().map(String::as_str).unwrap_or("")),
                '[' => {
                    for inner in chars.by_ref() {
                        if inner == ']' {
                            break;
                        }
                    }
                    out.push_str(values.next().map(String::as_str).unwrap_or(""));
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

fn translate(pattern: &str) -> Result<(String, Vec<Wildcard>), ApiError> {
    let mut body = String::new();
    let mut wildcards = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    body.push_str("(.*)");
                    wildcards.push(Wildcard::DoubleStar);
                } else {
                    body.push_str("([^/]*)");
                    wildcards.push(Wildcard::Star);
                }
            }
            '?' => {
                body.push_str("([^/])");
                wildcards.push(Wildcard::Single);
            }
            '[' => {
                let mut class = String::from("([");
                let mut closed = false;
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '\\' || inner == '[' {
                        class.push('\\');
                    }
                    class.push(inner);
                }
                if !closed {
                    return Err(ApiError::UsageError(format!(
                        "Unterminated character class in pattern '{}'",
                        pattern
                    )));
                }
                class.push_str("])");
                body.push_str(&class);
                wildcards.push(Wildcard::Class);
            }
            other => body.push_str(&regex::escape(&other.to_string())),
        }
    }
    Ok((body, wildcards))
}

/// Compile a list of glob strings.
pub fn compile_all(patterns: &[String]) -> Result<Vec<GlobPattern>, ApiError> {
    patterns.iter().map(|p| GlobPattern::new(p)).collect()
}

fn any_match(patterns: &[GlobPattern], candidate: &str) -> bool {
    patterns.iter().any(|p| p.matches(candidate))
}

/// Name-level ignore rules for files and directories.
#[derive(Debug, Clone, Default)]
pub struct PathFilters {
    ignores: Vec<GlobPattern>,
    ignores_whitelist: Vec<GlobPattern>,
    ignore_dirs: Vec<GlobPattern>,
    ignore_dirs_whitelist: Vec<GlobPattern>,
}

impl PathFilters {
    pub fn from_config(config: &SosConfig) -> Result<Self, ApiError> {
        Ok(Self {
            ignores: compile_all(&config.ignores)?,
            ignores_whitelist: compile_all(&config.ignores_whitelist)?,
            ignore_dirs: compile_all(&config.ignore_dirs)?,
            ignore_dirs_whitelist: compile_all(&config.ignore_dirs_whitelist)?,
        })
    }

    pub fn is_ignored_file(&self, name: &str) -> bool {
        any_match(&self.ignores, name) && !any_match(&self.ignores_whitelist, name)
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        any_match(&self.ignore_dirs, name) && !any_match(&self.ignore_dirs_whitelist, name)
    }

    /// Whether a relative key is excluded by its file name or any ancestor directory.
    pub fn is_ignored_key(&self, key: &str) -> bool {
        self.is_ignored_file(crate::tree::path::file_name(key))
            || crate::tree::path::parent_dirs(key).any(|dir| self.is_ignored_dir(dir))
    }
}

/// Tracking-mode restriction on relative paths.
///
/// `consider_only = None` means every non-ignored path is in scope.
#[derive(Debug, Clone, Default)]
pub struct TrackingScope {
    consider_only: Option<Vec<GlobPattern>>,
}

impl TrackingScope {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn only(patterns: &[String]) -> Result<Self, ApiError> {
        Ok(Self {
            consider_only: Some(compile_all(patterns)?),
        })
    }

    pub fn includes(&self, key: &str) -> bool {
        match &self.consider_only {
            Some(patterns) => any_match(patterns, key),
            None => true,
        }
    }
}
