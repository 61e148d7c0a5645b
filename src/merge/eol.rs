//! Line endings, text decoding and binary classification

use crate::error::ApiError;
use crate::tree::filter::GlobPattern;

/// Bytes inspected for NUL when classifying content
const SNIFF_LEN: usize = 8 * 1024;

/// Line terminator convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    CrLf,
    Cr,
}

impl Eol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::CrLf => "\r\n",
            Eol::Cr => "\r",
        }
    }
}

/// Dominant line terminator of a text, if it has any line break.
pub fn detect_eol(text: &str) -> Option<Eol> {
    let crlf = text.matches("\r\n").count();
    let lf = text.matches('\n').count() - crlf;
    let cr = text.matches('\r').count() - crlf;
    if crlf == 0 && lf == 0 && cr == 0 {
        return None;
    }
    if crlf >= lf && crlf >= cr {
        Some(Eol::CrLf)
    } else if lf >= cr {
        Some(Eol::Lf)
    } else {
        Some(Eol::Cr)
    }
}

/// Split into lines without terminators. A trailing terminator yields a final empty line.
pub fn split_lines(text: &str, eol: Option<Eol>) -> Vec<&str> {
    match eol {
        Some(eol) => text.split(eol.as_str()).collect(),
        None => vec![text],
    }
}

pub fn decode(bytes: &[u8]) -> Result<&str, ApiError> {
    std::str::from_utf8(bytes).map_err(|_| {
        ApiError::MergeConflict("content is not valid UTF-8 text and cannot be merged".to_string())
    })
}

/// Name-based overrides first, then content sniffing.
pub fn is_binary(
    name: &str,
    content: &[u8],
    texttype: &[GlobPattern],
    bintype: &[GlobPattern],
) -> bool {
    if bintype.iter().any(|p| p.matches(name)) {
        return true;
    }
    if texttype.iter().any(|p| p.matches(name)) {
        return false;
    }
    let head = &content[..content.len().min(SNIFF_LEN)];
    head.contains(&0) || std::str::from_utf8(content).is_err()
}
