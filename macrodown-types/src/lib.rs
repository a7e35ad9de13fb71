//! Shared types for macrodown
//!
//! This crate provides the common value types used across the macrodown
//! ecosystem: source spans and located macro calls.

use serde::{Deserialize, Serialize};

/// Half-open byte span `[start, end)` over a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `other` shares at least one byte with this span.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A single macro call located in source text.
///
/// Transient: created by the locator per match and consumed immediately by
/// the dispatcher. `raw_arg` is the argument substring exactly as written,
/// quotes and all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroCall {
    pub name: String,
    pub raw_arg: String,
    pub span: Span,
}

impl MacroCall {
    pub fn new(name: impl Into<String>, raw_arg: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            raw_arg: raw_arg.into(),
            span,
        }
    }
}
