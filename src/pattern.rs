//! Pattern escaping forms and the resolved analysis handed to the strategist.
//!
//! Patterns crossing the oracle boundary use the transport form, where every
//! regex backslash is doubled (`\\d{3}`). The regex engine takes the native
//! form (`\d{3}`). Oracle replies may mix both forms, so a backslash run of
//! odd length is read as a single escape and an even run as a doubled one.

use std::borrow::Cow;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// Compiled program size cap for patterns that come from outside the crate.
const COMPILED_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSource {
    /// Oracle columns and pattern passed validation.
    Oracle,
    /// Oracle columns kept, pattern replaced by the deterministic one.
    Repaired,
    /// Columns and pattern both come from the fallback engine.
    Fallback,
}

impl PatternSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternSource::Oracle => "oracle",
            PatternSource::Repaired => "repaired",
            PatternSource::Fallback => "fallback",
        }
    }
}

/// Validated target columns plus a pattern that is known to compile.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub target_columns: Vec<String>,
    pub pattern: Regex,
    pub explanation: String,
    pub source: PatternSource,
}

impl Analysis {
    /// Engine-native pattern text.
    pub fn pattern_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// True when some backslash run has odd length, which only happens in native form.
pub fn has_single_escapes(pattern: &str) -> bool {
    let mut run = 0usize;
    for ch in pattern.chars() {
        if ch == '\\' {
            run += 1;
        } else {
            if run % 2 == 1 {
                return true;
            }
            run = 0;
        }
    }
    run % 2 == 1
}

/// Collapses each doubled backslash into one. A dangling odd backslash is kept.
pub fn to_native(transport: &str) -> String {
    let mut native = String::with_capacity(transport.len());
    let mut chars = transport.chars().peekable();
    while let Some(ch) = chars.next() {
        native.push(ch);
        if ch == '\\' && chars.peek() == Some(&'\\') {
            chars.next();
        }
    }
    native
}

/// Brings an oracle pattern into transport form. Each odd backslash run gains
/// one backslash; even runs are already doubled and stay as they are.
pub fn normalize_transport(pattern: &str) -> Cow<'_, str> {
    if !has_single_escapes(pattern) {
        return Cow::Borrowed(pattern);
    }
    let mut transport = String::with_capacity(pattern.len() * 2);
    let mut run = 0usize;
    for ch in pattern.chars() {
        if ch == '\\' {
            run += 1;
        } else {
            if run % 2 == 1 {
                transport.push('\\');
            }
            run = 0;
        }
        transport.push(ch);
    }
    if run % 2 == 1 {
        transport.push('\\');
    }
    Cow::Owned(transport)
}

/// Alternation branches of a native pattern: unescaped `|` count plus one.
pub fn branch_count(pattern: &str) -> usize {
    let mut escaped = false;
    let mut pipes = 0usize;
    for ch in pattern.chars() {
        if ch == '\\' {
            escaped = !escaped;
            continue;
        }
        if ch == '|' && !escaped {
            pipes += 1;
        }
        escaped = false;
    }
    pipes + 1
}

pub fn compile(native: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(native)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
}
