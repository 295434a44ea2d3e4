//! Glob patterns over class names
//!
//! Exclusions are written against compiled-class paths (`com/acme/config/AppConfig`)
//! while rule scopes are written against qualified names (`com.acme.**.service.*`).
//! Both compile to the same matcher, parameterised by the segment separator:
//!
//! - `*` matches any run of characters inside one segment
//! - `?` matches exactly one character inside one segment
//! - `**` matches any number of whole segments, including none

use regex::Regex;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Empty pattern")]
    Empty,

    #[error("Invalid pattern '{pattern}': {message}")]
    Invalid { pattern: String, message: String },
}

/// Separator between name segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `com/acme/Foo`
    Slash,
    /// `com.acme.Foo`
    Dot,
}

impl Separator {
    fn as_char(self) -> char {
        match self {
            Separator::Slash => '/',
            Separator::Dot => '.',
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassPattern {
    raw: String,
    regex: Regex,
}

impl ClassPattern {
    /// Pattern matched against `/`-separated compiled-class paths.
    pub fn path(raw: &str) -> Result<Self, PatternError> {
        Self::compile(raw, Separator::Slash)
    }

    /// Pattern matched against `.`-separated qualified class names.
    pub fn qualified(raw: &str) -> Result<Self, PatternError> {
        Self::compile(raw, Separator::Dot)
    }

    pub fn compile(raw: &str, separator: Separator) -> Result<Self, PatternError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }

        let source = translate(trimmed, separator.as_char());
        let regex = Regex::new(&source).map_err(|e| PatternError::Invalid {
            pattern: trimmed.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            raw: trimmed.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl fmt::Display for ClassPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compiles every pattern, failing on the first invalid one.
pub fn compile_all(patterns: &[String], separator: Separator) -> Result<Vec<ClassPattern>, PatternError> {
    patterns
        .iter()
        .map(|p| ClassPattern::compile(p, separator))
        .collect()
}

pub fn matches_any(patterns: &[ClassPattern], name: &str) -> bool {
    patterns.iter().any(|p| p.matches(name))
}

fn translate(glob: &str, sep: char) -> String {
    let sep_re = regex::escape(&sep.to_string());
    let segment = format!("[^{}]", sep_re);
    let chars: Vec<char> = glob.chars().collect();

    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '*' && chars.get(i + 1) == Some(&'*') {
            let at_segment_start = i == 0 || chars[i - 1] == sep;
            let next = chars.get(i + 2).copied();
            if at_segment_start && next == Some(sep) {
                // `**/` : zero or more leading segments
                out.push_str(&format!("(?:.*{})?", sep_re));
                i += 3;
            } else {
                out.push_str(".*");
                i += 2;
            }
            continue;
        }

        match c {
            '*' => {
                out.push_str(&segment);
                out.push('*');
            }
            '?' => out.push_str(&segment),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}
