//! Pattern matching for derived access grants
//!
//! Approval titles are free text, so grant rules match them with
//! case-insensitive regular expressions.

use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};

/// Compiled, case-insensitive pattern set
#[derive(Debug)]
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| CompiledPattern {
                        source: pattern.clone(),
                        regex,
                    })
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Matcher with no patterns; matches nothing
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }

    /// First pattern matching `text`, by source
    pub fn find_match(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(text))
            .map(|p| p.source.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::empty()
    }
}
