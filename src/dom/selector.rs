//! CSS selectors used by alias and rule lines, matched with `scraper`

use std::fmt;

use scraper::ElementRef;
use thiserror::Error;

use super::{Document, NodeId};

/// Errors produced when a selector cannot be parsed
#[derive(Debug, Error, PartialEq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("invalid selector '{selector}': {reason}")]
    Invalid { selector: String, reason: String },
}

/// A parsed selector list, remembering the text it came from
#[derive(Clone)]
pub struct Selector {
    source: String,
    inner: scraper::Selector,
}

impl Selector {
    /// Parse selector text
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(SelectorError::Empty);
        }
        let inner = scraper::Selector::parse(source).map_err(|err| SelectorError::Invalid {
            selector: source.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            inner,
        })
    }

    /// The trimmed text this selector was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the element `id` matches this selector
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        doc.html()
            .tree
            .get(id)
            .and_then(ElementRef::wrap)
            .is_some_and(|el| self.inner.matches(&el))
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.source).finish()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
