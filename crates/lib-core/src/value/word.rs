use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

use super::lang::LanguageSet;

/// Role a term plays in a full-text query.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum WordCategory {
    #[default]
    Undefined,
    Essential,
    Important,
    Helpful,
    Prohibitive,
}

/// Full-text search term with its selection attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub term: String,
    pub language: LanguageSet,
    pub category: WordCategory,
    pub scale: f64,
    pub document_frequency: u32,
}

impl Word {
    pub fn new(term: impl Into<String>) -> Word {
        Word {
            term: term.into(),
            language: LanguageSet::default(),
            category: WordCategory::default(),
            scale: 0.0,
            document_frequency: 0,
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.term)?;
        if !self.language.is_empty() {
            write!(f, " language '{}'", self.language)?;
        }
        Ok(())
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Word) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Word {}

impl PartialOrd for Word {
    fn partial_cmp(&self, other: &Word) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Word {
    fn cmp(&self, other: &Word) -> Ordering {
        self.term
            .cmp(&other.term)
            .then_with(|| self.language.cmp(&other.language))
    }
}

impl std::hash::Hash for Word {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.term.hash(state);
        self.language.hash(state);
    }
}
