use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Normalized set of language tags, e.g. `en` or `en+ja`.
///
/// Tags are lower-cased, sorted and deduplicated, so two sets naming the
/// same languages in any order compare equal.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LanguageSet {
    tags: Vec<String>,
}

impl LanguageSet {
    pub fn new<I, S>(tags: I) -> LanguageSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_ascii_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        LanguageSet { tags }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == &tag.to_ascii_lowercase())
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tags.join("+"))
    }
}

impl FromStr for LanguageSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<LanguageSet, Self::Err> {
        Ok(LanguageSet::new(s.split('+')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_order_and_case() {
        let a: LanguageSet = "ja+EN".parse().unwrap();
        let b = LanguageSet::new(["en", "ja", "en"]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "en+ja");
        assert!(a.contains("JA"));
        assert!(!a.contains("fr"));
    }
}
