//! Keyword category tagger: ordered `(category, patterns)` rules, first match
//! wins, with a fallback category.

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub icon: String,
}

impl Category {
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tagger {
    rules: Vec<(Category, Vec<Regex>)>,
    fallback: Category,
}

impl Tagger {
    pub fn new(rules: Vec<(Category, Vec<Regex>)>, fallback: Category) -> Self {
        Self { rules, fallback }
    }

    pub fn tag(&self, text: &str) -> &Category {
        self.rules
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
            .map(|(cat, _)| cat)
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &Category {
        &self.fallback
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|(c, _)| c.name.as_str())
    }
}
