//! # Classifier
//! Keyword table that assigns an event label to a headline.
//!
//! Rules are checked in table order and the first rule with a keyword
//! contained in the lower-cased title wins. Titles matching nothing get the
//! fallback label.

use serde::{Deserialize, Serialize};

pub const DEAL_EVENT: &str = "Deal Event";
pub const ADVISOR_UPDATE: &str = "Advisor Update";
pub const TECH_NEWS: &str = "Tech News";
pub const OTHER: &str = "Other";

/// One row of the keyword table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
    fallback: String,
}

/// Deal keywords are checked before advisor keywords, which are checked
/// before tech keywords.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            DEAL_EVENT,
            &["deal", "funding", "investment", "merger", "acquisition"],
        ),
        CategoryRule::new(ADVISOR_UPDATE, &["advisor", "consultant", "partner", "joined"]),
        CategoryRule::new(TECH_NEWS, &["tech", "ai", "software"]),
    ]
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules(), OTHER)
    }
}

impl Classifier {
    /// Keywords are lower-cased and blank ones dropped; an empty fallback
    /// label is replaced by [`OTHER`].
    pub fn new(rules: Vec<CategoryRule>, fallback: &str) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule {
                label: r.label,
                keywords: r
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        let fallback = match fallback.trim() {
            "" => OTHER.to_string(),
            f => f.to_string(),
        };
        Self { rules, fallback }
    }

    pub fn classify(&self, title: &str) -> &str {
        let lower = title.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|r| r.label.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}
