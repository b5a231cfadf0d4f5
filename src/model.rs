use std::fmt;

use serde::Serialize;

/// Durable identity of a law: the document it came from and the 1-based line
/// of its bullet. Nothing else is used to deduplicate laws across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceKey {
    pub file_path: String,
    pub line_number: u32,
}

impl SourceKey {
    pub fn new(file_path: impl Into<String>, line_number: u32) -> Self {
        SourceKey {
            file_path: file_path.into(),
            line_number,
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_path, self.line_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Email,
    Url,
    Text,
}

impl ContactType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactType::Email => "email",
            ContactType::Url => "url",
            ContactType::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    CorollaryOf,
    CommentOn,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::CorollaryOf => "COROLLARY_OF",
            RelationType::CommentOn => "COMMENT_ON",
        }
    }
}

// ── Relational rows ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub slug: String,
    pub title: String,
    pub source_file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Law {
    pub key: SourceKey,
    pub title: Option<String>,
    pub text: String,
    pub raw_markdown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LawCategory {
    pub law: SourceKey,
    pub category_slug: String,
    pub position: u32,
}

/// An attribution before it is bound to a law.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionDraft {
    pub name: String,
    pub contact_type: ContactType,
    pub contact_value: String,
    pub note: Option<String>,
    pub source_fragment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub law: SourceKey,
    #[serde(flatten)]
    pub draft: AttributionDraft,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LawRelation {
    pub from: SourceKey,
    pub to: SourceKey,
    pub relation_type: RelationType,
    pub note: Option<String>,
}

/// One conflict-tolerant operation against the destination, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Record {
    UpsertCategory(Category),
    InsertLaw(Law),
    LinkCategory(LawCategory),
    AddAttribution(Attribution),
    RelateLaws(LawRelation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_key_display() {
        let key = SourceKey::new("murphys-laws/tech.md", 12);
        assert_eq!(key.to_string(), "murphys-laws/tech.md:12");
    }

    #[test]
    fn record_json_tagging() {
        let rec = Record::RelateLaws(LawRelation {
            from: SourceKey::new("a.md", 4),
            to: SourceKey::new("a.md", 3),
            relation_type: RelationType::CorollaryOf,
            note: None,
        });
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["op"], "relate_laws");
        assert_eq!(json["relation_type"], "COROLLARY_OF");
        assert_eq!(json["from"]["line_number"], 4);
    }

    #[test]
    fn attribution_json_is_flat() {
        let rec = Record::AddAttribution(Attribution {
            law: SourceKey::new("a.md", 1),
            draft: AttributionDraft {
                name: "Jane Doe".into(),
                contact_type: ContactType::Email,
                contact_value: "jane@example.com".into(),
                note: None,
                source_fragment: "[Jane Doe](mailto:jane@example.com)".into(),
            },
        });
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["contact_type"], "email");
        assert_eq!(json["name"], "Jane Doe");
    }
}
