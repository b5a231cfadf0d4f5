use std::sync::LazyLock;

use regex::Regex;

use super::title::split_at_colon;
use crate::model::RelationType;

static COROLLARY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Za-z][^:]{0,60})?\s*corollary\s*:").unwrap());
static COROLLARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)corollary").unwrap());

/// Decide how a sub-bullet relates to its parent. Anything that does not
/// open with "<label> Corollary:" is a comment.
pub fn classify_relation(clean_text: &str) -> (RelationType, Option<String>) {
    if !COROLLARY_LABEL_RE.is_match(clean_text) {
        return (RelationType::CommentOn, None);
    }
    let note = split_at_colon(clean_text)
        .map(|(label, _)| label)
        .filter(|label| COROLLARY_RE.is_match(label))
        .map(str::to_string);
    (RelationType::CorollaryOf, note)
}
