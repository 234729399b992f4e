use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{Change, DiffError, Direction};

/// A diff supplied either as one text or as already-split lines
///
/// Both forms parse to the same result; lines are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiffInput {
    Text(String),
    Lines(Vec<String>),
}

impl Default for DiffInput {
    fn default() -> Self {
        DiffInput::Text(String::new())
    }
}

impl DiffInput {
    /// Convert a JSON value into a diff input.
    ///
    /// `null` is treated as an empty diff. Anything other than a string or
    /// an array of strings is rejected.
    pub fn from_json(value: &Value) -> Result<Self, DiffError> {
        match value {
            Value::Null => Ok(DiffInput::default()),
            Value::String(s) => Ok(DiffInput::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(DiffError::InvalidLine {
                        index,
                        found: json_kind(other).to_string(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(DiffInput::Lines),
            other => Err(DiffError::InvalidInput(json_kind(other).to_string())),
        }
    }

    /// The diff as a single text
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            DiffInput::Text(s) => Cow::Borrowed(s.as_str()),
            DiffInput::Lines(lines) => Cow::Owned(lines.join("\n")),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DiffInput::Text(s) => s.trim().is_empty(),
            DiffInput::Lines(lines) => lines.iter().all(|l| l.trim().is_empty()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<String> for DiffInput {
    fn from(s: String) -> Self {
        DiffInput::Text(s)
    }
}

impl From<&str> for DiffInput {
    fn from(s: &str) -> Self {
        DiffInput::Text(s.to_string())
    }
}

impl From<&String> for DiffInput {
    fn from(s: &String) -> Self {
        DiffInput::Text(s.clone())
    }
}

impl From<Option<&str>> for DiffInput {
    fn from(s: Option<&str>) -> Self {
        s.map(DiffInput::from).unwrap_or_default()
    }
}

impl From<Vec<String>> for DiffInput {
    fn from(lines: Vec<String>) -> Self {
        DiffInput::Lines(lines)
    }
}

impl From<Vec<&str>> for DiffInput {
    fn from(lines: Vec<&str>) -> Self {
        DiffInput::Lines(lines.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for DiffInput {
    fn from(lines: &[&str]) -> Self {
        DiffInput::Lines(lines.iter().map(|l| l.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DiffInput {
    fn from(lines: [&str; N]) -> Self {
        DiffInput::Lines(lines.iter().map(|l| l.to_string()).collect())
    }
}

impl From<&DiffInput> for DiffInput {
    fn from(input: &DiffInput) -> Self {
        input.clone()
    }
}

/// The changes extracted from one diff, in the order they appear
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedDiff {
    changes: Vec<Change>,
}

impl ParsedDiff {
    pub fn from_text(text: &str) -> Self {
        let changes: Vec<Change> = text.lines().filter_map(parse_line).collect();
        let parsed = Self { changes };

        debug!(
            added = parsed.added(),
            removed = parsed.removed(),
            "Parsed diff"
        );

        parsed
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of added lines (duplicates included)
    pub fn added(&self) -> usize {
        self.changes.iter().filter(|c| c.is_added()).count()
    }

    /// Number of removed lines (duplicates included)
    pub fn removed(&self) -> usize {
        self.changes.len() - self.added()
    }

    /// Changes with repeats removed, keeping first occurrences in order
    pub fn unique(&self) -> Vec<&Change> {
        let mut seen = HashSet::new();
        self.changes.iter().filter(|c| seen.insert(*c)).collect()
    }

    pub fn as_set(&self) -> HashSet<&Change> {
        self.changes.iter().collect()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

impl<'a> IntoIterator for &'a ParsedDiff {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Parse a unified diff (text or lines) into its added and removed lines.
///
/// File headers (`+++`, `---`), hunk headers and context lines are dropped.
/// Never fails: text that is not a diff yields an empty result.
pub fn parse(input: impl Into<DiffInput>) -> ParsedDiff {
    let input = input.into();
    ParsedDiff::from_text(&input.text())
}

fn parse_line(line: &str) -> Option<Change> {
    if line.starts_with("+++") || line.starts_with("---") {
        return None;
    }

    let mut chars = line.chars();
    let direction = Direction::from_marker(chars.next()?)?;
    Some(Change::new(direction, chars.as_str().trim_end()))
}

/// Normalize a diff to the text used for identity checks and cache keys.
///
/// Trailing whitespace is stripped from every line and leading/trailing
/// blank lines are dropped.
pub fn normalize_text(input: &DiffInput) -> String {
    let text = input.text();
    let joined = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    joined.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OBO_DIFF: &str = r#"diff --git a/src/ontology/go-edit.obo b/src/ontology/go-edit.obo
index 1a2b3c4..5d6e7f8 100644
--- a/src/ontology/go-edit.obo
+++ b/src/ontology/go-edit.obo
@@ -10,6 +10,11 @@ ontology: go
 [Term]
 id: GO:0000001
-name: mitochondrion inheritance
+name: mitochondrial inheritance
+
+[Term]
+id: GO:0099999
+is_a: GO:0000001 ! mitochondrial inheritance
"#;

    #[test]
    fn test_parse_unified_diff() {
        let parsed = parse(OBO_DIFF);

        assert_eq!(
            parsed.changes(),
            &[
                Change::removed("name: mitochondrion inheritance"),
                Change::added("name: mitochondrial inheritance"),
                Change::added(""),
                Change::added("[Term]"),
                Change::added("id: GO:0099999"),
                Change::added("is_a: GO:0000001 ! mitochondrial inheritance"),
            ]
        );
        assert_eq!(parsed.added(), 5);
        assert_eq!(parsed.removed(), 1);
    }

    #[test]
    fn test_headers_and_context_dropped() {
        let parsed = parse("--- a/x\n+++ b/x\n@@ -1 +1 @@\n context\n");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_internal_whitespace_and_case_preserved() {
        let parsed = parse("+  Name:  Foo\t \r\n");
        assert_eq!(parsed.changes(), &[Change::added("  Name:  Foo")]);
    }

    #[test]
    fn test_empty_and_garbage_inputs() {
        assert!(parse("").is_empty());
        assert!(parse(None::<&str>).is_empty());
        assert!(parse("not a diff at all\nBinary files differ").is_empty());
    }

    #[test]
    fn test_lines_and_text_equivalent() {
        let from_lines = parse(["+a", "-b", " c"]);
        let from_text = parse("+a\n-b\n c\n");
        assert_eq!(from_lines, from_text);
    }

    #[test]
    fn test_unique_keeps_first_occurrence() {
        let parsed = parse("+a\n+b\n+a\n-a\n");
        let unique: Vec<_> = parsed.unique().into_iter().cloned().collect();
        assert_eq!(
            unique,
            vec![Change::added("a"), Change::added("b"), Change::removed("a")]
        );
    }

    #[test]
    fn test_from_json_accepts_string_array_and_null() {
        assert_eq!(
            DiffInput::from_json(&json!("+a")).unwrap(),
            DiffInput::Text("+a".into())
        );
        assert_eq!(
            DiffInput::from_json(&json!(["+a", "+b"])).unwrap(),
            DiffInput::Lines(vec!["+a".into(), "+b".into()])
        );
        assert!(DiffInput::from_json(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_from_json_rejects_other_types() {
        assert!(matches!(
            DiffInput::from_json(&json!(42)),
            Err(DiffError::InvalidInput(_))
        ));
        assert!(matches!(
            DiffInput::from_json(&json!({"diff": "+a"})),
            Err(DiffError::InvalidInput(_))
        ));
        assert!(matches!(
            DiffInput::from_json(&json!(["+a", 3])),
            Err(DiffError::InvalidLine { index: 1, .. })
        ));
    }

    #[test]
    fn test_normalize_text() {
        let input = DiffInput::from("\n+a  \n+b\t\n\n");
        assert_eq!(normalize_text(&input), "+a\n+b");

        let lines = DiffInput::from(vec!["+a", "+b"]);
        assert_eq!(normalize_text(&lines), "+a\n+b");
    }
}
