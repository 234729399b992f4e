use serde::{Deserialize, Serialize};

use crate::{Change, DiffError, Direction};

/// Which side(s) of a comparison a change belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Present in both diffs
    Common,
    /// Present only in the target diff
    TargetOnly,
    /// Present only in the predicted diff
    PredictedOnly,
}

impl Classification {
    /// Leading character of a metadiff line
    pub fn tag(&self) -> char {
        match self {
            Classification::Common => ' ',
            Classification::TargetOnly => '<',
            Classification::PredictedOnly => '>',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            ' ' => Some(Classification::Common),
            '<' => Some(Classification::TargetOnly),
            '>' => Some(Classification::PredictedOnly),
            _ => None,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Classification::Common => "metadiff-common",
            Classification::TargetOnly => "metadiff-target",
            Classification::PredictedOnly => "metadiff-predicted",
        }
    }

    fn inline_style(&self) -> &'static str {
        match self {
            Classification::Common => "color: #57606a;",
            Classification::TargetOnly => "color: #cf222e; background-color: #ffebe9;",
            Classification::PredictedOnly => "color: #1a7f37; background-color: #dafbe1;",
        }
    }
}

/// One line of the merged view of two diffs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadiffLine {
    pub classification: Classification,
    pub change: Change,
}

impl MetadiffLine {
    pub fn new(classification: Classification, change: Change) -> Self {
        Self {
            classification,
            change,
        }
    }

    /// Render as `<tag><marker><text>`, e.g. `"<+is_a: X"`
    pub fn render(&self) -> String {
        format!(
            "{}{}{}",
            self.classification.tag(),
            self.change.direction.marker(),
            self.change.text
        )
    }

    /// Recover the classification and change from a rendered line
    pub fn parse(line: &str) -> Result<Self, DiffError> {
        let mut chars = line.chars();

        let classification = chars
            .next()
            .and_then(Classification::from_tag)
            .ok_or_else(|| DiffError::InvalidMetadiffLine(line.to_string()))?;
        let direction = chars
            .next()
            .and_then(Direction::from_marker)
            .ok_or_else(|| DiffError::InvalidMetadiffLine(line.to_string()))?;

        Ok(Self::new(
            classification,
            Change::new(direction, chars.as_str()),
        ))
    }
}

impl std::fmt::Display for MetadiffLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Common changes first, then target-only, then predicted-only.
pub(crate) fn build_metadiff(
    common: &[Change],
    target_only: &[Change],
    predicted_only: &[Change],
) -> Vec<MetadiffLine> {
    let tagged = |classification: Classification, changes: &[Change]| {
        changes
            .iter()
            .map(move |c| MetadiffLine::new(classification, c.clone()))
            .collect::<Vec<_>>()
    };

    let mut lines = tagged(Classification::Common, common);
    lines.extend(tagged(Classification::TargetOnly, target_only));
    lines.extend(tagged(Classification::PredictedOnly, predicted_only));
    lines
}

/// Render metadiff lines as an HTML `<pre>` block with one styled span per line
pub fn render_html(lines: &[MetadiffLine]) -> String {
    let mut html = String::from("<pre class=\"metadiff\">\n");

    for line in lines {
        html.push_str(&format!(
            "<span class=\"{}\" style=\"{}\">{}</span>\n",
            line.classification.css_class(),
            line.classification.inline_style(),
            escape_html(&line.render())
        ));
    }

    html.push_str("</pre>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_parse_line() {
        let line = MetadiffLine::new(Classification::TargetOnly, Change::removed("is_a: X"));
        assert_eq!(line.render(), "<-is_a: X");
        assert_eq!(MetadiffLine::parse("<-is_a: X").unwrap(), line);

        let common = MetadiffLine::parse(" +name: foo").unwrap();
        assert_eq!(common.classification, Classification::Common);
        assert_eq!(common.change, Change::added("name: foo"));
    }

    #[test]
    fn test_parse_rejects_unknown_tags() {
        assert!(MetadiffLine::parse("?+x").is_err());
        assert!(MetadiffLine::parse(">*x").is_err());
        assert!(MetadiffLine::parse("").is_err());
    }

    #[test]
    fn test_build_metadiff_order() {
        let lines = build_metadiff(
            &[Change::added("a")],
            &[Change::added("b")],
            &[Change::added("c")],
        );
        let rendered: Vec<_> = lines.iter().map(MetadiffLine::render).collect();
        assert_eq!(rendered, vec![" +a", "<+b", ">+c"]);
    }

    #[test]
    fn test_html_escapes_and_styles() {
        let lines = vec![
            MetadiffLine::new(Classification::Common, Change::added("a & b")),
            MetadiffLine::new(Classification::PredictedOnly, Change::added("<x>")),
        ];
        let html = render_html(&lines);

        assert!(html.starts_with("<pre class=\"metadiff\">"));
        assert!(html.contains("class=\"metadiff-common\""));
        assert!(html.contains(" +a &amp; b"));
        assert!(html.contains("class=\"metadiff-predicted\""));
        assert!(html.contains("&gt;+&lt;x&gt;"));
        assert!(!html.contains("metadiff-target"));
    }
}
