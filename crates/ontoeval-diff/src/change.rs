use serde::{Deserialize, Serialize};

/// Direction of a changed line
///
/// Serialized as `1` for added lines and `-1` for removed lines, which is
/// the form persisted in benchmark reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Direction {
    Added,
    Removed,
}

impl Direction {
    /// The unified diff marker for this direction
    pub fn marker(&self) -> char {
        match self {
            Direction::Added => '+',
            Direction::Removed => '-',
        }
    }

    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '+' => Some(Direction::Added),
            '-' => Some(Direction::Removed),
            _ => None,
        }
    }

    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Added => "ADD",
            Direction::Removed => "DEL",
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Added => 1,
            Direction::Removed => -1,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Added),
            -1 => Ok(Direction::Removed),
            other => Err(format!("Unknown change direction: {}", other)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.marker())
    }
}

/// A single added or removed line, independent of its position
///
/// Two changes are the same change iff direction and text are equal.
/// Serialized as a `[direction, text]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(Direction, String)", into = "(Direction, String)")]
pub struct Change {
    pub direction: Direction,
    pub text: String,
}

impl Change {
    pub fn new(direction: Direction, text: impl Into<String>) -> Self {
        Self {
            direction,
            text: text.into(),
        }
    }

    pub fn added(text: impl Into<String>) -> Self {
        Self::new(Direction::Added, text)
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self::new(Direction::Removed, text)
    }

    pub fn is_added(&self) -> bool {
        self.direction == Direction::Added
    }
}

impl From<(Direction, String)> for Change {
    fn from((direction, text): (Direction, String)) -> Self {
        Self { direction, text }
    }
}

impl From<Change> for (Direction, String) {
    fn from(change: Change) -> Self {
        (change.direction, change.text)
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.direction.marker(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_serializes_as_pair() {
        let json = serde_json::to_string(&Change::added("id: GO:0001")).unwrap();
        assert_eq!(json, r#"[1,"id: GO:0001"]"#);

        let json = serde_json::to_string(&Change::removed("is_a: X")).unwrap();
        assert_eq!(json, r#"[-1,"is_a: X"]"#);
    }

    #[test]
    fn test_change_deserializes_from_pair() {
        let change: Change = serde_json::from_str(r#"[-1, "name: foo"]"#).unwrap();
        assert_eq!(change, Change::removed("name: foo"));
    }

    #[test]
    fn test_unknown_direction_rejected() {
        let result: Result<Change, _> = serde_json::from_str(r#"[0, "x"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_uses_marker() {
        assert_eq!(Change::added("a").to_string(), "+a");
        assert_eq!(Change::removed("b").to_string(), "-b");
    }
}
