// Field location paths
//
// A path addresses one value inside the aggregate document:
// `plantDetail.nowPower`, `plantList[0].plantuid`,
// `getPlantMeterChartData.dataCountList[1][-1]`. Negative indices count
// from the end of the array.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(i64),
}

/// Location of a value inside a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("empty path")]
    Empty,
    #[error("empty key at byte {0}")]
    EmptyKey(usize),
    #[error("unclosed '[' at byte {0}")]
    UnclosedBracket(usize),
    #[error("invalid index {0:?}")]
    InvalidIndex(String),
    #[error("unexpected {0:?} at byte {1}")]
    Unexpected(char, usize),
}

impl FieldPath {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Start a path at a top-level key.
    pub fn root(key: impl Into<String>) -> Self {
        Self::new(vec![Segment::Key(key.into())])
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    #[must_use]
    pub fn index(mut self, index: i64) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Follow the path from `root`.
    ///
    /// Any missing key, out-of-range index or type mismatch along the way
    /// yields `None`. An explicit JSON `null` *at the end* of the path is
    /// returned as `Some(Value::Null)`; a `null` in the middle is missing.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        walk(&self.segments, root)
    }

    /// Like [`resolve`](Self::resolve), starting from a JSON object's map.
    pub fn resolve_in<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let Segment::Key(key) = first else {
            return None;
        };
        walk(rest, root.get(key)?)
    }
}

fn walk<'a>(segments: &[Segment], root: &'a Value) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(index), Value::Array(items)) => {
                items.get(resolve_index(*index, items.len())?)?
            }
            _ => return None,
        };
    }
    Some(current)
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok()
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments = Vec::new();
        let mut key = String::new();
        let mut key_start = 0;
        let mut chars = s.char_indices().peekable();
        // After `]` only `.` or `[` may follow.
        let mut after_index = false;

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() && !after_index {
                        return Err(PathParseError::EmptyKey(key_start));
                    }
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    after_index = false;
                    key_start = pos + 1;
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    } else if segments.is_empty() {
                        return Err(PathParseError::EmptyKey(pos));
                    }
                    let mut raw = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        raw.push(c);
                    }
                    if !closed {
                        return Err(PathParseError::UnclosedBracket(pos));
                    }
                    let index = raw
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| PathParseError::InvalidIndex(raw.clone()))?;
                    segments.push(Segment::Index(index));
                    after_index = true;
                }
                ']' => return Err(PathParseError::Unexpected(c, pos)),
                _ => {
                    if after_index {
                        return Err(PathParseError::Unexpected(c, pos));
                    }
                    key.push(c);
                }
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if !after_index {
            return Err(PathParseError::EmptyKey(key_start));
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
