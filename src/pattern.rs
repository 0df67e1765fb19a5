//! Android pattern-lock geometry.
//!
//! Dots are numbered 0-8, top-left to bottom-right. A pattern is built one dot
//! at a time through [`Pattern::append_dot`], which applies the skipped-dot
//! rule: swiping across an unvisited dot that lies exactly between the last dot
//! and the new one selects it implicitly.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{PatlockError, Result};
use crate::store::RejectedSet;

/// Number of valid Android patterns of length 4 to 9.
pub const TOTAL_PATTERNS: usize = 389_112;

pub const MIN_PATTERN_LEN: usize = 4;
pub const MAX_PATTERN_LEN: usize = 9;

const KEY_SEPARATOR: &str = "-";

/// One of the nine grid positions. `row = id / 3`, `col = id % 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dot(u8);

impl Dot {
    pub const CENTER: Dot = Dot(4);

    pub const ALL: [Dot; 9] = [
        Dot(0),
        Dot(1),
        Dot(2),
        Dot(3),
        Dot(4),
        Dot(5),
        Dot(6),
        Dot(7),
        Dot(8),
    ];

    pub fn new(id: u8) -> Option<Dot> {
        (id < 9).then_some(Dot(id))
    }

    pub fn from_row_col(row: u8, col: u8) -> Option<Dot> {
        if row < 3 && col < 3 {
            Some(Dot(row * 3 + col))
        } else {
            None
        }
    }

    pub fn id(self) -> u8 {
        self.0
    }

    pub fn row(self) -> u8 {
        self.0 / 3
    }

    pub fn col(self) -> u8 {
        self.0 % 3
    }
}

impl fmt::Display for Dot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The dot a straight swipe from `a` to `b` passes over, if any.
///
/// Only aligned pairs with a one-dot gap have a middle: same column two rows
/// apart, same row two columns apart, or opposite corners (always the center).
pub fn middle_dot(a: Dot, b: Dot) -> Option<Dot> {
    let row_diff = a.row().abs_diff(b.row());
    let col_diff = a.col().abs_diff(b.col());

    match (row_diff, col_diff) {
        (2, 0) => Dot::from_row_col(1, a.col()),
        (0, 2) => Dot::from_row_col(a.row(), 1),
        (2, 2) => Some(Dot::CENTER),
        _ => None,
    }
}

/// An ordered sequence of distinct dots, possibly still being drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    dots: Vec<Dot>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(dot: Dot) -> Self {
        Self { dots: vec![dot] }
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    pub fn len(&self) -> usize {
        self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    pub fn last(&self) -> Option<Dot> {
        self.dots.last().copied()
    }

    pub fn contains(&self, dot: Dot) -> bool {
        self.dots.contains(&dot)
    }

    /// Long enough to be tested against a device.
    pub fn is_complete(&self) -> bool {
        self.dots.len() >= MIN_PATTERN_LEN
    }

    pub fn clear(&mut self) {
        self.dots.clear();
    }

    /// Extends the pattern with `dot`, inserting the skipped middle dot first
    /// when the swipe crosses an unvisited one.
    ///
    /// Returns `false` and leaves the pattern untouched when `dot` is already
    /// part of it.
    pub fn append_dot(&mut self, dot: Dot) -> bool {
        if self.contains(dot) {
            return false;
        }

        if let Some(middle) = self.last().and_then(|last| middle_dot(last, dot)) {
            if !self.contains(middle) {
                self.dots.push(middle);
            }
        }

        self.dots.push(dot);
        true
    }

    /// Whether this sequence could have been produced by `append_dot` alone.
    pub fn is_valid(&self) -> bool {
        if self.dots.len() > MAX_PATTERN_LEN || !self.dots.iter().all_unique() {
            return false;
        }

        self.dots.iter().enumerate().skip(1).all(|(idx, &dot)| {
            let visited = &self.dots[..idx];
            match middle_dot(self.dots[idx - 1], dot) {
                Some(middle) => visited.contains(&middle),
                None => true,
            }
        })
    }

    pub fn key(&self) -> PatternKey {
        PatternKey::encode(self)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dots.iter().join(KEY_SEPARATOR))
    }
}

/// Canonical, order-sensitive identity of a pattern, e.g. `"0-1-2-5-8"`.
///
/// This is the form used for set membership and on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternKey(String);

impl PatternKey {
    pub fn encode(pattern: &Pattern) -> Self {
        PatternKey(pattern.dots.iter().join(KEY_SEPARATOR))
    }

    /// Parses a key back into the pattern it names, rejecting anything that
    /// is not a geometrically possible sequence of distinct dots.
    pub fn decode(&self) -> Result<Pattern> {
        let invalid = |reason: &str| PatlockError::InvalidKey {
            key: self.0.clone(),
            reason: reason.to_string(),
        };

        if self.0.is_empty() {
            return Err(invalid("empty key"));
        }

        let dots = self
            .0
            .split(KEY_SEPARATOR)
            .map(|part| {
                part.parse::<u8>()
                    .ok()
                    .and_then(Dot::new)
                    .ok_or_else(|| invalid(&format!("{part:?} is not a dot between 0 and 8")))
            })
            .collect::<Result<Vec<Dot>>>()?;

        let pattern = Pattern { dots };
        if !pattern.is_valid() {
            return Err(invalid("repeats a dot or skips over an unvisited dot"));
        }
        Ok(pattern)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Pattern> for PatternKey {
    fn from(pattern: &Pattern) -> Self {
        PatternKey::encode(pattern)
    }
}

impl std::str::FromStr for PatternKey {
    type Err = PatlockError;

    fn from_str(s: &str) -> Result<Self> {
        let key = PatternKey(s.trim().to_string());
        key.decode()?;
        Ok(key)
    }
}

/// Verdict on a finished drawing before any human judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Classification {
    #[strum(serialize = "too short")]
    TooShort,
    #[strum(serialize = "duplicate")]
    Duplicate,
    #[strum(serialize = "pending")]
    Pending,
}

pub fn classify(pattern: &Pattern, rejected: &RejectedSet) -> Classification {
    if !pattern.is_complete() {
        Classification::TooShort
    } else if rejected.contains(&pattern.key()) {
        Classification::Duplicate
    } else {
        Classification::Pending
    }
}
