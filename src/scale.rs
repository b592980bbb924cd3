//! Grade-point scale: the letter-grade → points lookup table.
//!
//! The scale is an immutable configuration value carried inside
//! [`crate::config::IngestConfig`] and injected into the normaliser, so an
//! alternate grading scheme (4-point US scale, pass/fail) is a constructor
//! argument away — no global state to patch in tests.

use serde::{Deserialize, Serialize};

/// An immutable letter-grade → grade-point table.
///
/// [`GradeScale::points`] is a pure total function: known letters return their
/// fixed value, anything unrecognised maps to 0.0. Lookup is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeScale {
    entries: Vec<(String, f64)>,
}

impl Default for GradeScale {
    /// The 10-point scale used by Indian universities.
    fn default() -> Self {
        Self::new([
            ("O", 10.0),
            ("A+", 9.0),
            ("A", 8.0),
            ("B+", 7.0),
            ("B", 6.0),
            ("C", 5.0),
            ("D", 4.0),
            ("F", 0.0),
            ("U", 0.0),
            ("AB", 0.0),
        ])
    }
}

impl GradeScale {
    /// Build a scale from `(letter, points)` pairs. Letters are stored
    /// upper-cased so lookup is case-insensitive.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(letter, points)| (letter.into().to_uppercase(), points))
                .collect(),
        }
    }

    /// Grade points for a letter grade. Unknown letters map to 0.0.
    pub fn points(&self, letter: &str) -> f64 {
        let wanted = letter.trim().to_uppercase();
        self.entries
            .iter()
            .find(|(l, _)| *l == wanted)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }

    /// Maximum points awardable on this scale (0.0 for an empty scale).
    pub fn max_points(&self) -> f64 {
        self.entries.iter().map(|(_, p)| *p).fold(0.0, f64::max)
    }
}
