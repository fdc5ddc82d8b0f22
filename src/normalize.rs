//! Canonicalizes missing-value sentinels and boolean spellings.

use std::collections::HashSet;

use crate::config::TokenConfig;
use crate::parser::Cell;

/// Token lookup built once per run from a [`TokenConfig`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    missing: HashSet<String>,
    truthy: HashSet<String>,
    falsy: HashSet<String>,
}

impl Normalizer {
    pub fn new(tokens: &TokenConfig) -> Self {
        let fold = |tokens: &[String]| -> HashSet<String> {
            tokens.iter().map(|t| t.trim().to_lowercase()).collect()
        };
        Normalizer {
            missing: fold(&tokens.missing),
            truthy: fold(&tokens.truthy),
            falsy: fold(&tokens.falsy),
        }
    }

    /// Replaces sentinel spellings (and whitespace-only text) with [`Cell::Empty`].
    ///
    /// NaN numbers are sentinels too.
    pub fn cell(&self, cell: Cell) -> Cell {
        match cell {
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || self.missing.contains(&trimmed.to_lowercase()) {
                    Cell::Empty
                } else {
                    Cell::Text(trimmed.to_string())
                }
            }
            Cell::Number(n) if n.is_nan() => Cell::Empty,
            other => other,
        }
    }

    /// Maps a boolean-like cell. Unrecognized values are missing.
    pub fn boolean(&self, cell: &Cell) -> Option<bool> {
        match cell {
            Cell::Bool(b) => Some(*b),
            Cell::Number(n) if *n == 1.0 => Some(true),
            Cell::Number(n) if *n == 0.0 => Some(false),
            Cell::Text(s) => {
                let token = s.trim().to_lowercase();
                if self.truthy.contains(&token) {
                    Some(true)
                } else if self.falsy.contains(&token) {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new(&TokenConfig::default())
    }
}
