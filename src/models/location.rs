//! Location candidate model produced by city autocomplete

use serde::{Deserialize, Serialize};

/// A city suggestion for partially typed text
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LocationCandidate {
    /// Display string, "City, Country"
    pub display: String,
    /// Number of characters of the typed text this candidate replaces
    pub replace_len: usize,
}

impl LocationCandidate {
    /// Create a candidate from the provider's city and country names
    #[must_use]
    pub fn new(city: &str, country: &str, query: &str) -> Self {
        Self {
            display: format!("{city}, {country}"),
            replace_len: query.chars().count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_display() {
        let candidate = LocationCandidate::new("São Paulo", "Brazil", "São");
        assert_eq!(candidate.display, "São Paulo, Brazil");
    }

    #[test]
    fn test_replace_len_counts_characters() {
        // "São" is 4 bytes but 3 characters
        let candidate = LocationCandidate::new("São Paulo", "Brazil", "São");
        assert_eq!(candidate.replace_len, 3);
    }
}
