// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Spelling suggestions for unknown instance variable names.
//!
//! The policy engine consumes suggestions through the
//! [`SuggestionProvider`] trait so tests and embedders can substitute
//! their own lookup. The default implementation is a Levenshtein
//! edit-distance scan over the dictionary of known names.

use ecow::EcoString;

/// Finds the closest known name for a misspelled candidate.
pub trait SuggestionProvider: Send + Sync {
    /// Returns the best match for `name` from `dictionary`, or `None` when
    /// nothing is close enough. The candidate itself never matches.
    fn suggest(&self, name: &str, dictionary: &[EcoString]) -> Option<EcoString>;
}

/// Edit-distance suggestion lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditDistanceSuggester;

impl SuggestionProvider for EditDistanceSuggester {
    fn suggest(&self, name: &str, dictionary: &[EcoString]) -> Option<EcoString> {
        let mut best: Option<(&EcoString, usize)> = None;
        for candidate in dictionary {
            if candidate == name {
                continue;
            }
            let dist = edit_distance(name, candidate.as_str());
            // Only suggest if distance ≤ 3 and less than half the name length
            if dist <= 3
                && dist < name.len() / 2 + 1
                && best.as_ref().is_none_or(|(_, d)| dist < *d)
            {
                best = Some((candidate, dist));
            }
        }
        best.map(|(candidate, _)| candidate.clone())
    }
}

/// Levenshtein distance with a rolling two-row table.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (prev[j + 1] + 1)
                .min(current[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b_chars.len()]
}
