//! Origin whitelist.
//!
//! Entries are exact origins or patterns where `*` stands for any run of
//! characters (`https://*.example`). Patterns are anchored at both ends;
//! nothing else is special. An empty whitelist trusts every origin.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
struct WildcardPattern {
    /// Literal pieces between the `*`s.
    pieces: Vec<String>,
}

impl WildcardPattern {
    fn new(pattern: &str) -> Self {
        Self {
            pieces: pattern.split('*').map(str::to_string).collect(),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        let Some((first, rest)) = self.pieces.split_first() else {
            return false;
        };
        let Some((last, middle)) = rest.split_last() else {
            return candidate == first;
        };

        let Some(mut remaining) = candidate.strip_prefix(first.as_str()) else {
            return false;
        };
        for piece in middle {
            match remaining.find(piece.as_str()) {
                Some(at) => remaining = &remaining[at + piece.len()..],
                None => return false,
            }
        }
        remaining.len() >= last.len() && remaining.ends_with(last.as_str())
    }
}

/// Trust policy applied to every inbound message.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    exact: HashSet<String>,
    patterns: Vec<WildcardPattern>,
}

impl OriginPolicy {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();
        for entry in entries {
            let entry = entry.as_ref();
            if entry.contains('*') {
                policy.patterns.push(WildcardPattern::new(entry));
            } else {
                policy.exact.insert(entry.to_string());
            }
        }
        policy
    }

    /// Trust every origin.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_permissive(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    /// Whether a message from `origin` may be processed.
    pub fn permits(&self, origin: &str) -> bool {
        self.is_permissive()
            || self.exact.contains(origin)
            || self.patterns.iter().any(|p| p.matches(origin))
    }
}
