use std::fmt;

/// An ordered tuple of string segments, e.g. `["messages", "controller-abc",
/// "01HX..."]`. Segments are joined with `/` on the wire; the ordering of a
/// `Vec<String>` is exactly the lexicographic ordering `list(prefix)` needs
/// to preserve ULID FIFO order within a recipient (spec §4.C, §9).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<String>);

impl Key {
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Whether `self` is a prefix of `other`, segment-wise (not string-wise —
    /// `["a", "b"]` is a prefix of `["a", "b", "c"]` but not of `["a", "bc"]`).
    pub fn is_prefix_of(&self, other: &Key) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    /// Wire-level representation used as the literal key in the backing
    /// store (Redis key, or the in-memory map's sort key).
    pub fn wire(&self) -> String {
        self.0.join("/")
    }

    pub fn from_wire(s: &str) -> Self {
        Self(s.split('/').map(str::to_owned).collect())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire())
    }
}

#[macro_export]
macro_rules! key {
    ($($seg:expr),+ $(,)?) => {
        $crate::Key::new([$($seg.to_string()),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_segment_wise_not_string_wise() {
        let prefix = Key::new(["messages", "controller-abc"]);
        let full = Key::new(["messages", "controller-abc", "01HX"]);
        let lookalike = Key::new(["messages", "controller-abcdef"]);
        assert!(prefix.is_prefix_of(&full));
        assert!(!prefix.is_prefix_of(&lookalike));
    }

    #[test]
    fn wire_round_trips() {
        let key = Key::new(["clients", "synth-1"]);
        assert_eq!(Key::from_wire(&key.wire()), key);
    }

    #[test]
    fn ordering_matches_ulid_expectations() {
        let a = Key::new(["messages", "c", "01HX000"]);
        let b = Key::new(["messages", "c", "01HX001"]);
        assert!(a < b);
    }
}
