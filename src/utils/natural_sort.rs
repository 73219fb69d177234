//! Natural ("outliner") name ordering.
//!
//! Names are split into alternating text and digit runs. Text runs compare
//! case-insensitively, digit runs compare by numeric value, so `Bolt2` sorts
//! before `bolt10`.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    /// Digits with leading zeros stripped; compared by length, then lexically.
    Number(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Number(a), Segment::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key for a name under natural ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Segment>);

impl NaturalKey {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut in_digits = false;

        for c in name.chars() {
            let is_digit = c.is_ascii_digit();
            if !current.is_empty() && is_digit != in_digits {
                segments.push(Self::segment(std::mem::take(&mut current), in_digits));
            }
            in_digits = is_digit;
            current.push(c);
        }
        if !current.is_empty() {
            segments.push(Self::segment(current, in_digits));
        }

        Self(segments)
    }

    fn segment(run: String, digits: bool) -> Segment {
        if digits {
            let trimmed = run.trim_start_matches('0');
            Segment::Number(if trimmed.is_empty() { "0".to_owned() } else { trimmed.to_owned() })
        } else {
            Segment::Text(run.to_lowercase())
        }
    }
}

/// Compares two names by natural ordering.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    NaturalKey::new(a).cmp(&NaturalKey::new(b))
}

/// Sorts `items` in place by the natural ordering of the names `name_of` returns.
pub fn sort_by_natural_name<T, S: AsRef<str>>(items: &mut [T], mut name_of: impl FnMut(&T) -> S) {
    items.sort_by_cached_key(|item| NaturalKey::new(name_of(item).as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_compare_numerically() {
        assert_eq!(natural_cmp("Bolt2", "Bolt10"), Ordering::Less);
        assert_eq!(natural_cmp("Bolt10", "Bolt2"), Ordering::Greater);
    }

    #[test]
    fn text_is_case_insensitive() {
        assert_eq!(natural_cmp("wheel", "Wheel"), Ordering::Equal);
        assert_eq!(natural_cmp("axle", "Body"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_do_not_change_value() {
        assert_eq!(natural_cmp("part007", "part7"), Ordering::Equal);
        assert_eq!(natural_cmp("part007", "part8"), Ordering::Less);
    }

    #[test]
    fn sorts_mixed_names() {
        let mut names = vec!["Cube.10", "cube.2", "Armature", "Cube.1"];
        sort_by_natural_name(&mut names, |n| *n);
        assert_eq!(names, vec!["Armature", "Cube.1", "cube.2", "Cube.10"]);
    }
}
