//! Compass heading label

use std::fmt;

/// Logged compass direction, advanced once per completed set of four turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Heading {
    #[default]
    North,
    East,
    South,
    West,
}

impl Heading {
    /// Next heading clockwise (West wraps to North)
    pub const fn next(self) -> Self {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }

    /// Parse a label written by [`Heading::label`] (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        [Heading::North, Heading::East, Heading::South, Heading::West]
            .into_iter()
            .find(|h| h.label().eq_ignore_ascii_case(label))
    }

    pub const fn label(self) -> &'static str {
        match self {
            Heading::North => "North",
            Heading::East => "East",
            Heading::South => "South",
            Heading::West => "West",
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cycles_through_all_four() {
        let mut h = Heading::default();
        let mut seen = vec![h];
        for _ in 0..4 {
            h = h.next();
            seen.push(h);
        }
        assert_eq!(
            seen,
            vec![
                Heading::North,
                Heading::East,
                Heading::South,
                Heading::West,
                Heading::North
            ]
        );
    }

    #[test]
    fn test_label() {
        assert_eq!(Heading::South.to_string(), "South");
    }

    #[test]
    fn test_label_round_trip() {
        assert_eq!(Heading::from_label("East"), Some(Heading::East));
        assert_eq!(Heading::from_label("west"), Some(Heading::West));
        assert_eq!(Heading::from_label("turn"), None);
    }
}
