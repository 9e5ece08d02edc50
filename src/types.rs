use std::fmt;

use serde::{Deserialize, Serialize};

/// Genomic strand/orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    /// Parse the strand column. Anything but `+` or `-` is unknown.
    pub fn from_column(s: &str) -> Self {
        match s {
            "+" => Strand::Plus,
            "-" => Strand::Minus,
            _ => Strand::Unknown,
        }
    }

    pub fn as_column(self) -> &'static str {
        match self {
            Strand::Plus => "+",
            Strand::Minus => "-",
            Strand::Unknown => ".",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_column())
    }
}

/// A contiguous genomic interval.
/// Coordinates are 1-based, inclusive: [start, end]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Returns `None` for an empty interval (`start > end`).
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    #[inline]
    pub fn len(self) -> u64 {
        self.end - self.start + 1
    }

    /// Interior gaps between consecutive intervals of a start-sorted slice.
    ///
    /// Gap i (1-based) lies between `sorted[i-1]` and `sorted[i]`:
    /// `[prev.end + 1, next.start - 1]`. Touching or overlapping neighbours
    /// produce no gap, but the index of every later gap still reflects its
    /// position in the slice.
    ///
    /// Fewer than two intervals => empty vec.
    pub fn gaps(sorted: &[Interval]) -> Vec<(usize, Interval)> {
        let mut out = Vec::new();
        if sorted.len() < 2 {
            return out;
        }

        for (i, w) in sorted.windows(2).enumerate() {
            let gap_start = w[0].end + 1;
            let Some(gap_end) = w[1].start.checked_sub(1) else {
                continue;
            };
            if let Some(gap) = Interval::new(gap_start, gap_end) {
                out.push((i + 1, gap));
            }
        }

        out
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Sum of inclusive lengths.
pub fn total_len<'a>(intervals: impl IntoIterator<Item = &'a Interval>) -> u64 {
    intervals.into_iter().map(|iv| iv.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: u64, end: u64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn inclusive_length() {
        assert_eq!(iv(100, 200).len(), 101);
        assert_eq!(iv(5, 5).len(), 1);
        assert!(Interval::new(6, 5).is_none());
    }

    #[test]
    fn gaps_between_sorted_blocks() {
        let blocks = vec![iv(100, 200), iv(300, 400), iv(500, 600)];
        assert_eq!(
            Interval::gaps(&blocks),
            vec![(1, iv(201, 299)), (2, iv(401, 499))]
        );
    }

    #[test]
    fn touching_blocks_leave_a_numbering_hole() {
        let blocks = vec![iv(100, 200), iv(201, 300), iv(400, 500)];
        assert_eq!(Interval::gaps(&blocks), vec![(2, iv(301, 399))]);
    }

    #[test]
    fn single_block_has_no_gaps() {
        assert!(Interval::gaps(&[iv(1, 10)]).is_empty());
        assert!(Interval::gaps(&[]).is_empty());
    }

    #[test]
    fn strand_column_round_trip() {
        assert_eq!(Strand::from_column("-"), Strand::Minus);
        assert_eq!(Strand::from_column("?"), Strand::Unknown);
        assert_eq!(Strand::from_column("*"), Strand::Unknown);
        assert_eq!(Strand::Unknown.as_column(), ".");
    }

    #[test]
    fn total_len_sums_inclusive_lengths() {
        let blocks = [iv(1, 10), iv(21, 30)];
        assert_eq!(total_len(&blocks), 20);
    }
}
