use crate::types::Interval;

/// Internal numeric IDs (indexes into Vecs).
pub type GeneId = usize;
pub type TranscriptId = usize;

/// One sub-feature interval owned by a transcript.
///
/// A record listing several parents is copied into each of them; the
/// interval is plain value data, so nothing is shared between transcripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub interval: Interval,
    /// The record's `ID` attribute, if it had one.
    pub id: Option<String>,
}

impl Feature {
    pub fn new(interval: Interval, id: Option<&str>) -> Self {
        Self {
            interval,
            id: id.map(|s| s.to_string()),
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.interval.len()
    }
}
