use crate::model::types::{GeneId, TranscriptId};
use crate::types::Interval;

/// Gene model: identity, span and the transcripts it owns.
///
/// Notes:
/// - `name` is the gene's `ID` attribute.
/// - transcripts are stored in the owning arena; the gene keeps their ids in
///   the order they were first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gene {
    pub id: GeneId,
    pub name: String,
    pub seqid: String,
    pub span: Interval,
    transcript_ids: Vec<TranscriptId>,
}

impl Gene {
    pub fn new(id: GeneId, name: impl Into<String>, seqid: impl Into<String>, span: Interval) -> Self {
        Self {
            id,
            name: name.into(),
            seqid: seqid.into(),
            span,
            transcript_ids: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.span.len()
    }

    pub fn add_transcript(&mut self, tx_id: TranscriptId) {
        if !self.transcript_ids.contains(&tx_id) {
            self.transcript_ids.push(tx_id);
        }
    }

    pub fn remove_transcript(&mut self, tx_id: TranscriptId) {
        self.transcript_ids.retain(|&t| t != tx_id);
    }

    pub fn transcript_ids(&self) -> &[TranscriptId] {
        &self.transcript_ids
    }

    /// Replace location and drop every owned transcript; returns the dropped ids.
    pub fn redefine(&mut self, seqid: impl Into<String>, span: Interval) -> Vec<TranscriptId> {
        self.seqid = seqid.into();
        self.span = span;
        std::mem::take(&mut self.transcript_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: u64, end: u64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn transcripts_keep_first_seen_order_without_duplicates() {
        let mut g = Gene::new(0, "G1", "chr1", span(1, 1000));
        g.add_transcript(3);
        g.add_transcript(1);
        g.add_transcript(3);
        assert_eq!(g.transcript_ids(), &[3, 1]);

        g.remove_transcript(3);
        assert_eq!(g.transcript_ids(), &[1]);
    }

    #[test]
    fn redefine_resets_span_and_transcripts() {
        let mut g = Gene::new(0, "G1", "chr1", span(1, 1000));
        g.add_transcript(0);
        g.add_transcript(1);

        let dropped = g.redefine("chr2", span(50, 60));
        assert_eq!(dropped, vec![0, 1]);
        assert!(g.transcript_ids().is_empty());
        assert_eq!(g.seqid, "chr2");
        assert_eq!(g.len(), 11);
    }
}
