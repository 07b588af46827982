use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;

use crate::transcript::Placement;

/// Named run statistics, printed in insertion order.
#[derive(Debug, Default, Clone)]
pub struct Metrics(IndexMap<String, f64>);

impl Deref for Metrics {
    type Target = IndexMap<String, f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Metrics {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.0 {
            writeln!(f, "{}\t{}", key, value)?;
        }
        Ok(())
    }
}

/// Counters of one update run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateQC {
    pub alignments: u64,
    pub skipped_alignments: u64,
    pub transcripts: u64,
    pub merged: u64,
    pub novel: u64,
    pub unclassified: u64,
    pub dropped: u64,
    pub gene_groups: u64,
    pub genes: u64,
    pub malformed_lines: u64,
}

impl UpdateQC {
    pub fn add_placement(&mut self, placement: Placement) {
        match placement {
            Placement::Merged => self.merged += 1,
            Placement::Added(_) => self.novel += 1,
            Placement::AddedUnclassified(_) => self.unclassified += 1,
            Placement::Dropped => self.dropped += 1,
        }
    }

    /// Transcripts that reached no gene group: they lie between or outside the annotated genes.
    pub fn intergenic(&self) -> u64 {
        self.transcripts - self.merged - self.novel - self.unclassified - self.dropped
    }

    pub fn report(&self, metrics: &mut Metrics) {
        metrics.insert("alignment_records".to_string(), self.alignments as f64);
        metrics.insert("skipped_alignments".to_string(), self.skipped_alignments as f64);
        metrics.insert("transcripts".to_string(), self.transcripts as f64);
        metrics.insert("merged".to_string(), self.merged as f64);
        metrics.insert("novel_isoforms".to_string(), self.novel as f64);
        metrics.insert("unclassified".to_string(), self.unclassified as f64);
        metrics.insert("dropped".to_string(), self.dropped as f64);
        metrics.insert("intergenic".to_string(), self.intergenic() as f64);
        metrics.insert("gene_groups".to_string(), self.gene_groups as f64);
        metrics.insert("genes".to_string(), self.genes as f64);
        metrics.insert("malformed_lines".to_string(), self.malformed_lines as f64);
    }
}
