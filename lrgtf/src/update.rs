use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use crate::align::{AlignmentReader, TranscriptStream};
use crate::gtf::{GeneGroupReader, GtfWriter};
use crate::io::open_buffered;
use crate::qc::{Metrics, UpdateQC};
use crate::transcript::{FullLength, GeneGroup, SpliceMatcher, Transcript};

#[derive(Debug, Clone)]
pub struct UpdateParams {
    /// Largest splice-site difference, in bases, at which junctions still match.
    pub distance: u64,
    pub full_length: FullLength,
    /// Keep transcripts that overlap a gene without sharing an annotated junction.
    pub report_unclassified: bool,
    /// Second GTF column of synthesized lines.
    pub source: String,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            distance: 10,
            full_length: FullLength::default(),
            report_unclassified: false,
            source: "NONE".to_string(),
        }
    }
}

impl UpdateParams {
    pub fn with_distance(mut self, distance: u64) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_full_length(mut self, full_length: FullLength) -> Self {
        self.full_length = full_length;
        self
    }

    pub fn with_report_unclassified(mut self, report: bool) -> Self {
        self.report_unclassified = report;
        self
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = source.into();
        self
    }
}

/// Streams coordinate-sorted alignments against a sorted annotation and writes
/// the annotation back with the novel isoforms added.
#[derive(Debug)]
pub struct GtfUpdater {
    params: UpdateParams,
    matcher: SpliceMatcher,
    qc: UpdateQC,
}

impl GtfUpdater {
    pub fn new(params: UpdateParams) -> Self {
        let matcher = SpliceMatcher::new(params.distance, params.full_length);
        Self {
            params,
            matcher,
            qc: UpdateQC::default(),
        }
    }

    pub fn qc(&self) -> &UpdateQC {
        &self.qc
    }

    pub fn metrics(&self) -> Metrics {
        let mut metrics = Metrics::default();
        self.qc.report(&mut metrics);
        metrics
    }

    /// Update the annotation at `annotation` with the alignments at `alignments`.
    /// The alignment header defines the order of reference sequences.
    pub fn run<P, Q, W>(
        &mut self,
        alignments: P,
        annotation: Q,
        output: W,
        full_gtf: Option<&mut dyn Write>,
    ) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        W: Write,
    {
        let reads = TranscriptStream::new(AlignmentReader::from_path(alignments)?);
        let index = reads.reference_index().clone();
        info!("Alignment header lists {} reference sequences", index.len());
        let gtf = GeneGroupReader::new(open_buffered(annotation.as_ref())?, index)
            .with_context(|| format!("failed to read annotation: {}", annotation.as_ref().display()))?;
        self.update(reads, gtf, output, full_gtf)
    }

    pub fn update<R, W>(
        &mut self,
        mut reads: TranscriptStream,
        mut gtf: GeneGroupReader<R>,
        output: W,
        full_gtf: Option<&mut dyn Write>,
    ) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let mut writer = GtfWriter::new(output, self.params.source.clone());
        let mut full = full_gtf.map(|w| GtfWriter::new(w, self.params.source.clone()));
        writer.write_preamble(&gtf.take_preamble())?;

        let spinner = ProgressBar::new_spinner().with_style(ProgressStyle::with_template(
            "[{elapsed}] {spinner} {human_pos} alignment records ({per_sec})",
        )?);

        let mut transcript = self.next_transcript(&mut reads, &mut full, &spinner)?;
        let mut group = self.next_group(&mut gtf)?;
        loop {
            let (Some(t), Some(g)) = (&transcript, &mut group) else {
                break;
            };
            if precedes(t, g) {
                transcript = self.next_transcript(&mut reads, &mut full, &spinner)?;
            } else if follows(t, g) {
                writer.write_group(g)?;
                group = self.next_group(&mut gtf)?;
            } else if let Some(t) = transcript.take() {
                let name = t.name.clone();
                let placement = self.matcher.place(t, g, self.params.report_unclassified);
                debug!("{}: {:?}", name.as_deref().unwrap_or("unnamed read"), placement);
                self.qc.add_placement(placement);
                transcript = self.next_transcript(&mut reads, &mut full, &spinner)?;
            }
        }

        if let Some(g) = group.take() {
            writer.write_group(&g)?;
        }
        gtf.write_remaining(writer.get_mut())?;
        if full.is_some() {
            while self.next_transcript(&mut reads, &mut full, &spinner)?.is_some() {}
        }
        spinner.finish_and_clear();

        writer.flush()?;
        if let Some(full) = full.as_mut() {
            full.flush()?;
        }
        self.qc.alignments = reads.records();
        self.qc.skipped_alignments = reads.skipped();
        self.qc.malformed_lines = gtf.malformed_lines();
        info!(
            "Processed {} alignment records: {} novel isoforms, {} merged, {} unclassified",
            self.qc.alignments, self.qc.novel, self.qc.merged, self.qc.unclassified
        );
        Ok(())
    }

    /// Next transcript from the alignments. Every transcript is written to the
    /// full-GTF output as soon as it is read.
    fn next_transcript(
        &mut self,
        reads: &mut TranscriptStream,
        full: &mut Option<GtfWriter<&mut dyn Write>>,
        spinner: &ProgressBar,
    ) -> Result<Option<Transcript>> {
        let transcript = reads.next_transcript()?;
        spinner.set_position(reads.records());
        if let Some(t) = &transcript {
            self.qc.transcripts += 1;
            if let Some(full) = full.as_mut() {
                let gene_id = t.name.as_deref().unwrap_or(&self.params.source);
                full.write_transcript(gene_id, t)?;
            }
        }
        Ok(transcript)
    }

    fn next_group<R: BufRead>(&mut self, gtf: &mut GeneGroupReader<R>) -> Result<Option<GeneGroup>> {
        let group = gtf.read_group()?;
        if let Some(g) = &group {
            self.qc.gene_groups += 1;
            self.qc.genes += g.len() as u64;
        }
        Ok(group)
    }
}

/// The transcript ends before the group starts.
fn precedes(t: &Transcript, g: &GeneGroup) -> bool {
    t.tid < g.tid || (t.tid == g.tid && t.end < g.start)
}

/// The transcript starts after the group ends.
fn follows(t: &Transcript, g: &GeneGroup) -> bool {
    t.tid > g.tid || (t.tid == g.tid && t.start > g.end)
}
