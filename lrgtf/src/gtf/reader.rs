use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use bed_utils::bed::Strand;
use log::warn;

use crate::genome::ReferenceIndex;
use crate::gtf::record::{is_comment, Feature, GtfRecord};
use crate::transcript::{Exons, Gene, GeneGroup, Transcript, TranscriptKind};

/// Reads a sorted GTF one gene group at a time, keeping every line verbatim.
///
/// The reader always holds the `gene` line that starts the next group, so that
/// a group is only closed once the first non-overlapping gene has been seen.
pub struct GeneGroupReader<R> {
    reader: R,
    index: ReferenceIndex,
    seed: Option<(String, GtfRecord)>,
    preamble: Vec<String>,
    line_no: usize,
    malformed: u64,
    unknown_chroms: HashSet<String>,
}

impl<R: BufRead> GeneGroupReader<R> {
    /// Position the reader on the first `gene` record. Lines before it form the preamble.
    pub fn new(reader: R, index: ReferenceIndex) -> Result<Self> {
        let mut gtf = Self {
            reader,
            index,
            seed: None,
            preamble: Vec::new(),
            line_no: 0,
            malformed: 0,
            unknown_chroms: HashSet::new(),
        };
        while let Some(line) = gtf.next_line()? {
            match gtf.parse(&line) {
                Some(record) if record.feature == Feature::Gene => {
                    gtf.seed = Some((line, record));
                    return Ok(gtf);
                }
                _ => gtf.preamble.push(line),
            }
        }
        bail!("annotation contains no gene record")
    }

    /// Lines that preceded the first gene record.
    pub fn take_preamble(&mut self) -> Vec<String> {
        std::mem::take(&mut self.preamble)
    }

    /// Number of lines that could not be tokenized so far.
    pub fn malformed_lines(&self) -> u64 {
        self.malformed
    }

    /// Read the next group of chain-overlapping genes. Returns `None` once the
    /// annotation is exhausted.
    pub fn read_group(&mut self) -> Result<Option<GeneGroup>> {
        let Some((line, record)) = self.seed.take() else {
            return Ok(None);
        };
        let (gene, lines) = self.read_gene(line, record)?;
        let mut group = GeneGroup::new(gene, lines);
        while let Some((line, record)) = self.seed.take() {
            if !group.accepts(&record.seqname, record.start) {
                self.seed = Some((line, record));
                break;
            }
            let (gene, lines) = self.read_gene(line, record)?;
            group.push(gene, lines);
        }
        Ok(Some(group))
    }

    /// Copy the buffered gene line and everything not yet read to `writer`, unchanged.
    pub fn write_remaining<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<u64> {
        let mut n = 0;
        if let Some((line, _)) = self.seed.take() {
            writer.write_all(line.as_bytes())?;
            n += line.len() as u64;
        }
        n += io::copy(&mut self.reader, writer)?;
        Ok(n)
    }

    /// Read one gene: its own line and every line up to the next `gene` record.
    fn read_gene(&mut self, line: String, record: GtfRecord) -> Result<(Gene, Vec<String>)> {
        let tid = self.index.get_index_of(&record.seqname);
        if tid.is_none() && self.unknown_chroms.insert(record.seqname.clone()) {
            warn!(
                "Reference sequence '{}' is not in the alignment header; its genes are copied unchanged",
                record.seqname
            );
        }
        let name = match record.attribute("gene_id") {
            Some(id) => id.to_string(),
            None => {
                warn!("Line {}: gene record without gene_id", self.line_no);
                format!("{}:{}-{}", record.seqname, record.start, record.end)
            }
        };
        let mut gene = Gene::new(name, &record.seqname, tid, record.start, record.end, record.strand);
        let mut lines = vec![line];
        let mut pending: Option<PendingTranscript> = None;

        while let Some(line) = self.next_line()? {
            match self.parse(&line) {
                Some(rec) if rec.feature == Feature::Gene => {
                    self.seed = Some((line, rec));
                    break;
                }
                Some(rec) if rec.feature == Feature::Transcript => {
                    self.flush(pending.take(), &mut gene);
                    pending = Some(PendingTranscript::new(&rec, tid, gene.strand, self.line_no));
                }
                Some(rec) if rec.feature == Feature::Exon => {
                    pending
                        .get_or_insert_with(|| PendingTranscript::new(&rec, tid, gene.strand, self.line_no))
                        .exons
                        .push((rec.start, rec.end));
                }
                _ => {}
            }
            lines.push(line);
        }
        self.flush(pending, &mut gene);
        Ok((gene, lines))
    }

    fn flush(&self, pending: Option<PendingTranscript>, gene: &mut Gene) {
        let Some(pending) = pending else { return };
        if pending.exons.is_empty() {
            return;
        }
        let line_no = pending.line_no;
        match pending.into_transcript() {
            Ok(transcript) => gene.add_annotated(transcript),
            Err(e) => warn!("Line {}: transcript of gene '{}' is not modeled: {}", line_no, gene.name, e),
        }
    }

    /// Tokenize a line. Comments give `None`; malformed lines are reported and give `None`.
    fn parse(&mut self, line: &str) -> Option<GtfRecord> {
        if is_comment(line) {
            return None;
        }
        match line.parse::<GtfRecord>() {
            Ok(record) => Some(record),
            Err(e) => {
                self.malformed += 1;
                warn!("Line {}: {}; copied unchanged", self.line_no, e);
                None
            }
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .with_context(|| format!("failed to read annotation line {}", self.line_no + 1))?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        if !line.ends_with('\n') {
            line.push('\n');
        }
        Ok(Some(line))
    }
}

/// Transcript being collected from consecutive `exon` lines.
struct PendingTranscript {
    chrom: String,
    tid: Option<usize>,
    strand: Option<Strand>,
    name: Option<String>,
    exons: Vec<(u64, u64)>,
    line_no: usize,
}

impl PendingTranscript {
    fn new(record: &GtfRecord, tid: Option<usize>, gene_strand: Option<Strand>, line_no: usize) -> Self {
        Self {
            chrom: record.seqname.clone(),
            tid,
            strand: record.strand.or(gene_strand),
            name: record.attribute("transcript_id").map(str::to_string),
            exons: Vec::new(),
            line_no,
        }
    }

    fn into_transcript(self) -> Result<Transcript> {
        let exons = Exons::from_unsorted(self.exons)?;
        let transcript = Transcript::new(self.chrom, self.tid, self.strand, exons, TranscriptKind::Annotated);
        Ok(match self.name {
            Some(name) => transcript.with_name(name),
            None => transcript,
        })
    }
}
