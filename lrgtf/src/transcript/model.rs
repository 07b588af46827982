use anyhow::{ensure, Result};
use bed_utils::bed::Strand;
use itertools::Itertools;

/// Where a transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptKind {
    /// Read from the input annotation.
    Annotated,
    /// Accepted from the alignments as a new isoform of a known gene.
    Novel,
    /// Accepted from the alignments without sharing an annotated splice site.
    Unclassified,
}

/// Transcript model. Coordinates are 1-based, inclusive.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub tid: Option<usize>,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Option<Strand>,
    pub name: Option<String>,
    pub cov: u32,
    pub kind: TranscriptKind,
    exons: Exons,
}

impl Transcript {
    /// Build a transcript spanning its exons. Read-derived transcripts start with
    /// a coverage of one, annotated ones with zero.
    pub fn new<S: Into<String>>(
        chrom: S,
        tid: Option<usize>,
        strand: Option<Strand>,
        exons: Exons,
        kind: TranscriptKind,
    ) -> Self {
        let start = exons.first().start;
        let end = exons.last().end;
        Self {
            tid,
            chrom: chrom.into(),
            start,
            end,
            strand,
            name: None,
            cov: if kind == TranscriptKind::Annotated { 0 } else { 1 },
            kind,
            exons,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn exons(&self) -> &[Exon] {
        self.exons.as_ref()
    }

    pub fn exon_n(&self) -> usize {
        self.exons.0.len()
    }

    /// Sum of the exon lengths.
    pub fn len(&self) -> u64 {
        self.exons().iter().map(|x| x.len()).sum()
    }

    pub fn is_annotated(&self) -> bool {
        self.kind == TranscriptKind::Annotated
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from(self.strand)
    }

    /// Splice junctions in transcription order.
    pub fn junctions(&self) -> Vec<Junction> {
        let orientation = self.orientation();
        let mut junctions = self
            .exons()
            .iter()
            .tuple_windows()
            .map(|(left, right)| orientation.junction(left, right))
            .collect::<Vec<_>>();
        if orientation == Orientation::Reverse {
            junctions.reverse();
        }
        junctions
    }

    /// Exons in transcription order.
    pub fn exons_5p_to_3p(&self) -> impl Iterator<Item = &Exon> + '_ {
        let orientation = self.orientation();
        let n = self.exon_n();
        (0..n).map(move |i| &self.exons()[orientation.exon_index(i, n)])
    }

    /// Extend the outer boundaries of the first and last exons so that the
    /// transcript covers `start..=end`. Internal splice sites are untouched.
    pub(crate) fn extend_to(&mut self, start: u64, end: u64) {
        if start < self.start {
            self.exons.0[0].start = start;
            self.start = start;
        }
        if end > self.end {
            let last = self.exons.0.len() - 1;
            self.exons.0[last].end = end;
            self.end = end;
        }
    }
}

/// Maps the 5'→3' order of a transcript onto the genomic order of its exons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl From<Option<Strand>> for Orientation {
    fn from(strand: Option<Strand>) -> Self {
        match strand {
            Some(Strand::Reverse) => Orientation::Reverse,
            _ => Orientation::Forward,
        }
    }
}

impl Orientation {
    /// Genomic index of the `i`-th exon counted from the 5' end.
    pub fn exon_index(self, i: usize, exon_n: usize) -> usize {
        match self {
            Orientation::Forward => i,
            Orientation::Reverse => exon_n - 1 - i,
        }
    }

    /// Junction between two exons adjacent in genomic order.
    pub fn junction(self, left: &Exon, right: &Exon) -> Junction {
        match self {
            Orientation::Forward => Junction { donor: left.end, acceptor: right.start },
            Orientation::Reverse => Junction { donor: right.start, acceptor: left.end },
        }
    }
}

/// Exon boundaries flanking one intron: the last base of the upstream exon
/// (donor side) and the first base of the downstream exon (acceptor side),
/// upstream and downstream taken in transcription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Junction {
    pub donor: u64,
    pub acceptor: u64,
}

impl Junction {
    pub fn is_within(&self, other: &Junction, distance: u64) -> bool {
        self.donor.abs_diff(other.donor) <= distance
            && self.acceptor.abs_diff(other.acceptor) <= distance
    }
}

/// Non-empty list of exons, sorted and non-overlapping.
#[derive(Debug, Clone)]
pub struct Exons(Vec<Exon>);

impl Exons {
    pub fn new(iter: impl IntoIterator<Item = (u64, u64)>) -> Result<Self> {
        let mut prev_end = None;
        let exons = iter
            .into_iter()
            .map(|(start, end)| {
                ensure!(
                    prev_end.map_or(true, |prev| start > prev),
                    "Exons must be non-overlapping and in order"
                );
                ensure!(
                    end >= start,
                    "End coordinate must not be less than start coordinate"
                );
                prev_end = Some(end);
                Ok(Exon { start, end })
            })
            .collect::<Result<Vec<_>>>()?;
        ensure!(!exons.is_empty(), "A transcript must have at least one exon");
        Ok(Self(exons))
    }

    /// Like [`Exons::new`], but accepts exons in any order (GTF lists
    /// minus-strand exons from 5' to 3').
    pub fn from_unsorted(iter: impl IntoIterator<Item = (u64, u64)>) -> Result<Self> {
        Self::new(iter.into_iter().sorted_unstable())
    }

    fn first(&self) -> &Exon {
        &self.0[0]
    }

    fn last(&self) -> &Exon {
        &self.0[self.0.len() - 1]
    }
}

impl AsRef<[Exon]> for Exons {
    fn as_ref(&self) -> &[Exon] {
        &self.0
    }
}

/// Exon coordinates are 1-based, inclusive.
#[derive(Eq, PartialEq, Debug, Clone, Ord, PartialOrd)]
pub struct Exon {
    start: u64,
    end: u64,
}

impl Exon {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
    pub fn start(&self) -> u64 {
        self.start
    }
    pub fn end(&self) -> u64 {
        self.end
    }
    pub fn overlaps(&self, other: &Exon) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Gene record with its transcripts. Transcripts read from the annotation come
/// first; those accepted from the alignments are appended after them.
#[derive(Debug, Clone)]
pub struct Gene {
    pub tid: Option<usize>,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Option<Strand>,
    pub name: String,
    transcripts: Vec<Transcript>,
    anno_tran_n: usize,
}

impl Gene {
    pub fn new<S: Into<String>, C: Into<String>>(
        name: S,
        chrom: C,
        tid: Option<usize>,
        start: u64,
        end: u64,
        strand: Option<Strand>,
    ) -> Self {
        Self {
            tid,
            chrom: chrom.into(),
            start,
            end,
            strand,
            name: name.into(),
            transcripts: Vec::new(),
            anno_tran_n: 0,
        }
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub(crate) fn transcripts_mut(&mut self) -> &mut [Transcript] {
        &mut self.transcripts
    }

    /// Number of transcripts that came from the input annotation.
    pub fn anno_tran_n(&self) -> usize {
        self.anno_tran_n
    }

    /// Transcripts accepted during this run, in acceptance order.
    pub fn new_transcripts(&self) -> &[Transcript] {
        &self.transcripts[self.anno_tran_n..]
    }

    pub fn is_annotated_index(&self, i: usize) -> bool {
        i < self.anno_tran_n
    }

    /// Add a transcript read from the annotation. Must happen before any
    /// transcript is accepted from the alignments.
    pub(crate) fn add_annotated(&mut self, transcript: Transcript) {
        debug_assert_eq!(self.anno_tran_n, self.transcripts.len());
        self.expand(transcript.start, transcript.end);
        self.transcripts.push(transcript);
        self.anno_tran_n += 1;
    }

    pub(crate) fn add_transcript(&mut self, transcript: Transcript) {
        self.expand(transcript.start, transcript.end);
        self.transcripts.push(transcript);
    }

    pub(crate) fn expand(&mut self, start: u64, end: u64) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
    }
}

/// Genes on one reference sequence that chain-overlap, together with the
/// verbatim annotation lines they were read from.
///
/// `start` and `end` span the genes as read from the annotation. They route
/// alignments to groups and do not follow transcripts accepted later.
#[derive(Debug, Clone)]
pub struct GeneGroup {
    pub tid: Option<usize>,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    genes: Vec<Gene>,
    lines: Vec<String>,
    line_counts: Vec<usize>,
}

impl GeneGroup {
    pub fn new(gene: Gene, lines: Vec<String>) -> Self {
        let mut group = Self {
            tid: gene.tid,
            chrom: gene.chrom.clone(),
            start: gene.start,
            end: gene.end,
            genes: Vec::new(),
            lines: Vec::new(),
            line_counts: Vec::new(),
        };
        group.push(gene, lines);
        group
    }

    /// Whether a gene starting at `start` on `chrom` chains onto this group.
    pub fn accepts(&self, chrom: &str, start: u64) -> bool {
        chrom == self.chrom && start <= self.end
    }

    pub fn push(&mut self, gene: Gene, lines: Vec<String>) {
        self.start = self.start.min(gene.start);
        self.end = self.end.max(gene.end);
        self.line_counts.push(lines.len());
        self.lines.extend(lines);
        self.genes.push(gene);
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub(crate) fn genes_mut(&mut self) -> &mut [Gene] {
        &mut self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_counts(&self) -> &[usize] {
        &self.line_counts
    }

    /// Each gene paired with its annotation lines, in file order.
    pub fn genes_with_lines(&self) -> impl Iterator<Item = (&Gene, &[String])> + '_ {
        let mut offset = 0;
        self.genes.iter().zip(self.line_counts.iter()).map(move |(gene, n)| {
            let lines = &self.lines[offset..offset + n];
            offset += n;
            (gene, lines)
        })
    }

    /// Append an accepted transcript to gene `i`. The group span is unchanged.
    pub(crate) fn add_transcript(&mut self, i: usize, transcript: Transcript) {
        self.genes[i].add_transcript(transcript);
    }
}
