use anyhow::{bail, Result};

use super::model::{Gene, GeneGroup, Transcript, TranscriptKind};

/// How strictly the ends of two transcripts must agree before their splice
/// junctions are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullLength {
    /// The outermost splice sites are identical.
    Strict,
    /// First exons overlap and last exons overlap.
    Overlap,
    /// No requirement on the ends.
    #[default]
    Relaxed,
}

impl TryFrom<u8> for FullLength {
    type Error = anyhow::Error;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            1 => Ok(FullLength::Strict),
            2 => Ok(FullLength::Overlap),
            3..=5 => Ok(FullLength::Relaxed),
            _ => bail!("full-length level must be between 1 and 5, got {}", level),
        }
    }
}

/// Result of comparing a transcript with the transcripts of one gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneOutcome {
    /// Same intron chain as an existing transcript.
    Identical,
    /// Shares at least one splice junction with an annotated transcript.
    MatchesGene,
    /// Comparable with the gene but shares no annotated junction.
    Unclassified,
    Incomparable,
}

/// Result of comparing a transcript with a whole gene group. Indices refer to
/// genes of the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Identical,
    MatchesGene(usize),
    Unclassified(usize),
    Incomparable,
}

/// What happened to a transcript offered to a gene group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Folded into an existing transcript.
    Merged,
    /// Appended to gene `i` as a novel isoform.
    Added(usize),
    /// Appended to gene `i` as an unclassified transcript.
    AddedUnclassified(usize),
    Dropped,
}

#[derive(Debug, Clone, Copy)]
pub struct SpliceMatcher {
    distance: u64,
    full_length: FullLength,
}

impl SpliceMatcher {
    /// `distance` is the largest difference, in bases, at which two splice sites still match.
    pub fn new(distance: u64, full_length: FullLength) -> Self {
        Self { distance, full_length }
    }

    pub fn check_full(&self, t: &Transcript, u: &Transcript) -> bool {
        let (t_exons, u_exons) = (t.exons(), u.exons());
        let (t_first, t_last) = (&t_exons[0], &t_exons[t_exons.len() - 1]);
        let (u_first, u_last) = (&u_exons[0], &u_exons[u_exons.len() - 1]);
        match self.full_length {
            FullLength::Strict => t_first.end() == u_first.end() && t_last.start() == u_last.start(),
            FullLength::Overlap => t_first.overlaps(u_first) && t_last.overlaps(u_last),
            FullLength::Relaxed => true,
        }
    }

    /// Compare `t` with every transcript of `gene`. An identical match against a
    /// transcript accepted earlier in the run raises its coverage and widens its
    /// outer exons to cover `t`. The gene follows; the group span does not.
    pub fn classify_gene(&self, t: &Transcript, gene: &mut Gene) -> GeneOutcome {
        // an unstranded gene is never comparable, it is not read as `+`
        if t.exon_n() < 2 || gene.strand.is_none() || t.strand != gene.strand {
            return GeneOutcome::Incomparable;
        }
        let junctions = t.junctions();
        let mut compared = false;
        let mut shares_annotated = false;
        let mut identical = None;

        for (i, u) in gene.transcripts().iter().enumerate() {
            if !self.check_full(t, u) {
                continue;
            }
            compared = true;
            let u_junctions = u.junctions();
            let iden_n = junctions
                .iter()
                .filter(|j| u_junctions.iter().any(|k| j.is_within(k, self.distance)))
                .count();
            if iden_n > 0 && u.is_annotated() {
                shares_annotated = true;
            }
            if t.exon_n() == u.exon_n() && iden_n == junctions.len() {
                identical = Some(i);
                break;
            }
        }

        if let Some(i) = identical {
            if !gene.is_annotated_index(i) {
                let u = &mut gene.transcripts_mut()[i];
                u.cov += 1;
                u.extend_to(t.start, t.end);
                let (start, end) = (u.start, u.end);
                gene.expand(start, end);
            }
            GeneOutcome::Identical
        } else if !compared {
            GeneOutcome::Incomparable
        } else if shares_annotated {
            GeneOutcome::MatchesGene
        } else {
            GeneOutcome::Unclassified
        }
    }

    /// Compare `t` with the genes of `group` in file order.
    pub fn classify(&self, t: &Transcript, group: &mut GeneGroup) -> Outcome {
        let mut matches = None;
        let mut unclassified = None;
        let mut identical = false;
        for (i, gene) in group.genes_mut().iter_mut().enumerate() {
            match self.classify_gene(t, gene) {
                GeneOutcome::Identical => {
                    identical = true;
                    break;
                }
                GeneOutcome::MatchesGene => {
                    matches.get_or_insert(i);
                }
                GeneOutcome::Unclassified => {
                    unclassified.get_or_insert(i);
                }
                GeneOutcome::Incomparable => {}
            }
        }
        if identical {
            return Outcome::Identical;
        }
        match (matches, unclassified) {
            (Some(i), _) => Outcome::MatchesGene(i),
            (None, Some(i)) => Outcome::Unclassified(i),
            (None, None) => Outcome::Incomparable,
        }
    }

    /// Classify `t` and store it in the group when it is a new isoform.
    pub fn place(&self, mut t: Transcript, group: &mut GeneGroup, report_unclassified: bool) -> Placement {
        match self.classify(&t, group) {
            Outcome::Identical => Placement::Merged,
            Outcome::MatchesGene(i) => {
                t.kind = TranscriptKind::Novel;
                group.add_transcript(i, t);
                Placement::Added(i)
            }
            Outcome::Unclassified(i) if report_unclassified => {
                t.kind = TranscriptKind::Unclassified;
                group.add_transcript(i, t);
                Placement::AddedUnclassified(i)
            }
            Outcome::Unclassified(_) | Outcome::Incomparable => Placement::Dropped,
        }
    }
}

impl Default for SpliceMatcher {
    fn default() -> Self {
        Self::new(10, FullLength::default())
    }
}
