use anyhow::{bail, Context, Result};
use bed_utils::bed::Strand;
use bstr::ByteSlice;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::tag::Tag;
use noodles::sam::alignment::record_buf::data::field::value::Value;
use noodles::sam::alignment::record_buf::RecordBuf;

use super::model::{Exons, Transcript, TranscriptKind};
use crate::genome::ReferenceIndex;

impl Transcript {
    /// Build a transcript from a mapped alignment. Exons are the reference
    /// blocks between `N` operations of the CIGAR string.
    pub fn from_alignment(record: &RecordBuf, index: &ReferenceIndex) -> Result<Self> {
        let name = record.name().map(|x| x.to_str_lossy().into_owned());
        let tid = record
            .reference_sequence_id()
            .with_context(|| format!("alignment {:?} has no reference sequence", name))?;
        let chrom = index
            .get_name(tid)
            .with_context(|| format!("reference sequence id {} is not in the header", tid))?;
        let start = record
            .alignment_start()
            .with_context(|| format!("alignment {:?} has no start position", name))?
            .get() as u64;

        let exons = Exons::new(exon_blocks(record, start)?)
            .with_context(|| format!("invalid exon structure in alignment {:?}", name))?;
        let transcript = Transcript::new(chrom, Some(tid), Some(strand_of(record)), exons, TranscriptKind::Novel);
        Ok(match name {
            Some(name) => transcript.with_name(name),
            None => transcript,
        })
    }
}

fn exon_blocks(record: &RecordBuf, start: u64) -> Result<Vec<(u64, u64)>> {
    let mut blocks = Vec::new();
    let mut block_start = start;
    let mut pos = start;
    for op in record.cigar().as_ref() {
        let len = op.len() as u64;
        match op.kind() {
            Kind::Skip => {
                if pos > block_start {
                    blocks.push((block_start, pos - 1));
                }
                pos += len;
                block_start = pos;
            }
            Kind::Match | Kind::Deletion | Kind::SequenceMatch | Kind::SequenceMismatch => pos += len,
            Kind::Insertion | Kind::SoftClip | Kind::HardClip | Kind::Pad => {}
        }
    }
    if pos > block_start {
        blocks.push((block_start, pos - 1));
    }
    if blocks.is_empty() {
        bail!("alignment consumes no reference bases");
    }
    Ok(blocks)
}

/// `XS:A` gives the transcript strand directly. `ts:A` (minimap2) gives it
/// relative to the read. Without either, the alignment orientation is used.
fn strand_of(record: &RecordBuf) -> Strand {
    let data = record.data();
    let reverse = record.flags().is_reverse_complemented();
    match data.get(&Tag::new(b'X', b'S')) {
        Some(Value::Character(b'+')) => return Strand::Forward,
        Some(Value::Character(b'-')) => return Strand::Reverse,
        _ => {}
    }
    match (data.get(&Tag::new(b't', b's')), reverse) {
        (Some(Value::Character(b'+')), false) | (Some(Value::Character(b'-')), true) => Strand::Forward,
        (Some(Value::Character(b'+')), true) | (Some(Value::Character(b'-')), false) => Strand::Reverse,
        (_, true) => Strand::Reverse,
        (_, false) => Strand::Forward,
    }
}
