//! Update a reference GTF annotation with the isoforms observed in
//! coordinate-sorted long-read alignments.
//!
//! Alignments and annotation are streamed side by side. Each alignment is
//! compared with the gene group it overlaps and either merged into an existing
//! transcript, added to a gene as a novel isoform, or dropped. The annotation is
//! written back verbatim with the accepted transcripts appended to their genes.

pub mod align;
pub mod genome;
pub mod gtf;
pub mod io;
pub mod qc;
pub mod transcript;
pub mod update;

pub use update::{GtfUpdater, UpdateParams};
