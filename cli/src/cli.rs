use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lrgtf::transcript::FullLength;
use lrgtf::UpdateParams;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "lrgtf", version, about = "Update GTF annotations with long-read isoforms")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add the isoforms found in sorted alignments to a sorted GTF. The updated
    /// annotation is written to stdout.
    UpdateGtf(UpdateGtfArgs),
}

#[derive(Debug, Args)]
pub struct UpdateGtfArgs {
    #[arg(value_name = "ALIGNMENTS", help = "Coordinate-sorted BAM or SAM file")]
    pub alignments: PathBuf,

    #[arg(value_name = "GTF", help = "Annotation sorted in the order of the alignment header")]
    pub annotation: PathBuf,

    #[arg(
        short = 'd',
        long = "distance",
        value_name = "INT",
        default_value_t = 10,
        help = "Largest splice-site difference at which two junctions still match"
    )]
    pub distance: u64,

    #[arg(
        short = 'l',
        long = "full-length",
        value_name = "INT",
        default_value_t = 5,
        value_parser = clap::value_parser!(u8).range(1..=5),
        help = "End agreement required before comparing junctions: 1 identical outer splice sites, 2 overlapping terminal exons, 3-5 none"
    )]
    pub full_length: u8,

    #[arg(
        short = 'u',
        long = "unclassified",
        help = "Also report transcripts that share no splice site with the annotation"
    )]
    pub unclassified: bool,

    #[arg(
        short = 's',
        long = "source",
        value_name = "STR",
        default_value = "NONE",
        help = "Source column of added GTF lines"
    )]
    pub source: String,

    #[arg(
        short = 'f',
        long = "full-gtf",
        value_name = "PATH",
        help = "Also write every alignment as a transcript to this file (.gz/.zst compressed by extension)"
    )]
    pub full_gtf: Option<PathBuf>,
}

impl UpdateGtfArgs {
    pub fn check(&self) -> Result<(), CliError> {
        validate(&self.alignments)?;
        validate(&self.annotation)?;
        if let Some(full_gtf) = &self.full_gtf {
            if full_gtf == &self.annotation || full_gtf == &self.alignments {
                return Err(CliError::InvalidInput(format!(
                    "{:?} would overwrite an input file",
                    full_gtf
                )));
            }
        }
        Ok(())
    }

    pub fn params(&self) -> Result<UpdateParams> {
        Ok(UpdateParams::default()
            .with_distance(self.distance)
            .with_full_length(FullLength::try_from(self.full_length)?)
            .with_report_unclassified(self.unclassified)
            .with_source(self.source.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Input files must exist and be non-empty.
pub fn validate(arg: &Path) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }
    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }
    if std::fs::metadata(arg)?.len() == 0 {
        return Err(CliError::InvalidInput(format!("file {:?} is empty", arg)));
    }
    Ok(())
}
