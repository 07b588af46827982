use std::str::FromStr;

use bed_utils::bed::Strand;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing {0} column")]
    MissingField(&'static str),
    #[error("invalid start position: {0}")]
    InvalidStartPosition(lexical::Error),
    #[error("invalid end position: {0}")]
    InvalidEndPosition(lexical::Error),
    #[error("invalid range: start {start} > end {end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("invalid strand: {0}")]
    InvalidStrand(String),
}

/// The feature types the model understands. Everything else is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    Gene,
    Transcript,
    Exon,
    Other(String),
}

impl From<&str> for Feature {
    fn from(s: &str) -> Self {
        match s {
            "gene" => Feature::Gene,
            "transcript" => Feature::Transcript,
            "exon" => Feature::Exon,
            _ => Feature::Other(s.to_string()),
        }
    }
}

/// One tokenized GTF line. Coordinates are 1-based, inclusive.
#[derive(Debug, Clone)]
pub struct GtfRecord {
    pub seqname: String,
    pub source: String,
    pub feature: Feature,
    pub start: u64,
    pub end: u64,
    pub strand: Option<Strand>,
    pub attributes: String,
}

impl GtfRecord {
    /// Value of a `key "value";` attribute, without quotes.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        attribute(&self.attributes, key)
    }
}

impl FromStr for GtfRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end_matches(&['\n', '\r'][..]);
        let mut fields = s.split('\t');
        let seqname = fields
            .next()
            .filter(|x| !x.is_empty())
            .ok_or(ParseError::MissingField("seqname"))?
            .to_string();
        let source = fields.next().ok_or(ParseError::MissingField("source"))?.to_string();
        let feature = fields.next().ok_or(ParseError::MissingField("feature"))?.into();
        let start: u64 = fields
            .next()
            .ok_or(ParseError::MissingField("start"))
            .and_then(|s| lexical::parse(s).map_err(ParseError::InvalidStartPosition))?;
        let end: u64 = fields
            .next()
            .ok_or(ParseError::MissingField("end"))
            .and_then(|s| lexical::parse(s).map_err(ParseError::InvalidEndPosition))?;
        if start > end {
            return Err(ParseError::InvalidRange { start, end });
        }
        let _score = fields.next().ok_or(ParseError::MissingField("score"))?;
        let strand = fields
            .next()
            .ok_or(ParseError::MissingField("strand"))
            .and_then(parse_strand)?;
        let _frame = fields.next().ok_or(ParseError::MissingField("frame"))?;
        let attributes = fields.next().ok_or(ParseError::MissingField("attributes"))?.to_string();
        Ok(GtfRecord {
            seqname,
            source,
            feature,
            start,
            end,
            strand,
            attributes,
        })
    }
}

fn parse_strand(s: &str) -> Result<Option<Strand>, ParseError> {
    match s {
        "+" => Ok(Some(Strand::Forward)),
        "-" => Ok(Some(Strand::Reverse)),
        "." | "?" => Ok(None),
        _ => Err(ParseError::InvalidStrand(s.to_string())),
    }
}

pub(crate) fn strand_char(strand: Option<Strand>) -> char {
    match strand {
        Some(Strand::Forward) => '+',
        Some(Strand::Reverse) => '-',
        None => '.',
    }
}

/// Comment and blank lines carry no record.
pub fn is_comment(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

fn attribute<'a>(attributes: &'a str, key: &str) -> Option<&'a str> {
    attributes.split(';').find_map(|part| {
        let mut kv = part.trim().splitn(2, char::is_whitespace);
        if kv.next()? != key {
            return None;
        }
        let value = kv.next()?.trim();
        let value = value.strip_prefix('"').unwrap_or(value);
        Some(value.strip_suffix('"').unwrap_or(value))
    })
}
