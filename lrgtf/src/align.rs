use std::fs::File;
use std::io::{self, BufRead, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::{bam, sam};

use crate::genome::ReferenceIndex;
use crate::io::open_buffered;
use crate::transcript::Transcript;

/// Readers that decode alignment records into a reusable [`RecordBuf`].
pub trait ReadRecordBuf {
    /// Returns the number of bytes read; zero at end of input.
    fn read_record_buf(&mut self, header: &sam::Header, record: &mut RecordBuf) -> io::Result<usize>;
}

impl<R: Read> ReadRecordBuf for bam::io::Reader<R> {
    fn read_record_buf(&mut self, header: &sam::Header, record: &mut RecordBuf) -> io::Result<usize> {
        bam::io::Reader::read_record_buf(self, header, record)
    }
}

impl<R: BufRead> ReadRecordBuf for sam::io::Reader<R> {
    fn read_record_buf(&mut self, header: &sam::Header, record: &mut RecordBuf) -> io::Result<usize> {
        sam::io::Reader::read_record_buf(self, header, record)
    }
}

/// SAM or BAM input together with its header.
pub struct AlignmentReader {
    inner: Box<dyn ReadRecordBuf>,
    header: sam::Header,
}

impl AlignmentReader {
    pub fn new<R: ReadRecordBuf + 'static>(reader: R, header: sam::Header) -> Self {
        Self {
            inner: Box::new(reader),
            header,
        }
    }

    /// Files named `*.sam`, optionally compressed, are read as SAM; everything else as BAM.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if is_sam(path) {
            let mut reader = sam::io::Reader::new(open_buffered(path)?);
            let header = reader
                .read_header()
                .with_context(|| format!("failed to read SAM header: {}", path.display()))?;
            Ok(Self::new(reader, header))
        } else {
            let file = File::open(path).with_context(|| format!("cannot open file: {}", path.display()))?;
            let mut reader = bam::io::Reader::new(file);
            let header = reader
                .read_header()
                .with_context(|| format!("failed to read BAM header: {}", path.display()))?;
            Ok(Self::new(reader, header))
        }
    }

    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    /// Read the next record into `record`. Returns `false` at end of input.
    pub fn read_record(&mut self, record: &mut RecordBuf) -> io::Result<bool> {
        Ok(self.inner.read_record_buf(&self.header, record)? != 0)
    }
}

fn is_sam(path: &Path) -> bool {
    let name = path.file_name().map(|x| x.to_string_lossy()).unwrap_or_default();
    [".sam", ".sam.gz", ".sam.zst"].iter().any(|ext| name.ends_with(ext))
}

/// Primary, mapped alignments converted to transcripts in file order.
pub struct TranscriptStream {
    reader: AlignmentReader,
    index: ReferenceIndex,
    record: RecordBuf,
    last_pos: Option<(usize, u64)>,
    records: u64,
    skipped: u64,
}

impl TranscriptStream {
    pub fn new(reader: AlignmentReader) -> Self {
        let index = ReferenceIndex::new(reader.header());
        Self {
            reader,
            index,
            record: RecordBuf::default(),
            last_pos: None,
            records: 0,
            skipped: 0,
        }
    }

    pub fn reference_index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Number of alignment records read so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Records that did not yield a transcript: unmapped, secondary,
    /// supplementary, or without a usable alignment.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Next usable transcript, `None` at end of input. Fails if the
    /// alignments are not sorted by coordinate.
    pub fn next_transcript(&mut self) -> Result<Option<Transcript>> {
        loop {
            let more = self
                .reader
                .read_record(&mut self.record)
                .with_context(|| format!("failed to read alignment record {}", self.records + 1))?;
            if !more {
                return Ok(None);
            }
            self.records += 1;

            let flags = self.record.flags();
            if flags.is_unmapped() || flags.is_secondary() || flags.is_supplementary() {
                self.skipped += 1;
                continue;
            }
            let transcript = match Transcript::from_alignment(&self.record, &self.index) {
                Ok(transcript) => transcript,
                Err(e) => {
                    warn!("Skipping alignment record {}: {:#}", self.records, e);
                    self.skipped += 1;
                    continue;
                }
            };

            if let Some(tid) = transcript.tid {
                let pos = (tid, transcript.start);
                if self.last_pos.is_some_and(|last| pos < last) {
                    bail!(
                        "alignments must be sorted by coordinate, record {} ({}:{}) is out of order",
                        self.records,
                        transcript.chrom,
                        transcript.start
                    );
                }
                self.last_pos = Some(pos);
            }
            return Ok(Some(transcript));
        }
    }
}
