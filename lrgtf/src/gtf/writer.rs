use std::io::{self, Write};

use crate::gtf::record::strand_char;
use crate::transcript::{GeneGroup, Transcript, TranscriptKind};

const UNCLASSIFIED_GENE: &str = "UNCLASSIFIED";

/// Writes annotation lines verbatim and renders accepted transcripts as GTF.
pub struct GtfWriter<W> {
    writer: W,
    source: String,
    unnamed: u64,
}

impl<W: Write> GtfWriter<W> {
    /// `source` fills the second column of every synthesized line.
    pub fn new<S: Into<String>>(writer: W, source: S) -> Self {
        Self {
            writer,
            source: source.into(),
            unnamed: 0,
        }
    }

    pub fn write_preamble(&mut self, lines: &[String]) -> io::Result<()> {
        self.write_lines(lines)
    }

    pub fn write_lines(&mut self, lines: &[String]) -> io::Result<()> {
        lines.iter().try_for_each(|line| self.writer.write_all(line.as_bytes()))
    }

    /// Each gene's annotation lines followed by the transcripts accepted into it.
    pub fn write_group(&mut self, group: &GeneGroup) -> io::Result<()> {
        for (gene, lines) in group.genes_with_lines() {
            self.write_lines(lines)?;
            for transcript in gene.new_transcripts() {
                if transcript.kind == TranscriptKind::Unclassified {
                    self.write_record(UNCLASSIFIED_GENE, Some(&gene.name), transcript)?;
                } else {
                    self.write_record(&gene.name, None, transcript)?;
                }
            }
        }
        Ok(())
    }

    /// Write `transcript` under `gene_id`, one `transcript` line and one `exon` line per exon.
    pub fn write_transcript(&mut self, gene_id: &str, transcript: &Transcript) -> io::Result<()> {
        self.write_record(gene_id, None, transcript)
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, gene_id: &str, ref_gene_id: Option<&str>, transcript: &Transcript) -> io::Result<()> {
        let transcript_id = match &transcript.name {
            Some(name) => name.clone(),
            None => {
                self.unnamed += 1;
                format!("{}.{}", self.source, self.unnamed)
            }
        };
        let mut ids = format!("gene_id \"{}\"; transcript_id \"{}\";", gene_id, transcript_id);
        if let Some(host) = ref_gene_id {
            ids.push_str(&format!(" ref_gene_id \"{}\";", host));
        }
        let strand = strand_char(transcript.strand);

        writeln!(
            self.writer,
            "{}\t{}\ttranscript\t{}\t{}\t.\t{}\t.\t{} cov \"{}\";",
            transcript.chrom, self.source, transcript.start, transcript.end, strand, ids, transcript.cov,
        )?;
        for (i, exon) in transcript.exons_5p_to_3p().enumerate() {
            writeln!(
                self.writer,
                "{}\t{}\texon\t{}\t{}\t.\t{}\t.\t{} exon_number \"{}\"; cov \"{}\";",
                transcript.chrom,
                self.source,
                exon.start(),
                exon.end(),
                strand,
                ids,
                i + 1,
                transcript.cov,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Exons, Gene};
    use bed_utils::bed::Strand;

    fn read(name: Option<&str>, exons: &[(u64, u64)], strand: Strand, kind: TranscriptKind) -> Transcript {
        let t = Transcript::new("chr1", Some(0), Some(strand), Exons::new(exons.iter().copied()).unwrap(), kind);
        match name {
            Some(name) => t.with_name(name),
            None => t,
        }
    }

    fn output(writer: GtfWriter<Vec<u8>>) -> Vec<String> {
        String::from_utf8(writer.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_minus_strand_exons_are_numbered_5p_to_3p() {
        let mut writer = GtfWriter::new(Vec::new(), "NONE");
        let t = read(Some("r1"), &[(100, 200), (300, 400)], Strand::Reverse, TranscriptKind::Novel);
        writer.write_transcript("r1", &t).unwrap();
        assert_eq!(
            output(writer),
            vec![
                "chr1\tNONE\ttranscript\t100\t400\t.\t-\t.\tgene_id \"r1\"; transcript_id \"r1\"; cov \"1\";",
                "chr1\tNONE\texon\t300\t400\t.\t-\t.\tgene_id \"r1\"; transcript_id \"r1\"; exon_number \"1\"; cov \"1\";",
                "chr1\tNONE\texon\t100\t200\t.\t-\t.\tgene_id \"r1\"; transcript_id \"r1\"; exon_number \"2\"; cov \"1\";",
            ]
        );
    }

    #[test]
    fn test_group_appends_new_transcripts_after_gene_lines() {
        let mut gene = Gene::new("G", "chr1", Some(0), 100, 400, Some(Strand::Forward));
        gene.add_annotated(read(Some("anno"), &[(100, 200), (300, 400)], Strand::Forward, TranscriptKind::Annotated));
        let mut group = GeneGroup::new(gene, vec!["gene line\n".into(), "exon line\n".into()]);
        group.push(Gene::new("H", "chr1", Some(0), 350, 900, Some(Strand::Forward)), vec!["H line\n".into()]);
        group.add_transcript(0, read(None, &[(100, 200), (250, 400)], Strand::Forward, TranscriptKind::Novel));
        group.add_transcript(1, read(Some("u1"), &[(500, 600), (700, 800)], Strand::Forward, TranscriptKind::Unclassified));

        let mut writer = GtfWriter::new(Vec::new(), "PB");
        writer.write_group(&group).unwrap();
        let lines = output(writer);
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "gene line");
        assert_eq!(lines[1], "exon line");
        assert_eq!(
            lines[2],
            "chr1\tPB\ttranscript\t100\t400\t.\t+\t.\tgene_id \"G\"; transcript_id \"PB.1\"; cov \"1\";"
        );
        assert_eq!(lines[5], "H line");
        assert_eq!(
            lines[6],
            "chr1\tPB\ttranscript\t500\t800\t.\t+\t.\tgene_id \"UNCLASSIFIED\"; transcript_id \"u1\"; ref_gene_id \"H\"; cov \"1\";"
        );
        assert!(lines[8].contains("exon_number \"2\"; cov \"1\";"));
    }
}
