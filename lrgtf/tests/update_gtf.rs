use std::io::Write;
use std::path::{Path, PathBuf};

use lrgtf::{GtfUpdater, UpdateParams};

const SAM: &str = "\
@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:100000
@SQ\tSN:chr2\tLN:100000
r0\t0\tchr1\t500\t60\t30M\t*\t0\t0\t*\t*
r1\t0\tchr1\t1050\t60\t151M799N201M2599N101M\t*\t0\t0\t*\t*
r2\t0\tchr1\t1100\t60\t101M799N101M899N101M\t*\t0\t0\t*\t*
r3\t0\tchr1\t1100\t60\t101M799N101M899N101M\t*\t0\t0\t*\t*
r4\t16\tchr1\t20050\t60\t251M499N151M\t*\t0\t0\t*\t*
r5\t16\tchr1\t20100\t60\t101M399N351M\t*\t0\t0\t*\t*
r6\t256\tchr1\t20200\t0\t50M\t*\t0\t0\t*\t*
r7\t0\tchr2\t200\t60\t50M\t*\t0\t0\t*\t*
r8\t0\tchr2\t5000\t60\t30M\t*\t0\t0\t*\t*
";

const GTF: &str = "\
#!genome-build test
chr1\tsrc\tgene\t1000\t5000\t.\t+\t.\tgene_id \"G1\";
chr1\tsrc\ttranscript\t1000\t5000\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t1000\t1200\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t2000\t2200\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t4800\t5000\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\tgene\t20000\t21000\t.\t-\t.\tgene_id \"G2\";
chr1\tsrc\ttranscript\t20000\t21000\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\";
chr1\tsrc\texon\t20800\t21000\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\";
chr1\tsrc\texon\t20000\t20300\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\";
chr2\tsrc\tgene\t100\t500\t.\t+\t.\tgene_id \"G3\";
chr2\tsrc\ttranscript\t100\t500\t.\t+\t.\tgene_id \"G3\"; transcript_id \"T3\";
chr2\tsrc\texon\t100\t500\t.\t+\t.\tgene_id \"G3\"; transcript_id \"T3\";
";

fn write_inputs(dir: &Path, gtf_name: &str) -> (PathBuf, PathBuf) {
    let sam = dir.join("reads.sam");
    std::fs::write(&sam, SAM).unwrap();
    let gtf = dir.join(gtf_name);
    if gtf_name.ends_with(".gz") {
        let file = std::fs::File::create(&gtf).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(GTF.as_bytes()).unwrap();
        encoder.finish().unwrap();
    } else {
        std::fs::write(&gtf, GTF).unwrap();
    }
    (sam, gtf)
}

fn run(params: UpdateParams, gtf_name: &str) -> (GtfUpdater, String, String) {
    let dir = tempfile::tempdir().unwrap();
    let (sam, gtf) = write_inputs(dir.path(), gtf_name);
    let mut output = Vec::new();
    let mut full = Vec::new();
    let mut updater = GtfUpdater::new(params);
    updater
        .run(&sam, &gtf, &mut output, Some(&mut full as &mut dyn Write))
        .unwrap();
    (
        updater,
        String::from_utf8(output).unwrap(),
        String::from_utf8(full).unwrap(),
    )
}

fn novel_r2() -> Vec<&'static str> {
    vec![
        "chr1\tNONE\ttranscript\t1100\t3100\t.\t+\t.\tgene_id \"G1\"; transcript_id \"r2\"; cov \"2\";\n",
        "chr1\tNONE\texon\t1100\t1200\t.\t+\t.\tgene_id \"G1\"; transcript_id \"r2\"; exon_number \"1\"; cov \"2\";\n",
        "chr1\tNONE\texon\t2000\t2100\t.\t+\t.\tgene_id \"G1\"; transcript_id \"r2\"; exon_number \"2\"; cov \"2\";\n",
        "chr1\tNONE\texon\t3000\t3100\t.\t+\t.\tgene_id \"G1\"; transcript_id \"r2\"; exon_number \"3\"; cov \"2\";\n",
    ]
}

#[test]
fn test_novel_isoform_is_inserted_after_its_gene() {
    let (updater, output, _) = run(UpdateParams::default(), "anno.gtf");

    let lines = GTF.split_inclusive('\n').collect::<Vec<_>>();
    let expected = [&lines[..6], &novel_r2()[..], &lines[6..]].concat().concat();
    assert_eq!(output, expected);

    let qc = updater.qc();
    assert_eq!(qc.alignments, 9);
    assert_eq!(qc.skipped_alignments, 1);
    assert_eq!(qc.transcripts, 8);
    assert_eq!(qc.merged, 3);
    assert_eq!(qc.novel, 1);
    assert_eq!(qc.unclassified, 0);
    assert_eq!(qc.dropped, 2);
    assert_eq!(qc.intergenic(), 2);
    assert_eq!((qc.gene_groups, qc.genes), (3, 3));
    assert_eq!(qc.malformed_lines, 0);
}

#[test]
fn test_unclassified_transcripts_are_reported_on_request() {
    let params = UpdateParams::default()
        .with_report_unclassified(true)
        .with_source("PB");
    let (updater, output, _) = run(params, "anno.gtf");
    assert_eq!(updater.qc().unclassified, 1);

    let added = output
        .lines()
        .filter(|line| line.contains("\tPB\t"))
        .collect::<Vec<_>>();
    assert_eq!(added.len(), 7);
    assert_eq!(
        added[4],
        "chr1\tPB\ttranscript\t20100\t20950\t.\t-\t.\tgene_id \"UNCLASSIFIED\"; transcript_id \"r5\"; ref_gene_id \"G2\"; cov \"1\";"
    );
    assert!(added[5].starts_with("chr1\tPB\texon\t20600\t20950\t"));
    assert!(added[6].starts_with("chr1\tPB\texon\t20100\t20200\t"));

    // the unclassified transcript follows the lines of G2 and precedes G3
    let pos_r5 = output.find("transcript_id \"r5\"").unwrap();
    assert!(pos_r5 > output.find("transcript_id \"T2\"").unwrap());
    assert!(pos_r5 < output.find("gene_id \"G3\"").unwrap());
}

#[test]
fn test_full_gtf_lists_every_primary_alignment() {
    let (_, _, full) = run(UpdateParams::default(), "anno.gtf");
    let transcripts = full
        .lines()
        .filter(|line| line.split('\t').nth(2) == Some("transcript"))
        .map(|line| line.split('"').nth(1).unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(transcripts, vec!["r0", "r1", "r2", "r3", "r4", "r5", "r7", "r8"]);
    assert!(full.contains("chr2\tNONE\texon\t5000\t5029\t.\t+\t.\tgene_id \"r8\"; transcript_id \"r8\"; exon_number \"1\"; cov \"1\";\n"));
}

#[test]
fn test_gzip_annotation() {
    let (_, plain, _) = run(UpdateParams::default(), "anno.gtf");
    let (_, gzipped, _) = run(UpdateParams::default(), "anno.gtf.gz");
    assert_eq!(plain, gzipped);
}

#[test]
fn test_annotation_left_over_after_last_alignment() {
    let dir = tempfile::tempdir().unwrap();
    let sam = dir.path().join("reads.sam");
    std::fs::write(
        &sam,
        "@SQ\tSN:chr1\tLN:100000\n@SQ\tSN:chr2\tLN:100000\nr1\t0\tchr1\t1050\t60\t151M799N201M2599N101M\t*\t0\t0\t*\t*\n",
    )
    .unwrap();
    let gtf = dir.path().join("anno.gtf");
    std::fs::write(&gtf, GTF).unwrap();

    let mut output = Vec::new();
    let mut updater = GtfUpdater::new(UpdateParams::default());
    updater.run(&sam, &gtf, &mut output, None).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), GTF);
    assert_eq!(updater.qc().merged, 1);
}

#[test]
fn test_annotation_without_genes_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (sam, _) = write_inputs(dir.path(), "anno.gtf");
    let gtf = dir.path().join("empty.gtf");
    std::fs::write(&gtf, "#only a comment\n").unwrap();

    let mut updater = GtfUpdater::new(UpdateParams::default());
    let err = updater.run(&sam, &gtf, Vec::new(), None).unwrap_err();
    assert!(format!("{:#}", err).contains("no gene record"));
}

#[test]
fn test_reads_reach_next_group_after_novel_isoform_extends_gene() {
    let dir = tempfile::tempdir().unwrap();
    let sam = dir.path().join("reads.sam");
    std::fs::write(
        &sam,
        "\
@SQ\tSN:chr1\tLN:100000
r1\t0\tchr1\t1000\t60\t201M599N101M499N101M\t*\t0\t0\t*\t*
r2\t0\tchr1\t2150\t60\t151M499N101M49N51M\t*\t0\t0\t*\t*
",
    )
    .unwrap();
    let gtf = dir.path().join("anno.gtf");
    std::fs::write(
        &gtf,
        "\
chr1\tsrc\tgene\t1000\t2000\t.\t+\t.\tgene_id \"A\";
chr1\tsrc\ttranscript\t1000\t2000\t.\t+\t.\tgene_id \"A\"; transcript_id \"TA\";
chr1\tsrc\texon\t1000\t1200\t.\t+\t.\tgene_id \"A\"; transcript_id \"TA\";
chr1\tsrc\texon\t1800\t2000\t.\t+\t.\tgene_id \"A\"; transcript_id \"TA\";
chr1\tsrc\tgene\t2100\t3000\t.\t+\t.\tgene_id \"B\";
chr1\tsrc\ttranscript\t2100\t3000\t.\t+\t.\tgene_id \"B\"; transcript_id \"TB\";
chr1\tsrc\texon\t2100\t2300\t.\t+\t.\tgene_id \"B\"; transcript_id \"TB\";
chr1\tsrc\texon\t2800\t3000\t.\t+\t.\tgene_id \"B\"; transcript_id \"TB\";
",
    )
    .unwrap();

    let mut output = Vec::new();
    let mut updater = GtfUpdater::new(UpdateParams::default());
    updater.run(&sam, &gtf, &mut output, None).unwrap();
    let output = String::from_utf8(output).unwrap();

    // r1 runs past the end of A, r2 still lands in B
    assert!(output.contains(
        "chr1\tNONE\ttranscript\t1000\t2500\t.\t+\t.\tgene_id \"A\"; transcript_id \"r1\"; cov \"1\";\n"
    ));
    assert!(output.contains(
        "chr1\tNONE\ttranscript\t2150\t3000\t.\t+\t.\tgene_id \"B\"; transcript_id \"r2\"; cov \"1\";\n"
    ));
    let pos_r1 = output.find("transcript_id \"r1\"").unwrap();
    let pos_r2 = output.find("transcript_id \"r2\"").unwrap();
    assert!(pos_r1 < output.find("gene_id \"B\"").unwrap());
    assert!(pos_r2 > output.find("transcript_id \"TB\"").unwrap());

    let qc = updater.qc();
    assert_eq!(qc.novel, 2);
    assert_eq!(qc.dropped, 0);
    assert_eq!(qc.gene_groups, 2);
}
