use std::{fs::File, io::{BufRead, BufReader, BufWriter, Read, Write}, path::{Path, PathBuf}};
use anyhow::{Context, Result, anyhow};

/// Open a file for reading, possibly compressed. Supports gzip and zstd.
pub fn open_file_for_read<P: AsRef<Path>>(file: P) -> Result<Box<dyn Read>> {
    let path = file.as_ref();
    let open = || File::open(path).with_context(|| format!("cannot open file: {}", path.display()));
    let reader: Box<dyn Read> = match detect_compression(path)? {
        Some(Compression::Gzip) => Box::new(flate2::read::MultiGzDecoder::new(open()?)),
        Some(Compression::Zstd) => Box::new(zstd::stream::read::Decoder::new(open()?)?),
        None => Box::new(open()?),
    };
    Ok(reader)
}

/// Buffered line reader over a possibly compressed file.
pub fn open_buffered<P: AsRef<Path>>(file: P) -> Result<Box<dyn BufRead>> {
    Ok(Box::new(BufReader::new(open_file_for_read(file)?)))
}

/// Determine the file compression type. Gzip is detected from the magic bytes,
/// zstd from the `.zst` extension.
fn detect_compression<P: AsRef<Path>>(file: P) -> Result<Option<Compression>> {
    let path = file.as_ref();
    let handle = File::open(path).with_context(|| format!("cannot open file: {}", path.display()))?;
    if flate2::read::MultiGzDecoder::new(handle).header().is_some() {
        Ok(Some(Compression::Gzip))
    } else if path.extension().is_some_and(|ext| ext == "zst") {
        Ok(Some(Compression::Zstd))
    } else {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
}

impl TryFrom<&PathBuf> for Compression {
    type Error = anyhow::Error;

    fn try_from(path: &PathBuf) -> Result<Self> {
        let ext = path.extension().unwrap_or(std::ffi::OsStr::new(""));
        if ext == "gz" {
            Ok(Compression::Gzip)
        } else if ext == "zst" {
            Ok(Compression::Zstd)
        } else {
            Err(anyhow!("unsupported compression: {:?}", path))
        }
    }
}

/// Create `filename` for writing, compressed with gzip (level 6) or zstd (level 9) when asked.
pub fn open_file_for_write<P: AsRef<Path>>(
    filename: P,
    compression: Option<Compression>,
) -> Result<Box<dyn Write + Send>> {
    let buffer = BufWriter::new(
        File::create(&filename).with_context(|| format!("cannot create file: {}", filename.as_ref().display()))?
    );
    let writer: Box<dyn Write + Send> = match compression {
        None => Box::new(buffer),
        Some(Compression::Gzip) => Box::new(flate2::write::GzEncoder::new(buffer, flate2::Compression::new(6))),
        Some(Compression::Zstd) => Box::new(zstd::stream::Encoder::new(buffer, 9)?.auto_finish()),
    };
    Ok(writer)
}
