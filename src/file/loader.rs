//! Captured output loading.
//!
//! Generator output is usually redirected to a file or piped into docquery.
//! CI systems often archive logs gzipped, so both sources accept gzip.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads captured generator output from a file.
///
/// Files with a `.gz` extension are decompressed.
///
/// # Examples
///
/// ```no_run
/// use docquery::file::loader::read_captured_file;
///
/// let raw = read_captured_file("init-stdout.yml").unwrap();
/// ```
///
/// # Errors
///
/// This function will return an error if:
/// - The file cannot be read (missing, permissions, etc.)
/// - A `.gz` file is not valid gzip
/// - The contents are not valid UTF-8
pub fn read_captured_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path_ref = path.as_ref();

    let is_gzipped = path_ref
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    if is_gzipped {
        read_gzipped_file(path_ref)
    } else {
        fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read {}", path_ref.display()))
    }
}

/// Reads captured generator output from standard input until EOF.
///
/// Input starting with the gzip magic bytes (0x1f 0x8b) is decompressed.
pub fn read_captured_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read from stdin")?;

    decode_bytes(buffer)
}

/// Turns raw bytes into text, gunzipping when the gzip magic is present.
pub fn decode_bytes(buffer: Vec<u8>) -> Result<String> {
    if buffer.starts_with(&[0x1f, 0x8b]) {
        decompress_gzip_bytes(&buffer)
    } else {
        String::from_utf8(buffer).context("Captured output is not valid UTF-8")
    }
}

fn read_gzipped_file<P: AsRef<Path>>(path: P) -> Result<String> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let file = fs::File::open(path).context("Failed to open gzipped file")?;
    let mut decoder = GzDecoder::new(file);
    let mut content = String::new();
    decoder
        .read_to_string(&mut content)
        .context("Failed to decompress gzipped file - file may be corrupted")?;
    Ok(content)
}

fn decompress_gzip_bytes(bytes: &[u8]) -> Result<String> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoder = GzDecoder::new(bytes);
    let mut content = String::new();
    decoder
        .read_to_string(&mut content)
        .context("Failed to decompress gzipped input")?;
    Ok(content)
}
