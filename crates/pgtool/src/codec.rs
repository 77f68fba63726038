//! Streaming gzip codec for dump artifacts.
//!
//! Both directions copy through fixed-size buffers, so memory use does not
//! grow with the size of the dump. The format is always gzip; nothing here
//! inspects magic bytes or negotiates a codec.

use std::io::{self, Read, Write};
use std::path::Path;

use cap_std::fs::Dir;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

/// Decoded bytes pulled from an artifact before its payload file is created.
const HEAD_BYTES: usize = 8 * 1024;

/// Compress everything readable from `source` into `destination`.
///
/// The encoder is finished, writing the gzip trailer, before the destination
/// is flushed and handed back.
///
/// # Errors
///
/// Returns any I/O error raised while reading, encoding, or writing.
///
/// # Examples
///
/// ```
/// use pgtool::codec::{compress, decompress};
///
/// let (_, compressed) = compress(&b"PGDMP"[..], Vec::new()).expect("compress");
/// let mut restored = Vec::new();
/// decompress(compressed.as_slice(), &mut restored).expect("decompress");
///
/// assert_eq!(restored, b"PGDMP");
/// ```
pub fn compress<R, W>(mut source: R, destination: W) -> io::Result<(u64, W)>
where
    R: Read,
    W: Write,
{
    let mut encoder = GzEncoder::new(destination, Compression::default());
    let copied = io::copy(&mut source, &mut encoder)?;
    let mut destination = encoder.finish()?;
    destination.flush()?;
    Ok((copied, destination))
}

/// Decompress a gzip stream from `source` into `destination`.
///
/// Concatenated gzip members are decoded in sequence. Corrupt or truncated
/// input surfaces as an I/O error.
///
/// # Errors
///
/// Returns any I/O error raised while reading, decoding, or writing.
pub fn decompress<R, W>(source: R, mut destination: W) -> io::Result<u64>
where
    R: Read,
    W: Write,
{
    let mut decoder = MultiGzDecoder::new(source);
    let copied = io::copy(&mut decoder, &mut destination)?;
    destination.flush()?;
    Ok(copied)
}

/// Compress `source` into `destination`, both relative to `dir`.
///
/// `destination` is created or truncated. Returns the number of
/// uncompressed bytes read.
///
/// # Errors
///
/// Returns any I/O error from opening, copying, or syncing.
pub fn compress_file(dir: &Dir, source: &Path, destination: &Path) -> io::Result<u64> {
    let input = dir.open(source)?;
    let output = dir.create(destination)?;
    let (copied, output) = compress(input, output)?;
    output.sync_all()?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        bytes = copied,
        "compressed dump"
    );
    Ok(copied)
}

/// Decompress `source` into `destination`, both relative to `dir`.
///
/// The gzip header and first block are decoded before `destination` is
/// created, so a missing or non-gzip source leaves an existing destination
/// untouched. Once created, `destination` is truncated and is removed again
/// if decoding fails part way. Returns the number of decompressed bytes
/// written.
///
/// # Errors
///
/// Returns any I/O error from opening, decoding, or writing.
pub fn decompress_file(dir: &Dir, source: &Path, destination: &Path) -> io::Result<u64> {
    let mut decoder = MultiGzDecoder::new(dir.open(source)?);
    let mut head = [0_u8; HEAD_BYTES];
    let head_len = decoder.read(&mut head)?;
    let decoded = head.get(..head_len).unwrap_or_default();
    let output = dir.create(destination)?;
    match write_decoded(decoded.chain(decoder), output) {
        Ok(copied) => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                bytes = copied,
                "decompressed artifact"
            );
            Ok(copied)
        }
        Err(error) => {
            if let Err(cleanup) = dir.remove_file(destination) {
                debug!(
                    destination = %destination.display(),
                    error = %cleanup,
                    "partial payload left behind"
                );
            }
            Err(error)
        }
    }
}

fn write_decoded<R>(mut decoded: R, mut output: cap_std::fs::File) -> io::Result<u64>
where
    R: Read,
{
    let copied = io::copy(&mut decoded, &mut output)?;
    output.flush()?;
    Ok(copied)
}
