use crate::error::CodecError;
use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use log::debug;
use std::io::Read;

/// Raw DEFLATE at maximum effort. The container records the length of every
/// compressed plane, so no zlib or gzip framing is added.
pub fn compress(plane: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut compressed: Vec<u8> = Vec::new();
    let mut encoder = DeflateEncoder::new(plane, Compression::best());
    encoder.read_to_end(&mut compressed)?;

    if !plane.is_empty() {
        debug!(
            "plane compression ratio: {:.4}% ({} -> {} bytes)",
            ((compressed.len() as f64) / (plane.len() as f64)) * 100.0,
            plane.len(),
            compressed.len(),
        );
    }

    Ok(compressed)
}

/// Inflates at most `limit` bytes from `data`.
///
/// A malformed stream is a [`CodecError::CorruptStream`]. A stream that is
/// merely cut short inflates to fewer bytes than expected, so callers must
/// check the returned length.
pub fn decompress(data: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
    let mut plane: Vec<u8> = Vec::new();
    DeflateDecoder::new(data)
        .take(limit as u64)
        .read_to_end(&mut plane)
        .map_err(|err| {
            debug!("plane failed to inflate: {}", err);
            CodecError::CorruptStream
        })?;

    Ok(plane)
}
