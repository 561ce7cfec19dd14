//local shortcuts
use crate::*;

//third-party shortcuts
use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

//standard shortcuts
use std::io::{Read, Write};

//-------------------------------------------------------------------------------------------------------------------

/// Compression algorithm recognized by the [`super::CodecChain`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CompressionAlgorithm
{
    Deflate,
    Gzip,
}

//-------------------------------------------------------------------------------------------------------------------

/// Compress `bytes` with `algorithm`. Compression never fails: a pathological input just fails to shrink.
pub(crate) fn compress(algorithm: CompressionAlgorithm, bytes: &[u8]) -> Vec<u8>
{
    match algorithm
    {
        CompressionAlgorithm::Deflate =>
        {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes).expect("writing to an in-memory encoder cannot fail");
            encoder.finish().expect("finishing an in-memory encoder cannot fail")
        }
        CompressionAlgorithm::Gzip =>
        {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes).expect("writing to an in-memory encoder cannot fail");
            encoder.finish().expect("finishing an in-memory encoder cannot fail")
        }
    }
}

/// Decompress `bytes` with `algorithm`. A malformed stream raises a retryable-false [`RuntimeErrorKind::Protocol`]
/// error — corrupt compressed data is not something a retry will fix.
pub(crate) fn decompress(algorithm: CompressionAlgorithm, bytes: &[u8]) -> Result<Vec<u8>, RuntimeError>
{
    let mut out = Vec::new();
    let result = match algorithm
    {
        CompressionAlgorithm::Deflate => DeflateDecoder::new(bytes).read_to_end(&mut out),
        CompressionAlgorithm::Gzip    => GzDecoder::new(bytes).read_to_end(&mut out),
    };
    result.map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Protocol, "failed to decompress inbound payload", e))?;
    Ok(out)
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn deflate_round_trips()
    {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = compress(CompressionAlgorithm::Deflate, &original);
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(CompressionAlgorithm::Deflate, &compressed).unwrap(), original);
    }

    #[test]
    fn gzip_round_trips()
    {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = compress(CompressionAlgorithm::Gzip, &original);
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(CompressionAlgorithm::Gzip, &compressed).unwrap(), original);
    }

    #[test]
    fn corrupt_stream_fails_to_decompress()
    {
        let err = decompress(CompressionAlgorithm::Deflate, b"not a deflate stream at all").unwrap_err();
        assert_eq!(err.kind(), RuntimeErrorKind::Protocol);
    }
}

//-------------------------------------------------------------------------------------------------------------------
