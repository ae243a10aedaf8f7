//! Content decompression infrastructure.
//!
//! Decodes response bodies according to their `Content-Encoding` so that
//! JSON and text decoding always see the target's actual payload.

use std::borrow::Cow;
use std::io::Read;

use crate::error::RelayError;

/// Trait for a single content-coding.
pub trait Decompressor: Send + Sync {
    /// The content-coding this decompressor handles (e.g., "gzip", "deflate", "br").
    fn encoding(&self) -> &'static str;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, RelayError>;
}

/// Gzip decompressor implementation.
#[derive(Default)]
pub struct GzipDecompressor;

impl Decompressor for GzipDecompressor {
    fn encoding(&self) -> &'static str {
        "gzip"
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, RelayError> {
        let mut decoder = flate2::read::MultiGzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| RelayError::Decompression(format!("Gzip decompression failed: {}", e)))?;
        Ok(decompressed)
    }
}

/// Deflate decompressor implementation.
///
/// HTTP `deflate` is zlib-wrapped, but some servers send raw deflate streams;
/// both are accepted.
#[derive(Default)]
pub struct DeflateDecompressor;

impl Decompressor for DeflateDecompressor {
    fn encoding(&self) -> &'static str {
        "deflate"
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, RelayError> {
        let mut decompressed = Vec::new();
        if flate2::read::ZlibDecoder::new(data)
            .read_to_end(&mut decompressed)
            .is_ok()
        {
            return Ok(decompressed);
        }

        decompressed.clear();
        flate2::read::DeflateDecoder::new(data)
            .read_to_end(&mut decompressed)
            .map_err(|e| {
                RelayError::Decompression(format!("Deflate decompression failed: {}", e))
            })?;
        Ok(decompressed)
    }
}

/// Brotli decompressor implementation.
#[derive(Default)]
pub struct BrotliDecompressor;

impl Decompressor for BrotliDecompressor {
    fn encoding(&self) -> &'static str {
        "br"
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, RelayError> {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut std::io::Cursor::new(data), &mut decompressed).map_err(
            |e| RelayError::Decompression(format!("Brotli decompression failed: {}", e)),
        )?;
        Ok(decompressed)
    }
}

/// Selects the decoder for each coding listed in a `Content-Encoding` header.
#[derive(Default)]
pub struct MultiDecompressor {
    gzip: GzipDecompressor,
    deflate: DeflateDecompressor,
    brotli: BrotliDecompressor,
}

impl MultiDecompressor {
    pub fn new() -> Self {
        Self::default()
    }

    fn decoder_for(&self, coding: &str) -> Option<&dyn Decompressor> {
        match coding {
            "gzip" | "x-gzip" => Some(&self.gzip),
            "deflate" => Some(&self.deflate),
            "br" => Some(&self.brotli),
            _ => None,
        }
    }

    /// Undoes every coding in `encoding`, last-applied first.
    ///
    /// `identity` and unrecognized codings pass the data through unchanged.
    pub fn decompress<'a>(
        &self,
        data: &'a [u8],
        encoding: Option<&str>,
    ) -> Result<Cow<'a, [u8]>, RelayError> {
        let Some(encoding) = encoding else {
            return Ok(Cow::Borrowed(data));
        };
        if data.is_empty() {
            return Ok(Cow::Borrowed(data));
        }

        let codings: Vec<String> = encoding
            .split(',')
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        let mut body = Cow::Borrowed(data);
        for coding in codings.iter().rev() {
            match self.decoder_for(coding) {
                Some(decoder) => body = Cow::Owned(decoder.decompress(&body)?),
                None => tracing::debug!(coding = %coding, "Passing through unhandled content-coding"),
            }
        }
        Ok(body)
    }
}

/// Convenience function for decompressing body data.
pub fn decompress_body<'a>(
    body: &'a [u8],
    encoding: Option<&str>,
) -> Result<Cow<'a, [u8]>, RelayError> {
    MultiDecompressor::new().decompress(body, encoding)
}
