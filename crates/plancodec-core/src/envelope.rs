//! Single-line log envelope for encoded plan text.
//!
//! Encoded plans span many lines and contain box-drawing glyphs; log
//! records want one short ASCII line. The envelope is raw deflate over the
//! UTF-8 bytes, then standard base64. Empty text, the unavailable plan, maps
//! to an empty envelope.

use crate::error::CodecError;
use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::{Compression, read::DeflateDecoder, write::DeflateEncoder};
use std::io::{self, Read, Write};

/// Wrap encoded plan text for a log record.
pub fn encode_for_log(text: &str) -> Result<String, CodecError> {
    if text.is_empty() {
        return Ok(String::new());
    }

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).map_err(compression_failed)?;
    let compressed = encoder.finish().map_err(compression_failed)?;

    Ok(STANDARD.encode(compressed))
}

fn compression_failed(err: io::Error) -> CodecError {
    CodecError::envelope_internal(format!("log envelope compression failed: {err}"))
}

/// Recover encoded plan text from a log record.
pub fn decode_from_log(envelope: &str) -> Result<String, CodecError> {
    let envelope = envelope.trim();
    if envelope.is_empty() {
        return Ok(String::new());
    }

    let compressed = STANDARD
        .decode(envelope)
        .map_err(|err| CodecError::envelope_malformed(format!("invalid log envelope: {err}")))?;

    let mut bytes = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .read_to_end(&mut bytes)
        .map_err(|err| {
            CodecError::envelope_malformed(format!("log envelope is not deflate data: {err}"))
        })?;

    String::from_utf8(bytes).map_err(|err| {
        CodecError::envelope_malformed(format!("log envelope is not UTF-8: {err}"))
    })
}

///
/// TESTS
///
