//! Encoding detection and conversion utilities
//!
//! Contact lists are usually UTF-8, but spreadsheets exported on Windows often
//! save CSV as windows-1252. Detection order: BOM, strict UTF-8, `chardetng`
//! guess, then windows-1252.

use chardetng::EncodingDetector as ChardetngDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use tracing::debug;

/// UTF-8 byte-order mark
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Byte-based encoding detector
pub struct EncodingDetector {
    /// Bytes inspected by the statistical guess
    buffer_size: usize,
    /// Top-level domain hint passed to `chardetng`
    tld_hint: Option<&'static [u8]>,
    /// Used when nothing else decodes cleanly
    fallback: &'static Encoding,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            tld_hint: Some(b"br"),
            fallback: WINDOWS_1252,
        }
    }
}

impl EncodingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect the encoding of a byte buffer
    pub fn detect(&self, data: &[u8]) -> &'static Encoding {
        if data.is_empty() {
            return UTF_8;
        }

        if let Some(encoding) = self.detect_bom(data) {
            debug!("Encoding detected from BOM: {}", encoding.name());
            return encoding;
        }

        if std::str::from_utf8(data).is_ok() {
            return UTF_8;
        }

        if let Some(encoding) = self.chardetng_detect(data) {
            debug!("Encoding detected by chardetng: {}", encoding.name());
            return encoding;
        }

        debug!("Falling back to {}", self.fallback.name());
        self.fallback
    }

    fn detect_bom(&self, data: &[u8]) -> Option<&'static Encoding> {
        if data.starts_with(UTF8_BOM) {
            return Some(UTF_8);
        }
        if data.starts_with(&[0xFF, 0xFE]) {
            return Some(UTF_16LE);
        }
        if data.starts_with(&[0xFE, 0xFF]) {
            return Some(UTF_16BE);
        }
        None
    }

    fn chardetng_detect(&self, data: &[u8]) -> Option<&'static Encoding> {
        let sample = &data[..data.len().min(self.buffer_size)];
        let mut detector = ChardetngDetector::new();
        detector.feed(sample, sample.len() == data.len());
        let guess = detector.guess(self.tld_hint, true);

        let (_, has_errors) = guess.decode_without_bom_handling(sample);
        if has_errors {
            None
        } else {
            Some(guess)
        }
    }

    /// Decode a whole document to UTF-8 text, dropping any BOM.
    ///
    /// Malformed sequences are replaced rather than rejected; the row checks
    /// downstream decide whether the affected rows are usable.
    pub fn decode<'a>(&self, data: &'a [u8]) -> (Cow<'a, str>, &'static Encoding) {
        let encoding = self.detect(data);
        let (text, actual, had_errors) = encoding.decode(data);
        if had_errors {
            debug!("Replaced malformed {} sequences while decoding", actual.name());
        }
        (text, actual)
    }
}

/// Decode bytes with the default detector
pub fn decode_document(data: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    EncodingDetector::new().decode(data)
}
