//! Text decoding with a legacy single-byte fallback.
//!
//! LaTeX sources and `.bib` files in the wild are mostly UTF-8, with the odd
//! Latin-1 file from older editors. Decoding tries UTF-8 first and falls back
//! to Windows-1252, which is what the WHATWG encoding standard (and therefore
//! `encoding_rs`) maps the `latin1` / `iso-8859-1` labels to.

use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::error::{Result, TexkitError};

/// UTF-8 BOM: EF BB BF
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Encoding a buffer was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Valid UTF-8 (BOM stripped if present)
    Utf8,
    /// Decoded with the single-byte fallback
    Latin1,
}

/// Decode bytes as UTF-8, falling back to Latin-1.
///
/// Returns `None` only when both decodings report errors.
pub fn decode_text(buffer: &[u8]) -> Option<(String, TextEncoding)> {
    let data = buffer.strip_prefix(UTF8_BOM).unwrap_or(buffer);
    if let Ok(text) = std::str::from_utf8(data) {
        return Some((text.to_string(), TextEncoding::Utf8));
    }

    let (cow, had_errors) = WINDOWS_1252.decode_without_bom_handling(data);
    if had_errors {
        return None;
    }
    Some((cow.into_owned(), TextEncoding::Latin1))
}

/// Read a whole text file, decoding with the UTF-8 / Latin-1 fallback.
///
/// # Errors
///
/// Returns [`TexkitError::ReadError`] if the file cannot be read and
/// [`TexkitError::DecodeError`] if neither decoding succeeds.
pub fn read_text(path: &Path) -> Result<String> {
    let buffer = std::fs::read(path).map_err(|e| TexkitError::read_error(path, e))?;
    match decode_text(&buffer) {
        Some((text, TextEncoding::Utf8)) => Ok(text),
        Some((text, TextEncoding::Latin1)) => {
            log::debug!("{} is not UTF-8, decoded as Latin-1", path.display());
            Ok(text)
        }
        None => Err(TexkitError::DecodeError {
            path: path.to_path_buf(),
            fallback: WINDOWS_1252.name(),
        }),
    }
}
