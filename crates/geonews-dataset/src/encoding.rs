//! Text encoding detection
//!
//! Decodes raw bytes by trying an ordered list of encodings until one
//! succeeds. Supports UTF-8, Windows-1252 (strict: its five undefined
//! bytes fail) and Latin-1 (accepts every byte).
//!
//! The default order puts Windows-1252 before Latin-1. With Latin-1 first,
//! Windows-1252 is never reached and bytes 0x80..=0x9F decode as C1
//! control characters instead of curly quotes, dashes and the euro sign.

use std::path::Path;

use crate::{DatasetError, Result};

/// Supported source encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
    Latin1,
}

// Windows-1252 code points for bytes 0x80..=0x9F
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('€'),
    None,
    Some('‚'),
    Some('ƒ'),
    Some('„'),
    Some('…'),
    Some('†'),
    Some('‡'),
    Some('ˆ'),
    Some('‰'),
    Some('Š'),
    Some('‹'),
    Some('Œ'),
    None,
    Some('Ž'),
    None,
    None,
    Some('‘'),
    Some('’'),
    Some('“'),
    Some('”'),
    Some('•'),
    Some('–'),
    Some('—'),
    Some('˜'),
    Some('™'),
    Some('š'),
    Some('›'),
    Some('œ'),
    None,
    Some('ž'),
    Some('Ÿ'),
];

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Windows1252 => "windows-1252",
            Self::Latin1 => "latin-1",
        }
    }

    /// Decode bytes, or `None` if they are invalid in this encoding
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let text = std::str::from_utf8(bytes).ok()?;
                Some(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
            }
            Self::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[(b - 0x80) as usize],
                    _ => Some(b as char),
                })
                .collect(),
            Self::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "windows-1252" | "cp1252" => Ok(Self::Windows1252),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            _ => Err(DatasetError::UnknownEncoding(s.to_string())),
        }
    }
}

/// Decode with the first encoding that succeeds
pub fn decode_first(
    path: &Path,
    bytes: &[u8],
    encodings: &[TextEncoding],
) -> Result<(String, TextEncoding)> {
    encodings
        .iter()
        .find_map(|enc| enc.decode(bytes).map(|text| (text, *enc)))
        .ok_or_else(|| DatasetError::UndecodableInput {
            path: path.to_path_buf(),
            tried: encodings.iter().map(|e| e.as_str().to_string()).collect(),
        })
}
