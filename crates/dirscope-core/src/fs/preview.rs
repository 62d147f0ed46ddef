//! Text previews of file contents.
//!
//! The navigation controller only talks to [`PreviewSource`]; decoding lives
//! behind it. [`TextPreviewer`] is the plain-text implementation: it reads at
//! most `max_bytes`, refuses binary files and strips terminal escapes.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Take};
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// The number of bytes to inspect for binary (null-byte) detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// Finite, lazily produced preview lines.
pub type PreviewLines = Box<dyn Iterator<Item = String> + Send>;

/// Capability that turns a path into displayable lines.
pub trait PreviewSource {
    /// Starts a preview of `path`.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the file cannot be opened or
    /// cannot be shown as text.
    fn preview(&self, path: &Path) -> CoreResult<PreviewLines>;
}

/// Plain-text previewer capped at `max_bytes`.
#[derive(Debug, Clone, Copy)]
pub struct TextPreviewer {
    max_bytes: u64,
}

impl TextPreviewer {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl PreviewSource for TextPreviewer {
    fn preview(&self, path: &Path) -> CoreResult<PreviewLines> {
        let meta = std::fs::metadata(path).map_err(|e| CoreError::from_io(e, path))?;
        if !meta.is_file() {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }
        if is_binary(path)? {
            return Err(CoreError::BinaryContent(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| CoreError::from_io(e, path))?;
        Ok(Box::new(Lines {
            reader: BufReader::new(file.take(self.max_bytes)),
            buf: Vec::new(),
        }))
    }
}

/// Line iterator over a byte-capped reader; invalid UTF-8 is replaced
/// rather than ending the preview.
struct Lines {
    reader: BufReader<Take<File>>,
    buf: Vec<u8>,
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(strip_ansi_escapes(&String::from_utf8_lossy(&self.buf)))
            }
        }
    }
}

/// Returns `true` if the file appears to be binary.
///
/// Binary detection checks for null bytes (`0x00`) in the first 8 KB.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn is_binary(path: &Path) -> CoreResult<bool> {
    let mut file = File::open(path).map_err(|e| CoreError::from_io(e, path))?;
    let mut buf = vec![0u8; BINARY_CHECK_SIZE];
    let bytes_read = file.read(&mut buf)?;
    Ok(buf[..bytes_read].contains(&0))
}

/// Strips ANSI escape sequences and other control characters from a string.
///
/// Handles CSI sequences (`\x1b[...`), OSC sequences (`\x1b]...\x07`),
/// single-character escape codes, and stray control characters.
fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        chars.next();
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        chars.next();
                        if next == '\x07' {
                            break;
                        }
                        if next == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            }
        } else if c == '\t' {
            // ratatui gives tabs zero width
            result.push_str("    ");
        } else if !c.is_control() {
            result.push(c);
        }
    }

    result
}
