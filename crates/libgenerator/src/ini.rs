//! Reader for INI-style key/value files.
//!
//! The format is the one shared by unit files and D-Bus activation files:
//!
//! ```text
//! # comment
//! [D-BUS Service]
//! Name=org.example.Foo
//! Exec=/usr/bin/foo --with \
//!      --continued-line
//! ```
//!
//! Section and key names are case-sensitive.  Whitespace around keys and
//! values is trimmed.  When a key appears more than once in a section the
//! last assignment wins, and a section that appears more than once is merged.
//!
//! Only the sections a caller asks for are collected.  Lines in any other
//! section, and assignments before the first header, are ignored.  The file
//! is read as bytes; an assignment that is not valid UTF-8 is dropped with a
//! warning instead of failing the whole file.

use log::{trace, warn};
use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

pub type ParsedSection = HashMap<String, String>;
pub type ParsedFile = HashMap<String, ParsedSection>;

/// Where in the file the parser currently is.
enum Position {
    /// Before the first section header.
    Preamble,
    /// Inside a section the caller did not ask for.
    Ignored,
    Section(String),
}

/// Parse `content`, keeping the sections named in `wanted`.  `path` is only
/// used for error reporting.
pub fn parse_file(path: &Path, content: &[u8], wanted: &[&str]) -> Result<ParsedFile> {
    let mut sections: ParsedFile = HashMap::new();
    let mut position = Position::Preamble;

    let parse_error = |line: usize, message: String| Error::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    for LogicalLine {
        number,
        text,
        valid_utf8,
    } in logical_lines(content)
    {
        if text.is_empty() || text.starts_with('#') || text.starts_with(';') {
            continue;
        }

        if text.starts_with('[') {
            let Some(name) = text.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
                return Err(parse_error(number, format!("Invalid section header '{text}'")));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(parse_error(number, "Empty section header.".to_owned()));
            }
            position = if wanted.contains(&name) {
                sections.entry(name.to_owned()).or_default();
                Position::Section(name.to_owned())
            } else {
                trace!("ini: {}: ignoring section [{name}]", path.display());
                Position::Ignored
            };
            continue;
        }

        let section = match &position {
            Position::Section(section) => section,
            Position::Ignored => continue,
            Position::Preamble => {
                warn!(
                    "[{}:{number}] Assignment outside of section. Ignoring.",
                    path.display()
                );
                continue;
            }
        };

        let Some((key, value)) = text.split_once('=') else {
            return Err(parse_error(number, "Missing '='.".to_owned()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(parse_error(number, "Missing key name before '='.".to_owned()));
        }
        if !valid_utf8 {
            warn!(
                "[{}:{number}] {key}= is not valid UTF-8, ignoring.",
                path.display()
            );
            continue;
        }

        sections
            .entry(section.clone())
            .or_default()
            .insert(key.to_owned(), value.trim().to_owned());
    }

    Ok(sections)
}

/// Read `path` and return the assignments of `section`.
///
/// Returns `Ok(None)` if the file does not exist, and an empty section if the
/// file exists but never opens `section`.
pub fn read_section(path: &Path, section: &str) -> Result<Option<ParsedSection>> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            trace!("ini: {} vanished, nothing to read", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut parsed = parse_file(path, &content, &[section])?;
    Ok(Some(parsed.remove(section).unwrap_or_default()))
}

struct LogicalLine {
    /// 1-based number of the first physical line.
    number: usize,
    text: String,
    /// False if any physical line that went into `text` was not UTF-8.
    valid_utf8: bool,
}

/// Split `content` into trimmed logical lines, joining lines that end in a
/// backslash with the following one, whatever that line holds.  Invalid
/// UTF-8 is replaced so that structure can still be recognized.
fn logical_lines(content: &[u8]) -> Vec<LogicalLine> {
    let mut result = Vec::new();
    let mut pending: Option<LogicalLine> = None;

    for (idx, raw) in content.split(|&b| b == b'\n').enumerate() {
        let decoded = String::from_utf8_lossy(raw);
        let line = decoded.trim();

        let (continues, text) = match line.strip_suffix('\\') {
            Some(text) => (true, text),
            None => (false, line),
        };

        let mut logical = pending.take().unwrap_or(LogicalLine {
            number: idx + 1,
            text: String::new(),
            valid_utf8: true,
        });
        if !logical.text.is_empty() {
            logical.text.push(' ');
        }
        logical.text.push_str(text.trim_end());
        logical.valid_utf8 &= std::str::from_utf8(raw).is_ok();

        if continues {
            pending = Some(logical);
        } else {
            logical.text = logical.text.trim().to_owned();
            result.push(logical);
        }
    }

    if let Some(mut logical) = pending {
        logical.text = logical.text.trim().to_owned();
        result.push(logical);
    }

    result
}
