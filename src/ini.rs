//! Section/Key/Value Documents
//!
//! This is a lossless parser for the INI-style text format used by packaging
//! manifests. The document keeps every source line, so it can be rendered
//! back byte-for-byte, and edits only touch the lines of the edited entry.
//!
//! The accepted syntax is:
//!
//!  * Lines whose first non-blank character is `#` or `;` are comments.
//!    Comments are only recognized on their own line, values may contain
//!    `#` freely.
//!
//!  * `[name]` starts a new section. Whitespace inside the brackets is
//!    ignored. A comment may follow the closing bracket.
//!
//!  * `key = value` or `key: value` adds an entry to the current section. The
//!    first `=` or `:` on the line is the delimiter. Keys are case-sensitive
//!    and may contain dots (`android.minapi` is a plain key). A line with no
//!    delimiter defines a key without value.
//!
//!  * A line indented deeper than the line of the preceding entry continues
//!    the value of that entry. Continuations are joined with a newline. A
//!    blank line ends the value.
//!
//! Documents use either `\n` or `\r\n` line endings. The style of the first
//! line break is kept for the whole document, including edited lines.
//!
//! Line numbers are 1-based throughout this module.

/// Document Errors
///
/// This is the exhaustive list of errors raised when parsing or editing a
/// document. Syntax errors carry the line they were detected on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An entry appeared before the first section header.
    #[error("line {line}: entry outside of any section")]
    MissingSectionHeader { line: usize },
    /// A section header lacks its closing bracket.
    #[error("line {line}: unterminated section header")]
    UnterminatedSection { line: usize },
    /// A section header has no name.
    #[error("line {line}: empty section name")]
    EmptySectionName { line: usize },
    /// A section was defined twice.
    #[error("line {line}: duplicate section [{name}], first defined on line {first}")]
    DuplicateSection { name: String, line: usize, first: usize },
    /// An entry has no key in front of its delimiter.
    #[error("line {line}: empty key")]
    EmptyKey { line: usize },
    /// A key was defined twice in the same section.
    #[error("line {line}: duplicate key '{key}' in section [{section}], first defined on line {first}")]
    DuplicateKey { section: String, key: String, line: usize, first: usize },
    /// The section name cannot be written as a section header.
    #[error("invalid section name {0:?}")]
    InvalidSection(String),
    /// The key cannot be written as an entry.
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    /// The value cannot be written without changing its meaning.
    #[error("invalid value {0:?}")]
    InvalidValue(String),
}

/// Document Entry
///
/// A single key with its (possibly multi-line) value. `line` is the line of
/// the key, `end_line` the last continuation line of the value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    /// The delimiter found between key and value, if any.
    pub delimiter: Option<char>,
    pub value: Option<String>,
    pub line: usize,
    pub end_line: usize,
}

/// Document Section
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// Line of the section header.
    pub line: usize,
    pub entries: Vec<Entry>,
}

/// Parsed Document
///
/// The document owns the source lines and the sections parsed from them.
/// Use `to_string()` to render the document back into text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
    crlf: bool,
    trailing_newline: bool,
    sections: Vec<Section>,
}

impl Section {
    /// Find an entry by key.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|v| v.key == key)
    }

    // Last line owned by the section, ignoring trailing comments and blank
    // lines. New entries are inserted after it.
    fn end_line(&self) -> usize {
        self.entries.last().map_or(self.line, |v| v.end_line)
    }
}

impl Document {
    // Scan source lines into sections
    //
    // `open` tracks the indentation of the last entry as long as it may still
    // receive continuation lines.
    fn scan(lines: &[String]) -> Result<Vec<Section>, Error> {
        let mut sections: Vec<Section> = Vec::new();
        let mut open: Option<usize> = None;

        for (idx, text) in lines.iter().enumerate() {
            let line = idx + 1;
            let trimmed = text.trim();

            if trimmed.is_empty() {
                open = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indent = text.len() - text.trim_start().len();

            if let Some(level) = open {
                if indent > level {
                    if let Some(entry) = sections.last_mut().and_then(|v| v.entries.last_mut()) {
                        if let Some(value) = entry.value.as_mut() {
                            if !value.is_empty() {
                                value.push('\n');
                            }
                            value.push_str(trimmed);
                        }
                        entry.end_line = line;
                    }
                    continue;
                }
            }
            open = None;

            if let Some(rest) = trimmed.strip_prefix('[') {
                let (name, trailer) = rest
                    .split_once(']')
                    .ok_or(Error::UnterminatedSection { line })?;
                let trailer = trailer.trim_start();
                if !trailer.is_empty() && !trailer.starts_with(['#', ';']) {
                    return Err(Error::UnterminatedSection { line });
                }
                let name = name.trim();

                if name.is_empty() {
                    return Err(Error::EmptySectionName { line });
                }
                if let Some(first) = sections.iter().find(|v| v.name == name) {
                    return Err(Error::DuplicateSection {
                        name: name.to_string(),
                        line,
                        first: first.line,
                    });
                }

                sections.push(Section {
                    name: name.to_string(),
                    line,
                    entries: Vec::new(),
                });
                continue;
            }

            let section = sections
                .last_mut()
                .ok_or(Error::MissingSectionHeader { line })?;

            let (key, delimiter, value) = match trimmed.find(|v: char| v == '=' || v == ':') {
                Some(pos) => (
                    trimmed[..pos].trim_end(),
                    trimmed[pos..].chars().next(),
                    Some(trimmed[pos + 1..].trim_start()),
                ),
                None => (trimmed, None, None),
            };

            if key.is_empty() {
                return Err(Error::EmptyKey { line });
            }
            if let Some(first) = section.get(key) {
                return Err(Error::DuplicateKey {
                    section: section.name.clone(),
                    key: key.to_string(),
                    line,
                    first: first.line,
                });
            }

            if value.is_some() {
                open = Some(indent);
            }

            section.entries.push(Entry {
                key: key.to_string(),
                delimiter: delimiter,
                value: value.map(str::to_string),
                line,
                end_line: line,
            });
        }

        Ok(sections)
    }

    /// Parse document from string
    ///
    /// Both `\n` and `\r\n` line endings are accepted. Rendering uses the
    /// line ending of the first line.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let sections = Self::scan(&lines)?;

        tracing::trace!(lines = lines.len(), sections = sections.len(), "parsed document");

        Ok(Self {
            lines: lines,
            crlf: content.find('\n').map_or(false, |v| content[..v].ends_with('\r')),
            trailing_newline: content.ends_with('\n'),
            sections: sections,
        })
    }

    /// Return all sections in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Find a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|v| v.name == name)
    }

    /// Find an entry by section and key.
    pub fn get(&self, section: &str, key: &str) -> Option<&Entry> {
        self.section(section).and_then(|v| v.get(key))
    }

    fn is_section_name(s: &str) -> bool {
        !s.is_empty()
            && s.trim() == s
            && s.chars().all(|v| !v.is_control() && v != '[' && v != ']')
    }

    fn is_key(s: &str) -> bool {
        !s.is_empty()
            && s.trim() == s
            && !s.starts_with(['#', ';', '['])
            && s.chars().all(|v| !v.is_control() && v != '=' && v != ':')
    }

    // Render an entry into source lines
    //
    // Multi-line values are written as indented continuation lines. Empty
    // lines are dropped, since they would end the value.
    fn render_entry(key: &str, value: &str) -> Result<Vec<String>, Error> {
        let mut parts = value.split('\n').map(str::trim);
        let first = parts.next().unwrap_or("");

        let mut out = vec![
            if first.is_empty() {
                format!("{} =", key)
            } else {
                format!("{} = {}", key, first)
            },
        ];

        for part in parts.filter(|v| !v.is_empty()) {
            if part.starts_with('#') || part.starts_with(';') {
                return Err(Error::InvalidValue(value.to_string()));
            }
            out.push(format!("    {}", part));
        }

        Ok(out)
    }

    /// Set a value
    ///
    /// Replace the lines of an existing entry with the new `key = value`
    /// rendering. If the key does not exist, it is appended after the last
    /// entry of its section. If the section does not exist either, it is
    /// appended to the end of the document. All other lines are retained
    /// verbatim, including comments.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), Error> {
        if !Self::is_section_name(section) {
            return Err(Error::InvalidSection(section.to_string()));
        }
        if !Self::is_key(key) {
            return Err(Error::InvalidKey(key.to_string()));
        }

        let rendered = Self::render_entry(key, value)?;
        let mut lines = self.lines.clone();

        match self.section(section) {
            Some(s) => match s.get(key) {
                Some(entry) => {
                    lines.splice(entry.line - 1..entry.end_line, rendered);
                },
                None => {
                    let at = s.end_line();
                    lines.splice(at..at, rendered);
                },
            },
            None => {
                if lines.last().map_or(false, |v| !v.trim().is_empty()) {
                    lines.push(String::new());
                }
                lines.push(format!("[{}]", section));
                lines.extend(rendered);
            },
        }

        // Re-scan to refresh line numbers. This also guarantees the edit
        // produced a valid document.
        let sections = Self::scan(&lines)?;

        self.trailing_newline = self.trailing_newline || self.lines.is_empty();
        self.lines = lines;
        self.sections = sections;

        Ok(())
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let newline = if self.crlf { "\r\n" } else { "\n" };

        for (idx, line) in self.lines.iter().enumerate() {
            if idx > 0 {
                f.write_str(newline)?;
            }
            f.write_str(line)?;
        }
        if self.trailing_newline && !self.lines.is_empty() {
            f.write_str(newline)?;
        }
        Ok(())
    }
}
