//! Ordered, comment-preserving `key=value` property files.
//!
//! The file is modeled as a sequence of typed lines rather than a map, so a
//! rewrite never drops comments or blank lines a developer added by hand and
//! never reorders entries that were not touched.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::CredentialError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Entry { key: String, value: String },
    Comment(String),
    Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedProperties {
    lines: Vec<Line>,
}

impl OrderedProperties {
    /// Load properties from `path`. An absent file is an empty store; a file
    /// that exists but does not parse is corrupt.
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let raw = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8(raw).map_err(|_| corrupt(path, "not valid UTF-8"))?;

        let mut lines = Vec::new();
        for (idx, raw_line) in text.lines().enumerate() {
            let trimmed = raw_line.trim_start();
            if trimmed.is_empty() {
                lines.push(Line::Blank);
            } else if trimmed.starts_with('#') || trimmed.starts_with('!') {
                lines.push(Line::Comment(raw_line.to_string()));
            } else {
                let (key, value) = split_entry(raw_line).ok_or_else(|| {
                    corrupt(path, format!("line {}: missing key/value separator", idx + 1))
                })?;
                if key.is_empty() {
                    return Err(corrupt(path, format!("line {}: empty key", idx + 1)));
                }
                lines.push(Line::Entry { key, value });
            }
        }
        Ok(Self { lines })
    }

    /// Rewrite the whole file. The content goes to a temp file in the target
    /// directory first and is renamed over `path`, so a concurrent reader
    /// never observes a half-written store. Missing parent directories are
    /// created.
    pub fn save(&self, path: &Path) -> Result<(), CredentialError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        for line in &self.lines {
            match line {
                Line::Entry { key, value } => {
                    writeln!(tmp, "{}={}", escape_key(key), escape_value(value))?
                }
                Line::Comment(text) => writeln!(tmp, "{text}")?,
                Line::Blank => writeln!(tmp)?,
            }
        }
        tmp.flush()?;
        tmp.persist(path).map_err(|e| CredentialError::Io(e.error))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Insert at the end if the key is new, replace in place if it exists.
    /// A value-only update never moves the entry.
    pub fn upsert(&mut self, key: &str, value: &str) {
        for line in &mut self.lines {
            if let Line::Entry { key: k, value: v } = line {
                if k == key {
                    *v = value.to_string();
                    return;
                }
            }
        }
        self.lines.push(Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Remove the entry for `key`. Returns whether it was present; an absent
    /// key is not an error.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key: k, .. } if k == key));
        self.lines.len() != before
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

fn corrupt(path: &Path, reason: impl Into<String>) -> CredentialError {
    CredentialError::CorruptStore {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}

// Keys are split from values at the first unescaped '='. Backslash escapes
// cover the separator, backslash itself and line breaks; anything else after
// a backslash unescapes to the character itself.
fn split_entry(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => key.push('\n'),
                Some('r') => key.push('\r'),
                Some(other) => key.push(other),
                None => key.push('\\'),
            },
            '=' => return Some((key, unescape(chars.as_str()))),
            _ => key.push(c),
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(text: &str, escape_separator: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '=' if escape_separator => out.push_str("\\="),
            _ => out.push(c),
        }
    }
    out
}

fn escape_key(key: &str) -> String {
    let escaped = escape(key, true);
    // a key starting with '#' or '!' would read back as a comment
    if escaped.starts_with('#') || escaped.starts_with('!') {
        format!("\\{escaped}")
    } else {
        escaped
    }
}

fn escape_value(value: &str) -> String {
    escape(value, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_absent_file_yields_empty_store() {
        let dir = tempdir().unwrap();
        let store = OrderedProperties::load(&dir.path().join("missing.properties")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn save_load_roundtrip_preserves_order_comments_and_blanks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.properties");

        let mut store = OrderedProperties::default();
        store.upsert("a", "1");
        store.lines.push(Line::Comment("# keep me".to_string()));
        store.lines.push(Line::Blank);
        store.upsert("b", "2");
        store.save(&path).unwrap();

        let loaded = OrderedProperties::load(&path).unwrap();
        assert_eq!(loaded, store);
        let keys: Vec<_> = loaded.entries().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn roundtrip_of_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.properties");
        let store = OrderedProperties::default();
        store.save(&path).unwrap();
        assert_eq!(OrderedProperties::load(&path).unwrap(), store);
    }

    #[test]
    fn upsert_replaces_in_place_without_moving() {
        let mut store = OrderedProperties::default();
        store.upsert("a", "1");
        store.upsert("b", "2");
        store.upsert("a", "99");
        let entries: Vec<_> = store
            .entries()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            entries,
            vec![("a".to_string(), "99".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn remove_is_a_noop_for_absent_keys() {
        let mut store = OrderedProperties::default();
        store.upsert("a", "1");
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(!store.remove("never-there"));
        assert!(store.is_empty());
    }

    #[test]
    fn keys_and_values_with_special_characters_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("escapes.properties");

        let mut store = OrderedProperties::default();
        store.upsert("plain", "value");
        store.upsert("with=separator", "v=1");
        store.upsert("multi\nline", "a\nb\r\nc");
        store.upsert("#looks-like-comment", "x");
        store.upsert("back\\slash", "C:\\temp");
        store.save(&path).unwrap();

        let loaded = OrderedProperties::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.get("with=separator"), Some("v=1"));
        assert_eq!(loaded.get("multi\nline"), Some("a\nb\r\nc"));
        assert_eq!(loaded.get("#looks-like-comment"), Some("x"));
        assert_eq!(loaded.get("back\\slash"), Some("C:\\temp"));
    }

    #[test]
    fn hand_written_file_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hand.properties");
        fs::write(&path, "# header\n\nfirst=one\nsecond=two=with=equals\n").unwrap();

        let store = OrderedProperties::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("first"), Some("one"));
        assert_eq!(store.get("second"), Some("two=with=equals"));
    }

    #[test]
    fn line_without_separator_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.properties");
        fs::write(&path, "ok=fine\nthis line has no separator\n").unwrap();

        let err = OrderedProperties::load(&path).unwrap_err();
        match err {
            CredentialError::CorruptStore { reason, .. } => {
                assert!(reason.contains("line 2"), "unexpected reason: {reason}")
            }
            other => panic!("expected CorruptStore, got {other:?}"),
        }
    }

    #[test]
    fn save_replaces_existing_content_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.properties");
        fs::write(&path, "old=content\n").unwrap();

        let mut store = OrderedProperties::default();
        store.upsert("new", "content");
        store.save(&path).unwrap();

        let loaded = OrderedProperties::load(&path).unwrap();
        assert_eq!(loaded.get("old"), None);
        assert_eq!(loaded.get("new"), Some("content"));
        // nothing but the store file left behind in the directory
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("store.properties");
        let mut store = OrderedProperties::default();
        store.upsert("a", "1");
        store.save(&path).unwrap();
        assert_eq!(OrderedProperties::load(&path).unwrap().get("a"), Some("1"));
    }
}
