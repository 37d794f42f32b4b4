//! Query Manifest Values
//!
//! The `get` operation returns a single manifest value, interpolated and
//! converted into the requested type. It allows scripts to read the
//! manifest the same way the packaging tool does.

use crate::manifest::{self, Raw};

/// Get Errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The key is not defined in the section, nor in `[DEFAULT]`.
    #[error("[{section}] {key} is not set")]
    Missing { section: String, key: String },
    #[error(transparent)]
    Value(#[from] manifest::ErrorValue),
}

/// Value Type
///
/// This enum is an enumeration of the types a value can be read as. It
/// implements `FromStr` for use on the command-line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    String,
    List,
    Integer,
    Boolean,
}

/// Typed Value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    String(String),
    List(Vec<String>),
    Integer(i64),
    Boolean(bool),
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::List => "list",
            Kind::Integer => "integer",
            Kind::Boolean => "boolean",
        }
    }
}

impl std::str::FromStr for Kind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Kind::String, Kind::List, Kind::Integer, Kind::Boolean]
            .into_iter()
            .find(|v| s.eq_ignore_ascii_case(v.as_str()))
            .ok_or(())
    }
}

// Lists are printed one token per line, so they can be consumed by shell
// loops.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(v) => f.write_str(v),
            Value::List(v) => f.write_str(&v.join("\n")),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// Get value
///
/// Read the value of `key` in `section` as the given type.
pub fn get(
    raw: &Raw,
    section: &str,
    key: &str,
    kind: Kind,
) -> Result<Value, Error> {
    let missing = || Error::Missing {
        section: section.to_string(),
        key: key.to_string(),
    };

    tracing::debug!(section, key, kind = kind.as_str(), "querying manifest value");

    match kind {
        Kind::String => raw.string(section, key)?.map(Value::String).ok_or_else(missing),
        Kind::List => raw.list(section, key)?.map(Value::List).ok_or_else(missing),
        Kind::Integer => raw.integer(section, key)?.map(Value::Integer).ok_or_else(missing),
        Kind::Boolean => raw.boolean(section, key)?.map(Value::Boolean).ok_or_else(missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "
[app]
title = Gold Shop Manager
requirements = python3, kivy==2.3.0
android.minapi = 21
fullscreen = off
";

    #[test]
    fn get_typed() {
        let m = manifest::Manifest::parse_str(MANIFEST).unwrap();
        let r = &m.raw;

        assert_eq!(
            get(r, "app", "android.minapi", Kind::Integer).unwrap(),
            Value::Integer(21),
        );
        assert_eq!(
            get(r, "app", "fullscreen", Kind::Boolean).unwrap(),
            Value::Boolean(false),
        );
        assert_eq!(
            get(r, "app", "requirements", Kind::List).unwrap().to_string(),
            "python3\nkivy==2.3.0",
        );
        assert_eq!(
            get(r, "app", "android.minapi", Kind::String).unwrap().to_string(),
            "21",
        );
    }

    #[test]
    fn get_errors() {
        let m = manifest::Manifest::parse_str(MANIFEST).unwrap();

        assert!(matches!(
            get(&m.raw, "app", "android.api", Kind::Integer),
            Err(Error::Missing { .. }),
        ));
        assert!(matches!(
            get(&m.raw, "app", "title", Kind::Integer),
            Err(Error::Value(manifest::ErrorValue::Integer { .. })),
        ));
    }

    #[test]
    fn kind_from_str() {
        assert_eq!("List".parse::<Kind>(), Ok(Kind::List));
        assert_eq!("int".parse::<Kind>(), Err(()));
    }
}
