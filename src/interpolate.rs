//! Value Interpolation
//!
//! Manifest values can refer to other keys of the same section with the
//! `%(name)s` syntax, e.g. `icon.filename = %(source.dir)s/data/icon.png`.
//! A literal percent sign is written as `%%`. References are expanded
//! recursively up to `MAX_DEPTH` levels.

/// Maximum nesting of references.
pub const MAX_DEPTH: usize = 10;

/// Interpolation Errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The referenced key does not exist or has no value.
    #[error("reference to undefined key '{0}'")]
    Missing(String),
    /// A `%` is not followed by `%` or a `(name)s` reference.
    #[error("malformed reference in {0:?}, '%' must be followed by '%' or '(name)s'")]
    Syntax(String),
    /// References nest too deep, usually due to a reference cycle.
    #[error("references nest deeper than {max} levels in {0:?}", max = MAX_DEPTH)]
    Depth(String),
}

/// Expand references
///
/// Expand all references in `value`. The `lookup` callback resolves a key
/// name to its raw (unexpanded) value.
pub fn expand<'a, F>(value: &str, lookup: &F) -> Result<String, Error>
where
    F: Fn(&str) -> Option<&'a str>,
{
    expand_depth(value, lookup, 0)
}

fn expand_depth<'a, F>(value: &str, lookup: &F, depth: usize) -> Result<String, Error>
where
    F: Fn(&str) -> Option<&'a str>,
{
    if depth > MAX_DEPTH {
        return Err(Error::Depth(value.to_string()));
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(after) = tail.strip_prefix('%') {
            out.push('%');
            rest = after;
        } else if let Some(reference) = tail.strip_prefix('(') {
            let end = reference
                .find(')')
                .ok_or_else(|| Error::Syntax(value.to_string()))?;
            let name = &reference[..end];
            let after = reference[end + 1..]
                .strip_prefix('s')
                .ok_or_else(|| Error::Syntax(value.to_string()))?;

            if name.is_empty() {
                return Err(Error::Syntax(value.to_string()));
            }

            let target = lookup(name).ok_or_else(|| Error::Missing(name.to_string()))?;
            out.push_str(&expand_depth(target, lookup, depth + 1)?);
            rest = after;
        } else {
            return Err(Error::Syntax(value.to_string()));
        }
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table<'a>(entries: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<&'a str> {
        move |name: &str| entries.iter().find(|v| v.0 == name).map(|v| v.1)
    }

    #[test]
    fn expand_plain() {
        let lookup = table(&[]);

        assert_eq!(expand("Gold Shop", &lookup).unwrap(), "Gold Shop");
        assert_eq!(expand("100%%", &lookup).unwrap(), "100%");
    }

    #[test]
    fn expand_nested() {
        let lookup = table(&[
            ("source.dir", "%(root)s/src"),
            ("root", "."),
        ]);

        assert_eq!(
            expand("%(source.dir)s/data/icon.png", &lookup).unwrap(),
            "./src/data/icon.png",
        );
    }

    #[test]
    fn expand_errors() {
        let lookup = table(&[("loop", "%(loop)s")]);

        assert_eq!(expand("%(nope)s", &lookup), Err(Error::Missing("nope".to_string())));
        assert_eq!(expand("50%", &lookup), Err(Error::Syntax("50%".to_string())));
        assert_eq!(expand("%(open", &lookup), Err(Error::Syntax("%(open".to_string())));
        assert_eq!(expand("%(x)d", &lookup), Err(Error::Syntax("%(x)d".to_string())));
        assert_eq!(expand("%()s", &lookup), Err(Error::Syntax("%()s".to_string())));
        assert_eq!(expand("%(loop)s", &lookup), Err(Error::Depth("%(loop)s".to_string())));
    }
}
