//! Android Platform Integration
//!
//! This module collects what a packaging manifest has to get right to target
//! the Android platform. Android applications are identified by their
//! package name, a reverse-domain identifier like `org.goldshop.manager`. The
//! manifest splits it into `package.domain` and `package.name`, and the
//! packaging tool joins them with a dot and lowercases the result. Every
//! dot-separated segment must be a valid Java identifier, since the package
//! name doubles as the Java namespace of the generated entry-point code.
//!
//! Compatibility is expressed through API levels. `android.api` is the
//! target API level the application declares compatibility with,
//! `android.minapi` the oldest platform it still installs on, and
//! `android.ndk_api` the level native code is compiled against. The NDK
//! itself is selected by its release name (`25b`). Native code is built for
//! each ABI listed in `android.archs`.
//!
//! Permissions requested in `android.permissions` are either bare names in
//! the platform namespace (`INTERNET`), fully qualified names
//! (`com.vendor.permission.CUSTOM`), or attribute lists that restrict a
//! permission to old platforms:
//!
//! ```text
//! android.permissions = INTERNET, (name=android.permission.WRITE_EXTERNAL_STORAGE;maxSdkVersion=18)
//! ```

/// Lowest API level accepted as plausible.
pub const API_LEVEL_MIN: u32 = 1;
/// Highest API level accepted as plausible.
pub const API_LEVEL_MAX: u32 = 40;

/// Target API level used if `android.api` is not set.
pub const DEFAULT_API: u32 = 33;
/// Minimum API level used if `android.minapi` is not set.
pub const DEFAULT_MINAPI: u32 = 21;
/// NDK release used if `android.ndk` is not set.
pub const DEFAULT_NDK: &str = "25b";
/// ABIs built if `android.archs` is not set.
pub const DEFAULT_ARCHS: &[&str] = &["arm64-v8a", "armeabi-v7a"];

/// ABIs supported by the Android NDK.
pub const KNOWN_ARCHS: &[&str] = &["arm64-v8a", "armeabi-v7a", "x86", "x86_64"];

/// Namespace of platform permissions given by their bare name.
pub const PERMISSION_NAMESPACE: &str = "android.permission.";

/// Reserved words that cannot be used as package name segments.
pub const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char",
    "class", "const", "continue", "default", "do", "double", "else", "enum",
    "extends", "false", "final", "finally", "float", "for", "goto", "if",
    "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch",
    "synchronized", "this", "throw", "throws", "transient", "true", "try",
    "void", "volatile", "while",
];

/// Check whether a string is a valid identifier
///
/// This verifies that the given string consists of only ASCII alphanumeric
/// characters plus `_`, and does not start with a digit. Empty identifiers
/// are rejected.
pub fn is_identifier(s: &str) -> bool {
    s.starts_with(|v: char| v.is_ascii_alphabetic() || v == '_')
        && s.chars().all(|v| v.is_ascii_alphanumeric() || v == '_')
}

/// Check whether a string is a valid package name
///
/// A package name is a dot-separated list of at least two identifiers, none
/// of them a reserved word.
pub fn is_package_name(s: &str) -> bool {
    s.split('.').count() >= 2
        && s.split('.').all(|v| is_identifier(v) && !JAVA_KEYWORDS.contains(&v))
}

/// Check whether a string names an NDK release
///
/// NDK releases are a major version optionally followed by a single
/// lowercase revision letter, e.g. `25` or `25b`.
pub fn is_ndk_version(s: &str) -> bool {
    let digits = s.trim_end_matches(|v: char| v.is_ascii_lowercase());

    !digits.is_empty()
        && s.len() - digits.len() <= 1
        && digits.chars().all(|v| v.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("goldshopmanager"));
        assert!(is_identifier("_gold2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2gold"));
        assert!(!is_identifier("gold-shop"));
    }

    #[test]
    fn package_names() {
        assert!(is_package_name("org.goldshop"));
        assert!(is_package_name("android.permission.INTERNET"));
        assert!(!is_package_name("goldshop"));
        assert!(!is_package_name("org..goldshop"));
        assert!(!is_package_name("org.1shop"));
        assert!(!is_package_name("org.new.shop"));
    }

    #[test]
    fn ndk_versions() {
        assert!(is_ndk_version("25b"));
        assert!(is_ndk_version("23"));
        assert!(!is_ndk_version("r25b"));
        assert!(!is_ndk_version("25bc"));
        assert!(!is_ndk_version("b"));
        assert!(!is_ndk_version("25.1"));
    }
}
