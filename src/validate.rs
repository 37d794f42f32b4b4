//! Manifest Validation
//!
//! The validator inspects a resolved manifest and collects diagnostics
//! instead of stopping at the first problem. Each diagnostic names the
//! section and key it refers to and, if known, the line the key is defined
//! on. Errors make the manifest unusable for packaging, warnings point at
//! values the packaging tool accepts but likely ignores or misinterprets.
//!
//! The checks are:
//!
//!  * Required `[app]` keys are present and non-empty.
//!  * Exactly one version source is configured.
//!  * Package name and domain combine into a valid package identifier.
//!  * List values split into non-empty tokens without duplicates.
//!  * API levels are integers in a plausible range and ordered sensibly.
//!  * Enumerated values (orientation, ABIs, log level, booleans) are known.
//!  * Deprecated keys are flagged.

use crate::manifest::{self, ErrorToken, Raw, APP, BUILDOZER};
use crate::platform::{self, android};

/// Diagnostic Severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Warning,
    Error,
}

/// Validation Diagnostic
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

/// Validation Report
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [{}]", self.severity.as_str(), self.section)?;
        if let Some(key) = &self.key {
            write!(f, " {}", key)?;
        }
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl Report {
    /// Whether the report contains no errors. Warnings are allowed.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|v| v.severity == Severity::Error)
    }

    /// Number of diagnostics of the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|v| v.severity == severity).count()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Whether any diagnostic refers to the given key.
    pub fn mentions(&self, section: &str, key: &str) -> bool {
        self.diagnostics.iter().any(
            |v| v.section == section && v.key.as_deref() == Some(key)
        )
    }
}

struct Checker<'a> {
    raw: &'a Raw,
    report: Report,
}

impl<'a> Checker<'a> {
    fn push(&mut self, severity: Severity, section: &str, key: &str, message: String) {
        self.report.push(Diagnostic {
            severity: severity,
            section: section.to_string(),
            key: Some(key.to_string()),
            line: self.raw.line(section, key),
            message: message,
        });
    }

    fn error(&mut self, section: &str, key: &str, message: String) {
        self.push(Severity::Error, section, key, message)
    }

    fn warn(&mut self, section: &str, key: &str, message: String) {
        self.push(Severity::Warning, section, key, message)
    }

    // Report a value error once per key. The accessors re-run interpolation
    // on every call, so the same key may fail more than once.
    fn value_error(&mut self, section: &str, key: &str, error: manifest::ErrorValue) {
        if !self.report.mentions(section, key) {
            let message = match error {
                manifest::ErrorValue::Interpolation { source, .. } => source.to_string(),
                manifest::ErrorValue::Integer { value, .. } => {
                    format!("expected an integer, got {:?}", value)
                },
                manifest::ErrorValue::Boolean { value, .. } => {
                    format!("expected a boolean (0/1, yes/no, true/false, on/off), got {:?}", value)
                },
            };
            self.error(section, key, message);
        }
    }

    fn string(&mut self, section: &str, key: &str) -> Option<String> {
        self.raw.string(section, key).unwrap_or_else(|e| {
            self.value_error(section, key, e);
            None
        })
    }

    // Trimmed string value, `None` if missing or blank.
    fn nonempty(&mut self, section: &str, key: &str) -> Option<String> {
        self.string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn list(&mut self, section: &str, key: &str) -> Option<Vec<String>> {
        self.raw.list(section, key).unwrap_or_else(|e| {
            self.value_error(section, key, e);
            None
        })
    }

    fn integer(&mut self, section: &str, key: &str) -> Option<i64> {
        self.raw.integer(section, key).unwrap_or_else(|e| {
            self.value_error(section, key, e);
            None
        })
    }

    fn boolean(&mut self, section: &str, key: &str) -> Option<bool> {
        self.raw.boolean(section, key).unwrap_or_else(|e| {
            self.value_error(section, key, e);
            None
        })
    }

    // API level within the plausible range, `None` if missing or invalid.
    fn api_level(&mut self, key: &str) -> Option<u32> {
        let level = self.integer(APP, key)?;
        let range = android::API_LEVEL_MIN..=android::API_LEVEL_MAX;

        match u32::try_from(level) {
            Ok(v) if range.contains(&v) => Some(v),
            _ => {
                self.error(
                    APP,
                    key,
                    format!(
                        "API level {} is outside the plausible range {}..={}",
                        level,
                        android::API_LEVEL_MIN,
                        android::API_LEVEL_MAX,
                    ),
                );
                None
            },
        }
    }

    // Check list tokens
    //
    // Verify that every token is non-empty, passes `identity`, and that no
    // two tokens share the same identity. Empty tokens are reported once
    // per key.
    fn check_tokens<F>(&mut self, section: &str, key: &str, identity: F)
    where
        F: Fn(&str) -> Result<String, ErrorToken>,
    {
        let Some(tokens) = self.list(section, key) else {
            return;
        };

        let mut seen = std::collections::BTreeMap::new();
        let mut empty = false;

        for token in tokens.iter() {
            if token.is_empty() {
                empty = true;
                continue;
            }

            match identity(token) {
                Err(e) => self.error(section, key, e.to_string()),
                Ok(id) => {
                    if let Some(first) = seen.insert(id, token) {
                        self.error(
                            section,
                            key,
                            if first == token {
                                format!("duplicate entry '{}'", token)
                            } else {
                                format!("duplicate entry '{}', already listed as '{}'", token, first)
                            },
                        );
                    }
                },
            }
        }

        if empty {
            self.error(section, key, "contains an empty entry".to_string());
        }
    }

    fn check_required(&mut self) {
        if self.raw.section(APP).is_none() {
            self.report.push(Diagnostic {
                severity: Severity::Error,
                section: APP.to_string(),
                key: None,
                line: None,
                message: "section is missing".to_string(),
            });
            return;
        }

        for key in ["title", "package.name", "package.domain", "source.dir"] {
            match self.string(APP, key) {
                None if !self.report.mentions(APP, key) => {
                    self.error(APP, key, "is required".to_string());
                },
                Some(v) if v.trim().is_empty() => {
                    self.error(APP, key, "must not be empty".to_string());
                },
                _ => {},
            }
        }

        match self.list(APP, "requirements") {
            None if !self.report.mentions(APP, "requirements") => {
                self.error(APP, "requirements", "is required".to_string());
            },
            Some(v) if v.iter().all(|v| v.is_empty()) => {
                self.error(APP, "requirements", "must list at least one requirement".to_string());
            },
            _ => {},
        }
    }

    fn check_version(&mut self) {
        let version = self.nonempty(APP, "version");
        let regex = self.nonempty(APP, "version.regex");

        match (version, regex) {
            (None, None) => {
                if !self.report.mentions(APP, "version") {
                    self.error(APP, "version", "one of 'version' or 'version.regex' must be set".to_string());
                }
            },
            (Some(_), Some(_)) => {
                self.error(APP, "version.regex", "conflicts with 'version', only one can be used".to_string());
            },
            (Some(v), None) => {
                if v.chars().any(char::is_whitespace) {
                    self.error(APP, "version", format!("version {:?} must not contain whitespace", v));
                } else if !v.split('.').all(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit())) {
                    self.warn(APP, "version", format!("version {:?} is not a dot-separated numeric version", v));
                }
            },
            (None, Some(r)) => {
                if self.nonempty(APP, "version.filename").is_none()
                    && !self.report.mentions(APP, "version.filename")
                {
                    self.error(APP, "version.filename", "is required by 'version.regex'".to_string());
                }

                match regex::Regex::new(&r) {
                    Err(e) => self.error(APP, "version.regex", format!("invalid regular expression: {}", e)),
                    Ok(re) if re.captures_len() < 2 => {
                        self.error(APP, "version.regex", "must contain a capture group for the version".to_string());
                    },
                    Ok(_) => {},
                }
            },
        }
    }

    fn check_package(&mut self) {
        let name = self.nonempty(APP, "package.name");
        let domain = self.nonempty(APP, "package.domain");
        let mut valid = true;

        if let Some(v) = &name {
            if v.starts_with(|c: char| c.is_ascii_digit()) {
                self.error(APP, "package.name", "may not start with a number".to_string());
                valid = false;
            } else if !android::is_identifier(v) {
                self.error(APP, "package.name", format!("'{}' must consist of letters, digits and '_'", v));
                valid = false;
            }
        }

        if let Some(v) = &domain {
            if !android::is_package_name(v) {
                self.error(
                    APP,
                    "package.domain",
                    format!("'{}' must be at least two dot-separated identifiers, none of them a reserved word", v),
                );
                valid = false;
            }
        }

        if let (true, Some(name), Some(domain)) = (valid, name, domain) {
            let id = format!("{}.{}", domain, name).to_lowercase();
            if !android::is_package_name(&id) {
                self.error(APP, "package.name", format!("package identifier '{}' contains a reserved word", id));
            }
        }
    }

    fn check_app_lists(&mut self) {
        self.check_tokens(APP, "requirements", |v| {
            manifest::Requirement::parse(v).map(|v| v.normalized())
        });

        self.check_tokens(APP, "source.include_exts", |v| {
            if v.starts_with('.') || v.contains(|c: char| c == '/' || c.is_whitespace()) {
                Err(ErrorToken::Extension(v.to_string()))
            } else {
                Ok(v.to_ascii_lowercase())
            }
        });

        self.check_tokens(APP, "orientation", |v| {
            v.parse::<manifest::Orientation>().map(|v| v.as_str().to_string())
        });

        self.boolean(APP, "fullscreen");
    }

    fn check_buildozer(&mut self) {
        if let Some(level) = self.integer(BUILDOZER, "log_level") {
            if let Err(e) = manifest::LogLevel::from_level(level) {
                self.error(BUILDOZER, "log_level", e.to_string());
            }
        }

        self.boolean(BUILDOZER, "warn_on_root");
    }

    fn check_android(&mut self) {
        let api = self.api_level("android.api");
        let minapi = self.api_level("android.minapi");
        let ndk_api = self.api_level("android.ndk_api");

        let api = api.unwrap_or(android::DEFAULT_API);
        let minapi = minapi.unwrap_or(android::DEFAULT_MINAPI);

        if minapi > api {
            self.error(
                APP,
                "android.minapi",
                format!("minimum API level {} is above the target API level {}", minapi, api),
            );
        }

        if let Some(ndk_api) = ndk_api {
            if ndk_api > api {
                self.error(
                    APP,
                    "android.ndk_api",
                    format!("NDK API level {} is above the target API level {}", ndk_api, api),
                );
            } else if ndk_api > minapi {
                self.warn(
                    APP,
                    "android.ndk_api",
                    format!("NDK API level {} is above the minimum API level {}, native code will not load on older devices", ndk_api, minapi),
                );
            }
        }

        if let Some(ndk) = self.nonempty(APP, "android.ndk") {
            if !android::is_ndk_version(&ndk) {
                self.error(APP, "android.ndk", format!("'{}' is not an NDK release like '25b'", ndk));
            }
        }

        if self.raw.entry(APP, "android.sdk").is_some() {
            self.warn(APP, "android.sdk", "is deprecated and ignored, the SDK follows 'android.api'".to_string());
        }

        if self.raw.entry(APP, "android.arch").is_some() {
            self.warn(APP, "android.arch", "is deprecated, use 'android.archs'".to_string());

            // Without `android.archs`, the single arch is what gets built.
            if self.raw.entry(APP, "android.archs").is_none() {
                if let Some(arch) = self.nonempty(APP, "android.arch") {
                    if !android::KNOWN_ARCHS.contains(&arch.as_str()) {
                        self.error(APP, "android.arch", ErrorToken::Arch(arch).to_string());
                    }
                }
            }
        }

        self.check_tokens(APP, "android.archs", |v| {
            if android::KNOWN_ARCHS.contains(&v) {
                Ok(v.to_string())
            } else {
                Err(ErrorToken::Arch(v.to_string()))
            }
        });

        self.check_tokens(APP, "android.permissions", |v| {
            manifest::Permission::parse(v).map(|v| v.name)
        });
    }
}

/// Validate manifest
///
/// Run all checks for the given target platform on the resolved manifest
/// and return the collected diagnostics in check order.
pub fn validate(raw: &Raw, target: platform::Id) -> Report {
    let mut checker = Checker {
        raw: raw,
        report: Report::default(),
    };

    checker.check_required();
    checker.check_version();
    checker.check_package();
    checker.check_app_lists();
    checker.check_buildozer();

    match target {
        platform::Id::Android => checker.check_android(),
    }

    tracing::debug!(
        target_platform = target.as_str(),
        diagnostics = checker.report.diagnostics.len(),
        "validated manifest",
    );

    checker.report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    const VALID: &str = "
[app]
title = Gold Shop Manager
package.name = goldshopmanager
package.domain = org.goldshop
source.dir = .
source.include_exts = py,png,jpg,kv,atlas,ttf
version = 1.0.0
requirements = python3,kivy==2.3.0,kivymd,pillow,plyer,arabic-reshaper,python-bidi
orientation = portrait
fullscreen = 0
android.permissions = INTERNET, (name=android.permission.WRITE_EXTERNAL_STORAGE;maxSdkVersion=18)
android.api = 33
android.minapi = 21
android.ndk = 25b
android.archs = arm64-v8a, armeabi-v7a

[buildozer]
log_level = 2
warn_on_root = 1
";

    fn check(s: &str) -> Report {
        let m = Manifest::parse_str(s).unwrap();
        validate(&m.raw, platform::Id::Android)
    }

    // Return `(severity, key, line)` of all diagnostics for compact
    // assertions.
    fn summary(r: &Report) -> Vec<(Severity, String, Option<usize>)> {
        r.diagnostics.iter().map(
            |v| (v.severity, v.key.clone().unwrap_or_default(), v.line)
        ).collect()
    }

    #[test]
    fn valid_manifest() {
        let r = check(VALID);

        assert!(r.is_valid());
        assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    }

    #[test]
    fn missing_section() {
        let r = check("[buildozer]\nlog_level = 1\n");

        assert!(!r.is_valid());
        assert_eq!(r.diagnostics[0].key, None);
        assert_eq!(r.diagnostics[0].to_string(), "error: [app]: section is missing");
    }

    #[test]
    fn required_keys() {
        let r = check("[app]\ntitle =\nversion = 1.0\n");

        assert_eq!(
            summary(&r),
            vec![
                (Severity::Error, "title".to_string(), Some(2)),
                (Severity::Error, "package.name".to_string(), None),
                (Severity::Error, "package.domain".to_string(), None),
                (Severity::Error, "source.dir".to_string(), None),
                (Severity::Error, "requirements".to_string(), None),
            ],
        );
        assert_eq!(r.diagnostics[0].to_string(), "error: [app] title (line 2): must not be empty");
    }

    #[test]
    fn version_sources() {
        let r = check(&VALID.replace("version = 1.0.0", "version.regex = v(\nversion.filename = main.py"));
        assert_eq!(summary(&r), vec![(Severity::Error, "version.regex".to_string(), Some(8))]);

        let r = check(&VALID.replace("version = 1.0.0", "version.regex = __version__"));
        assert_eq!(
            summary(&r),
            vec![
                (Severity::Error, "version.filename".to_string(), None),
                (Severity::Error, "version.regex".to_string(), Some(8)),
            ],
        );

        let r = check(&VALID.replace("version = 1.0.0", "version = 1.0.0\nversion.regex = (.*)"));
        assert_eq!(summary(&r), vec![(Severity::Error, "version.regex".to_string(), Some(9))]);

        let r = check(&VALID.replace("version = 1.0.0", "version = 1.0-beta"));
        assert_eq!(summary(&r), vec![(Severity::Warning, "version".to_string(), Some(8))]);
        assert!(r.is_valid());

        let r = check(&VALID.replace("version = 1.0.0", ""));
        assert_eq!(summary(&r), vec![(Severity::Error, "version".to_string(), None)]);
    }

    #[test]
    fn package_identifier() {
        let r = check(&VALID.replace("package.name = goldshopmanager", "package.name = 1shop"));
        assert_eq!(summary(&r), vec![(Severity::Error, "package.name".to_string(), Some(4))]);

        let r = check(&VALID.replace("package.name = goldshopmanager", "package.name = gold-shop"));
        assert_eq!(summary(&r), vec![(Severity::Error, "package.name".to_string(), Some(4))]);

        let r = check(&VALID.replace("package.domain = org.goldshop", "package.domain = goldshop"));
        assert_eq!(summary(&r), vec![(Severity::Error, "package.domain".to_string(), Some(5))]);

        let r = check(&VALID.replace("package.name = goldshopmanager", "package.name = Native"));
        assert_eq!(summary(&r), vec![(Severity::Error, "package.name".to_string(), Some(4))]);
    }

    // Lists must split into non-empty, unique tokens.
    #[test]
    fn list_tokens() {
        let r = check(&VALID.replace(
            "requirements = python3,kivy==2.3.0,kivymd,pillow,plyer,arabic-reshaper,python-bidi",
            "requirements = python3,kivy,,Kivy==2.3.0,arabic_reshaper,arabic-reshaper,",
        ));
        let messages: Vec<String> = r.diagnostics.iter().map(|v| v.message.clone()).collect();

        assert_eq!(
            messages,
            vec![
                "duplicate entry 'Kivy==2.3.0', already listed as 'kivy'",
                "duplicate entry 'arabic-reshaper', already listed as 'arabic_reshaper'",
                "contains an empty entry",
            ],
        );

        let r = check(&VALID.replace(
            "android.permissions = INTERNET, (name=android.permission.WRITE_EXTERNAL_STORAGE;maxSdkVersion=18)",
            "android.permissions = INTERNET, android.permission.INTERNET, CAMERA, camera",
        ));
        let messages: Vec<String> = r.diagnostics.iter().map(|v| v.message.clone()).collect();

        assert_eq!(
            messages,
            vec![
                "duplicate entry 'android.permission.INTERNET', already listed as 'INTERNET'",
                "invalid permission name 'camera'",
            ],
        );
        assert!(r.diagnostics.iter().all(|v| v.line == Some(12)));
    }

    #[test]
    fn enumerations() {
        let r = check(
            &VALID
                .replace("orientation = portrait", "orientation = portrait, sideways")
                .replace("android.archs = arm64-v8a, armeabi-v7a", "android.archs = arm64-v8a, mips")
                .replace("fullscreen = 0", "fullscreen = maybe")
                .replace("log_level = 2", "log_level = 5")
                .replace("android.ndk = 25b", "android.ndk = r25"),
        );

        assert_eq!(
            summary(&r),
            vec![
                (Severity::Error, "orientation".to_string(), Some(10)),
                (Severity::Error, "fullscreen".to_string(), Some(11)),
                (Severity::Error, "log_level".to_string(), Some(19)),
                (Severity::Error, "android.ndk".to_string(), Some(15)),
                (Severity::Error, "android.archs".to_string(), Some(16)),
            ],
        );
    }

    // API levels must be integers in the plausible range, with the minimum
    // not above the target.
    #[test]
    fn api_levels() {
        let r = check(&VALID.replace("android.minapi = 21", "android.minapi = twenty"));
        assert_eq!(r.diagnostics[0].message, "expected an integer, got \"twenty\"");

        let r = check(&VALID.replace("android.api = 33", "android.api = 99"));
        assert_eq!(r.diagnostics[0].message, "API level 99 is outside the plausible range 1..=40");

        let r = check(&VALID.replace("android.minapi = 21", "android.minapi = 34"));
        assert_eq!(summary(&r), vec![(Severity::Error, "android.minapi".to_string(), Some(14))]);

        let r = check(&VALID.replace("android.minapi = 21", "android.minapi = 21\nandroid.ndk_api = 24"));
        assert_eq!(summary(&r), vec![(Severity::Warning, "android.ndk_api".to_string(), Some(15))]);
        assert!(r.is_valid());
    }

    #[test]
    fn deprecated_keys() {
        let r = check(&VALID.replace("android.ndk = 25b", "android.ndk = 25b\nandroid.sdk = 20\nandroid.arch = x86"));

        assert_eq!(
            summary(&r),
            vec![
                (Severity::Warning, "android.sdk".to_string(), Some(16)),
                (Severity::Warning, "android.arch".to_string(), Some(17)),
            ],
        );
    }

    #[test]
    fn deprecated_arch_is_checked() {
        let r = check(&VALID.replace("android.archs = arm64-v8a, armeabi-v7a", "android.arch = mips"));

        assert_eq!(
            summary(&r),
            vec![
                (Severity::Warning, "android.arch".to_string(), Some(16)),
                (Severity::Error, "android.arch".to_string(), Some(16)),
            ],
        );
        assert_eq!(r.diagnostics[1].message, "unknown architecture 'mips'");
        assert!(!r.is_valid());

        let r = check(&VALID.replace("android.archs = arm64-v8a, armeabi-v7a", "android.arch = x86_64"));
        assert_eq!(summary(&r), vec![(Severity::Warning, "android.arch".to_string(), Some(16))]);
    }

    #[test]
    fn interpolation_failures() {
        let r = check(&VALID.replace("source.dir = .", "source.dir = %(root)s"));

        assert_eq!(summary(&r), vec![(Severity::Error, "source.dir".to_string(), Some(6))]);
        assert_eq!(r.diagnostics[0].message, "reference to undefined key 'root'");
    }
}
