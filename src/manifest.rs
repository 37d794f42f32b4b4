//! Packaging Manifest
//!
//! This is a rust implementation of the packaging manifest format.
//! Applications use the manifest to describe how the external packaging tool
//! assembles their bundle.
//!
//! A manifest is resolved in two steps. First, the text is parsed into an
//! [`ini::Document`](crate::ini::Document). Then the document is resolved
//! into a `Raw` manifest by applying the selected profile and environment
//! overrides. `Raw` offers typed accessors that interpolate values, and typed
//! views of the well-known sections. Semantic verification is done by
//! [`validate`](crate::validate).

use crate::{ini, interpolate, platform::android};

/// Name of the application section.
pub const APP: &str = "app";
/// Name of the packaging-tool section.
pub const BUILDOZER: &str = "buildozer";
/// Name of the section providing fallback values for all other sections.
pub const DEFAULT: &str = "DEFAULT";

/// Manifest Errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the manifest file failed.
    #[error("cannot read manifest {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    /// The manifest text is not a valid document.
    #[error("cannot parse manifest: {0}")]
    Syntax(#[from] ini::Error),
}

/// Value Errors
///
/// Raised by the typed accessors of `Raw` if a value cannot be interpolated
/// or converted into the requested type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValue {
    #[error("[{section}] {key}: {source}")]
    Interpolation {
        section: String,
        key: String,
        source: interpolate::Error,
    },
    #[error("[{section}] {key}: expected an integer, got {value:?}")]
    Integer {
        section: String,
        key: String,
        value: String,
    },
    #[error("[{section}] {key}: expected a boolean, got {value:?}")]
    Boolean {
        section: String,
        key: String,
        value: String,
    },
}

/// Token Errors
///
/// Raised when a single list token or enumerated value is malformed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorToken {
    #[error("empty entry")]
    Empty,
    #[error("invalid requirement '{0}'")]
    Requirement(String),
    #[error("invalid permission name '{0}'")]
    PermissionName(String),
    #[error("malformed permission attributes '{0}'")]
    PermissionAttributes(String),
    #[error("invalid maxSdkVersion '{0}'")]
    MaxSdkVersion(String),
    #[error("unknown orientation '{0}'")]
    Orientation(String),
    #[error("unknown architecture '{0}'")]
    Arch(String),
    #[error("invalid file extension '{0}'")]
    Extension(String),
    #[error("log level {0} is not one of 0 (error), 1 (info) or 2 (debug)")]
    LogLevel(i64),
}

/// View Errors
///
/// Raised when a typed view of a section cannot be constructed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorView {
    /// Specified key required but missing in manifest.
    #[error("manifest configuration missing '{0}'")]
    MissingKey(&'static str),
    #[error(transparent)]
    Value(#[from] ErrorValue),
    #[error("[{section}] {key}: {source}")]
    Token {
        section: &'static str,
        key: &'static str,
        source: ErrorToken,
    },
}

/// Version Resolution Errors
#[derive(Debug, thiserror::Error)]
pub enum ErrorVersion {
    #[error("cannot read version file {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("invalid version.regex: {0}")]
    Regex(#[from] regex::Error),
    #[error("version.regex has no capture group")]
    NoGroup,
    #[error("version.regex does not match {0:?}")]
    NoMatch(std::path::PathBuf),
}

/// Origin of a raw value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Defined in its own section of the document.
    Document,
    /// Merged from the named profile section.
    Profile(String),
    /// Replaced by the named environment variable.
    Environment(String),
}

/// Raw Manifest Entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEntry {
    pub key: String,
    /// Delimiter between key and value in the source line.
    pub delimiter: Option<char>,
    /// Uninterpolated value, `None` for keys without value.
    pub value: Option<String>,
    /// Line of the key in the document it was defined in.
    pub line: usize,
    pub origin: Origin,
}

/// Raw Manifest Section
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSection {
    pub name: String,
    pub line: usize,
    pub entries: Vec<RawEntry>,
}

/// Raw Manifest Content
///
/// This type contains the effective manifest content after profile and
/// environment overrides were applied. Values are kept uninterpolated; the
/// typed accessors interpolate on access.
///
/// Note that content of the type is not verified other than for syntactic
/// correctness. Semantic correctness needs to be verified by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Raw {
    pub sections: Vec<RawSection>,
}

/// Resolution Options
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Profile to apply, selecting `[section@profile]` sections.
    pub profile: Option<String>,
    /// Environment to source `SECTION_KEY` overrides from.
    pub env: std::collections::BTreeMap<String, String>,
}

/// Screen Orientation
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Landscape,
    Portrait,
    LandscapeReverse,
    PortraitReverse,
}

/// Packaging Tool Log Level
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Error,
    Info,
    Debug,
}

/// Runtime Requirement
///
/// A single entry of the `requirements` list, e.g. `kivy==2.3.0`. The
/// constraint is kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Requirement {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

/// Platform Permission
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Permission {
    /// Fully qualified permission name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sdk_version: Option<u32>,
}

/// Application Version Source
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum VersionSource {
    /// Version given literally via `version`.
    Literal { version: String },
    /// Version extracted from a file via `version.regex` and
    /// `version.filename`.
    Regex { regex: String, filename: String },
}

/// View of the `[app]` section
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewApp {
    pub title: String,
    pub package_name: String,
    pub package_domain: String,
    pub source_dir: String,
    pub source_include_exts: Vec<String>,
    pub version: VersionSource,
    pub orientation: Vec<Orientation>,
    pub requirements: Vec<Requirement>,
    pub fullscreen: bool,
}

/// View of the `android.*` keys of the `[app]` section
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewAndroid {
    pub api: u32,
    pub minapi: u32,
    pub ndk: String,
    pub ndk_api: u32,
    pub archs: Vec<String>,
    pub permissions: Vec<Permission>,
}

/// View of the `[buildozer]` section
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewBuildozer {
    pub log_level: LogLevel,
    pub warn_on_root: bool,
}

/// Manifest Abstraction
///
/// This type represents a syntactically valid manifest with profile and
/// environment overrides applied. `base` is the directory of the manifest
/// file, if it was read from the file-system. Relative paths in the manifest
/// are resolved against it.
#[derive(Clone, Debug)]
pub struct Manifest {
    pub raw: Raw,
    pub base: Option<std::path::PathBuf>,
}

impl Orientation {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::LandscapeReverse => "landscape-reverse",
            Orientation::PortraitReverse => "portrait-reverse",
        }
    }
}

// Orientations are matched case-insensitively, like platform identifiers.
impl std::str::FromStr for Orientation {
    type Err = ErrorToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Orientation::Landscape,
            Orientation::Portrait,
            Orientation::LandscapeReverse,
            Orientation::PortraitReverse,
        ]
            .into_iter()
            .find(|v| s.eq_ignore_ascii_case(v.as_str()))
            .ok_or_else(|| ErrorToken::Orientation(s.to_string()))
    }
}

impl LogLevel {
    /// Map the numeric manifest level to a log level.
    pub fn from_level(level: i64) -> Result<Self, ErrorToken> {
        match level {
            0 => Ok(LogLevel::Error),
            1 => Ok(LogLevel::Info),
            2 => Ok(LogLevel::Debug),
            v => Err(ErrorToken::LogLevel(v)),
        }
    }
}

impl Requirement {
    /// Parse requirement token
    ///
    /// Accepts a bare distribution name, a name followed by a version
    /// constraint (`==`, `>=`, `<`, `!=`, `~=`), or `name @ url`.
    pub fn parse(token: &str) -> Result<Self, ErrorToken> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ErrorToken::Empty);
        }

        let (name, constraint) = if let Some((name, url)) = token.split_once('@') {
            (name.trim(), Some(format!("@ {}", url.trim())))
        } else if let Some(pos) = token.find(|v: char| "=<>!~".contains(v)) {
            (token[..pos].trim(), Some(token[pos..].trim().to_string()))
        } else {
            (token, None)
        };

        if name.is_empty()
            || !name.chars().all(|v| v.is_ascii_alphanumeric() || v == '-' || v == '_' || v == '.')
        {
            return Err(ErrorToken::Requirement(token.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            constraint: constraint,
        })
    }

    /// Return the normalized name
    ///
    /// Distribution names compare case-insensitively and treat `-`, `_` and
    /// `.` as equal. The normalized name folds them to `_`.
    pub fn normalized(&self) -> String {
        self.name
            .to_ascii_lowercase()
            .replace(|v: char| v == '-' || v == '.', "_")
    }
}

impl Permission {
    // Resolve a permission name into its fully qualified form.
    fn resolve(name: &str) -> Result<String, ErrorToken> {
        if name.contains('.') {
            if android::is_package_name(name) {
                Ok(name.to_string())
            } else {
                Err(ErrorToken::PermissionName(name.to_string()))
            }
        } else if name.starts_with(|v: char| v.is_ascii_uppercase())
            && name.chars().all(|v| v.is_ascii_uppercase() || v.is_ascii_digit() || v == '_')
        {
            Ok(format!("{}{}", android::PERMISSION_NAMESPACE, name))
        } else {
            Err(ErrorToken::PermissionName(name.to_string()))
        }
    }

    /// Parse permission token
    ///
    /// Bare names are resolved into the platform namespace. The attribute
    /// form `(name=...;maxSdkVersion=...)` requires `name` and allows an
    /// integer `maxSdkVersion`.
    pub fn parse(token: &str) -> Result<Self, ErrorToken> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ErrorToken::Empty);
        }

        let Some(inner) = token.strip_prefix('(') else {
            return Ok(Self {
                name: Self::resolve(token)?,
                max_sdk_version: None,
            });
        };

        let attributes = || ErrorToken::PermissionAttributes(token.to_string());
        let inner = inner.strip_suffix(')').ok_or_else(attributes)?;
        let mut name = None;
        let mut max_sdk_version = None;

        for attribute in inner.split(';') {
            let (k, v) = attribute.split_once('=').ok_or_else(attributes)?;
            let v = v.trim();
            match k.trim() {
                "name" if name.is_none() => name = Some(v),
                "maxSdkVersion" if max_sdk_version.is_none() => {
                    max_sdk_version = Some(
                        v.parse::<u32>()
                            .map_err(|_| ErrorToken::MaxSdkVersion(v.to_string()))?,
                    );
                },
                _ => return Err(attributes()),
            }
        }

        Ok(Self {
            name: Self::resolve(name.ok_or_else(attributes)?)?,
            max_sdk_version: max_sdk_version,
        })
    }
}

impl VersionSource {
    /// Resolve the application version
    ///
    /// Return the literal version, or read `filename` relative to `base` and
    /// return the first capture group of `regex`.
    pub fn resolve(&self, base: &std::path::Path) -> Result<String, ErrorVersion> {
        match self {
            VersionSource::Literal { version } => Ok(version.clone()),
            VersionSource::Regex { regex, filename } => {
                let re = regex::Regex::new(regex)?;
                if re.captures_len() < 2 {
                    return Err(ErrorVersion::NoGroup);
                }

                let path = base.join(filename);
                let content = std::fs::read_to_string(&path)
                    .map_err(|v| ErrorVersion::Io { path: path.clone(), source: v })?;

                re.captures(&content)
                    .and_then(|v| v.get(1))
                    .map(|v| v.as_str().to_string())
                    .ok_or(ErrorVersion::NoMatch(path))
            },
        }
    }
}

impl ViewApp {
    /// Return the full package identifier
    ///
    /// This is `package.domain` and `package.name` joined by a dot and
    /// lowercased, as used by the packaging tool.
    pub fn package_id(&self) -> String {
        format!("{}.{}", self.package_domain, self.package_name).to_lowercase()
    }
}

/// Split a comma-separated list
///
/// Tokens are trimmed. Empty tokens are retained, so callers can detect
/// stray commas. An empty or blank value yields an empty list.
pub fn split_list(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    value.split(',').map(|v| v.trim().to_string()).collect()
}

impl RawSection {
    fn from_section(section: &ini::Section, origin: &Origin) -> Self {
        Self {
            name: section.name.clone(),
            line: section.line,
            entries: section.entries.iter().map(
                |v| RawEntry {
                    key: v.key.clone(),
                    delimiter: v.delimiter,
                    value: v.value.clone(),
                    line: v.line,
                    origin: origin.clone(),
                }
            ).collect(),
        }
    }

    /// Find an entry by key.
    pub fn get(&self, key: &str) -> Option<&RawEntry> {
        self.entries.iter().find(|v| v.key == key)
    }

    fn upsert(&mut self, entry: RawEntry) {
        match self.entries.iter_mut().find(|v| v.key == entry.key) {
            Some(v) => *v = entry,
            None => self.entries.push(entry),
        }
    }
}

impl Raw {
    /// Environment variable name overriding a key
    ///
    /// This is `SECTION_KEY` in uppercase, with every character other than
    /// ASCII alphanumerics replaced by `_`. For example, `android.minapi` in
    /// `[app]` is overridden by `APP_ANDROID_MINAPI`.
    pub fn env_name(section: &str, key: &str) -> String {
        format!("{}_{}", section, key)
            .chars()
            .map(|v| if v.is_ascii_alphanumeric() { v.to_ascii_uppercase() } else { '_' })
            .collect()
    }

    /// Resolve document into raw manifest
    ///
    /// Sections named `base@p1,p2` are profile sections. They are dropped,
    /// unless the selected profile is listed, in which case their entries are
    /// merged into `base`. Afterwards, environment overrides replace the
    /// values of existing keys.
    pub fn from_document(document: &ini::Document, options: &Options) -> Self {
        let mut raw = Raw::default();
        let mut profiles = Vec::new();

        for section in document.sections() {
            match section.name.split_once('@') {
                Some((base, names)) => profiles.push((base.trim(), names, section)),
                None => raw.sections.push(RawSection::from_section(section, &Origin::Document)),
            }
        }

        if let Some(profile) = options.profile.as_deref() {
            for (base, names, section) in profiles {
                if !names.split(',').any(|v| v.trim() == profile) {
                    continue;
                }

                tracing::debug!(section = %section.name, profile, "applying profile section");

                let origin = Origin::Profile(section.name.clone());
                let overlay = RawSection::from_section(section, &origin);
                let idx = match raw.sections.iter().position(|v| v.name == base) {
                    Some(idx) => idx,
                    None => {
                        raw.sections.push(RawSection {
                            name: base.to_string(),
                            line: section.line,
                            entries: Vec::new(),
                        });
                        raw.sections.len() - 1
                    },
                };

                for entry in overlay.entries {
                    raw.sections[idx].upsert(entry);
                }
            }
        }

        for section in raw.sections.iter_mut() {
            for entry in section.entries.iter_mut() {
                let variable = Self::env_name(&section.name, &entry.key);
                if let Some(v) = options.env.get(&variable) {
                    tracing::debug!(%variable, "applying environment override");
                    entry.value = Some(v.clone());
                    entry.origin = Origin::Environment(variable);
                }
            }
        }

        raw
    }

    /// Find a section by name.
    pub fn section(&self, name: &str) -> Option<&RawSection> {
        self.sections.iter().find(|v| v.name == name)
    }

    /// Find an entry
    ///
    /// Search the entry in its section and fall back to the `[DEFAULT]`
    /// section.
    pub fn entry(&self, section: &str, key: &str) -> Option<&RawEntry> {
        self.section(section)
            .and_then(|v| v.get(key))
            .or_else(|| self.section(DEFAULT).and_then(|v| v.get(key)))
    }

    /// Return the line a key is defined on
    ///
    /// For keys provided as list section (`[section:key]`), this is the line
    /// of the section header.
    pub fn line(&self, section: &str, key: &str) -> Option<usize> {
        self.section(&format!("{}:{}", section, key))
            .map(|v| v.line)
            .or_else(|| self.entry(section, key).map(|v| v.line))
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        self.entry(section, key).and_then(|v| v.value.as_deref())
    }

    /// Return interpolated string value
    ///
    /// Returns `None` if the key is missing, and an empty string for keys
    /// without value.
    pub fn string(&self, section: &str, key: &str) -> Result<Option<String>, ErrorValue> {
        let Some(entry) = self.entry(section, key) else {
            return Ok(None);
        };
        let Some(value) = entry.value.as_deref() else {
            return Ok(Some(String::new()));
        };

        interpolate::expand(value, &|name: &str| self.lookup(section, name))
            .map(Some)
            .map_err(|v| ErrorValue::Interpolation {
                section: section.to_string(),
                key: key.to_string(),
                source: v,
            })
    }

    /// Return list value
    ///
    /// A list section `[section:key]` takes precedence; each of its lines
    /// forms one token, rebuilt from key, delimiter and value. Otherwise the
    /// value is split on commas, see `split_list()`. Tokens of both forms are
    /// interpolated against `section`.
    pub fn list(&self, section: &str, key: &str) -> Result<Option<Vec<String>>, ErrorValue> {
        if let Some(list) = self.section(&format!("{}:{}", section, key)) {
            return list.entries.iter().map(
                |v| {
                    let token = match (v.delimiter, v.value.as_deref()) {
                        (Some(d), Some(value)) => format!("{}{}{}", v.key, d, value),
                        _ => v.key.clone(),
                    };
                    interpolate::expand(&token, &|name: &str| self.lookup(section, name))
                        .map_err(|e| ErrorValue::Interpolation {
                            section: section.to_string(),
                            key: key.to_string(),
                            source: e,
                        })
                }
            ).collect::<Result<Vec<_>, _>>().map(Some);
        }

        Ok(self.string(section, key)?.map(|v| split_list(&v)))
    }

    /// Return integer value
    pub fn integer(&self, section: &str, key: &str) -> Result<Option<i64>, ErrorValue> {
        match self.string(section, key)? {
            None => Ok(None),
            Some(v) => v.trim().parse::<i64>().map(Some).map_err(
                |_| ErrorValue::Integer {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: v,
                }
            ),
        }
    }

    /// Return boolean value
    ///
    /// Accepts `1`, `yes`, `true`, `on` and `0`, `no`, `false`, `off`,
    /// case-insensitively.
    pub fn boolean(&self, section: &str, key: &str) -> Result<Option<bool>, ErrorValue> {
        match self.string(section, key)? {
            None => Ok(None),
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "yes" | "true" | "on" => Ok(Some(true)),
                "0" | "no" | "false" | "off" => Ok(Some(false)),
                _ => Err(ErrorValue::Boolean {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: v,
                }),
            },
        }
    }

    // Integer value that must fit an unsigned 32-bit number.
    fn unsigned(&self, section: &str, key: &str) -> Result<Option<u32>, ErrorValue> {
        match self.integer(section, key)? {
            None => Ok(None),
            Some(v) => u32::try_from(v).map(Some).map_err(
                |_| ErrorValue::Integer {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: v.to_string(),
                }
            ),
        }
    }

    // Non-empty string value, or `ErrorView::MissingKey`.
    fn required(&self, section: &str, key: &'static str) -> Result<String, ErrorView> {
        match self.string(section, key)? {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ErrorView::MissingKey(key)),
        }
    }

    // List value with every token parsed by `f`.
    fn tokens<T, F>(
        &self,
        key: &'static str,
        default: &[&str],
        f: F,
    ) -> Result<Vec<T>, ErrorView>
    where
        F: Fn(&str) -> Result<T, ErrorToken>,
    {
        let list = self
            .list(APP, key)?
            .unwrap_or_else(|| default.iter().map(|v| v.to_string()).collect());

        list.iter()
            .map(|v| f(v).map_err(|e| ErrorView::Token { section: APP, key: key, source: e }))
            .collect()
    }

    /// Return the version source of the `[app]` section
    ///
    /// Only reads `version`, `version.regex` and `version.filename`. A literal
    /// `version` wins over `version.regex`.
    pub fn version_source(&self) -> Result<VersionSource, ErrorView> {
        match (
            self.string(APP, "version")?.filter(|v| !v.trim().is_empty()),
            self.string(APP, "version.regex")?.filter(|v| !v.trim().is_empty()),
        ) {
            (Some(v), _) => Ok(VersionSource::Literal { version: v }),
            (None, Some(regex)) => Ok(VersionSource::Regex {
                regex: regex,
                filename: self.required(APP, "version.filename")?,
            }),
            (None, None) => Err(ErrorView::MissingKey("version")),
        }
    }

    /// Return view of the `[app]` section
    pub fn view_app(&self) -> Result<ViewApp, ErrorView> {
        let version = self.version_source()?;

        let requirements = self.tokens("requirements", &[], Requirement::parse)?;
        if requirements.is_empty() {
            return Err(ErrorView::MissingKey("requirements"));
        }

        Ok(ViewApp {
            title: self.required(APP, "title")?,
            package_name: self.required(APP, "package.name")?,
            package_domain: self.required(APP, "package.domain")?,
            source_dir: self.required(APP, "source.dir")?,
            source_include_exts: self.tokens("source.include_exts", &[], |v| {
                if v.is_empty() { Err(ErrorToken::Empty) } else { Ok(v.to_string()) }
            })?,
            version: version,
            orientation: self.tokens("orientation", &["portrait"], str::parse::<Orientation>)?,
            requirements: requirements,
            fullscreen: self.boolean(APP, "fullscreen")?.unwrap_or(false),
        })
    }

    /// Return view of the Android configuration
    ///
    /// Missing keys take the platform defaults. `android.ndk_api` defaults
    /// to the minimum API level. The deprecated single `android.arch` is
    /// honored if `android.archs` is not set.
    pub fn view_android(&self) -> Result<ViewAndroid, ErrorView> {
        let minapi = self.unsigned(APP, "android.minapi")?.unwrap_or(android::DEFAULT_MINAPI);
        let archs = match self.string(APP, "android.arch")? {
            Some(arch) if self.entry(APP, "android.archs").is_none() => {
                tracing::warn!(%arch, "android.arch is deprecated, use android.archs");
                let arch = arch.trim();
                if !android::KNOWN_ARCHS.contains(&arch) {
                    return Err(ErrorView::Token {
                        section: APP,
                        key: "android.arch",
                        source: ErrorToken::Arch(arch.to_string()),
                    });
                }
                vec![arch.to_string()]
            },
            _ => self.tokens("android.archs", android::DEFAULT_ARCHS, |v| {
                if v.is_empty() { Err(ErrorToken::Empty) } else { Ok(v.to_string()) }
            })?,
        };

        Ok(ViewAndroid {
            api: self.unsigned(APP, "android.api")?.unwrap_or(android::DEFAULT_API),
            minapi: minapi,
            ndk: self.string(APP, "android.ndk")?.unwrap_or_else(|| android::DEFAULT_NDK.to_string()),
            ndk_api: self.unsigned(APP, "android.ndk_api")?.unwrap_or(minapi),
            archs: archs,
            permissions: self.tokens("android.permissions", &[], Permission::parse)?,
        })
    }

    /// Return view of the `[buildozer]` section
    pub fn view_buildozer(&self) -> Result<ViewBuildozer, ErrorView> {
        let log_level = match self.integer(BUILDOZER, "log_level")? {
            None => LogLevel::Info,
            Some(v) => LogLevel::from_level(v).map_err(
                |e| ErrorView::Token { section: BUILDOZER, key: "log_level", source: e }
            )?,
        };

        Ok(ViewBuildozer {
            log_level: log_level,
            warn_on_root: self.boolean(BUILDOZER, "warn_on_root")?.unwrap_or(true),
        })
    }
}

impl Manifest {
    /// Parse manifest from string with options
    ///
    /// Parse the given string as a literal manifest and resolve it with the
    /// given options.
    pub fn load_str(content: &str, options: &Options) -> Result<Self, Error> {
        let document = ini::Document::parse(content)?;

        Ok(
            Self {
                raw: Raw::from_document(&document, options),
                base: None,
            }
        )
    }

    /// Parse manifest from string
    ///
    /// Like `load_str()`, but with no profile and no environment overrides.
    pub fn parse_str(content: &str) -> Result<Self, Error> {
        Self::load_str(content, &Options::default())
    }

    /// Parse manifest from file-system with options
    ///
    /// Open the specified file and parse it as a manifest. The file is
    /// completely parsed into memory and then closed again before the
    /// function returns. The parent directory of the file becomes the
    /// manifest base.
    pub fn load_path(path: &std::path::Path, options: &Options) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(
            |v| Error::Io { path: path.to_path_buf(), source: v }
        )?;

        tracing::debug!(path = %path.display(), "loading manifest");

        let mut manifest = Self::load_str(&content, options)?;
        manifest.base = path.parent().map(std::path::Path::to_path_buf);
        Ok(manifest)
    }

    /// Parse manifest from file-system
    ///
    /// Like `load_path()`, but with no profile and no environment overrides.
    pub fn parse_path(path: &std::path::Path) -> Result<Self, Error> {
        Self::load_path(path, &Options::default())
    }

    /// Resolve the application version
    ///
    /// Resolve the version of the given app view against the manifest base,
    /// or the working directory if the manifest was not read from a file.
    pub fn resolve_version(&self, app: &ViewApp) -> Result<String, ErrorVersion> {
        app.version.resolve(self.base())
    }

    /// Directory relative paths of the manifest are resolved against.
    pub fn base(&self) -> &std::path::Path {
        self.base.as_deref().unwrap_or_else(|| std::path::Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
[app]
title = Gold Shop Manager
package.name = goldshopmanager
package.domain = org.goldshop
source.dir = .
version = 1.0.0
requirements = python3,kivy==2.3.0,kivymd
";

    // Verify the canonical example: `android.minapi = 21` in `[app]` yields
    // the integer 21.
    #[test]
    fn raw_integer_minapi() {
        let m = Manifest::parse_str("[app]\nandroid.minapi = 21\n").unwrap();

        assert_eq!(m.raw.integer(APP, "android.minapi").unwrap(), Some(21));
        assert_eq!(m.raw.view_android().unwrap().minapi, 21);
    }

    #[test]
    fn raw_accessors() {
        let s = "
[DEFAULT]
root = /srv
[app]
source.dir = %(root)s/app
icon.filename = %(source.dir)s/icon.png
requirements = python3, kivy,,
fullscreen = Yes
android.api = many
broken = %(nope)s
";
        let m = Manifest::parse_str(s).unwrap();
        let r = &m.raw;

        assert_eq!(r.string(APP, "icon.filename").unwrap().unwrap(), "/srv/app/icon.png");
        assert_eq!(r.string(APP, "root").unwrap().unwrap(), "/srv");
        assert_eq!(r.string(APP, "missing").unwrap(), None);
        assert_eq!(
            r.list(APP, "requirements").unwrap().unwrap(),
            vec!["python3", "kivy", "", ""],
        );
        assert_eq!(r.boolean(APP, "fullscreen").unwrap(), Some(true));
        assert!(matches!(r.integer(APP, "android.api"), Err(ErrorValue::Integer { .. })));
        assert!(matches!(r.string(APP, "broken"), Err(ErrorValue::Interpolation { .. })));
        assert_eq!(r.line(APP, "fullscreen"), Some(8));
    }

    #[test]
    fn raw_list_section() {
        let s = "
[app]
requirements = python3
[app:requirements]
python3
kivy==2.3.0
";
        let m = Manifest::parse_str(s).unwrap();

        assert_eq!(
            m.raw.list(APP, "requirements").unwrap().unwrap(),
            vec!["python3", "kivy==2.3.0"],
        );
        assert_eq!(m.raw.line(APP, "requirements"), Some(4));
    }

    // List section lines are kept intact, even if they contain a `:` and
    // they are interpolated like inline lists.
    #[test]
    fn raw_list_section_tokens() {
        let s = "
[app]
source.dir = src
[app:requirements]
python3
kivy @ https://example.org/kivy.zip
assets @ file://%(source.dir)s/assets.zip
";
        let m = Manifest::parse_str(s).unwrap();

        assert_eq!(
            m.raw.list(APP, "requirements").unwrap().unwrap(),
            vec![
                "python3",
                "kivy @ https://example.org/kivy.zip",
                "assets @ file://src/assets.zip",
            ],
        );

        let r = Requirement::parse("kivy @ https://example.org/kivy.zip").unwrap();
        assert_eq!(r.constraint.as_deref(), Some("@ https://example.org/kivy.zip"));

        let m = Manifest::parse_str("[app:requirements]\nbroken %(missing)s\n").unwrap();
        assert!(matches!(
            m.raw.list(APP, "requirements"),
            Err(ErrorValue::Interpolation { .. }),
        ));
    }

    #[test]
    fn raw_profiles() {
        let s = "
[app]
title = Gold Shop
android.api = 33
[app@demo,hd]
title = Gold Shop Demo
[buildozer@demo]
log_level = 2
[app@other]
title = Other
";

        let plain = Manifest::parse_str(s).unwrap();
        assert_eq!(plain.raw.string(APP, "title").unwrap().unwrap(), "Gold Shop");
        assert!(plain.raw.section("app@demo,hd").is_none());

        let options = Options {
            profile: Some("demo".to_string()),
            ..Default::default()
        };
        let demo = Manifest::load_str(s, &options).unwrap();
        let title = demo.raw.entry(APP, "title").unwrap();

        assert_eq!(title.value.as_deref(), Some("Gold Shop Demo"));
        assert_eq!(title.origin, Origin::Profile("app@demo,hd".to_string()));
        assert_eq!(demo.raw.string(APP, "android.api").unwrap().unwrap(), "33");
        assert_eq!(demo.raw.integer(BUILDOZER, "log_level").unwrap(), Some(2));
    }

    #[test]
    fn raw_environment() {
        let options = Options {
            env: [
                ("APP_ANDROID_MINAPI".to_string(), "24".to_string()),
                ("APP_ANDROID_API".to_string(), "34".to_string()),
            ].into_iter().collect(),
            ..Default::default()
        };

        let m = Manifest::load_str("[app]\nandroid.minapi = 21\n", &options).unwrap();
        let e = m.raw.entry(APP, "android.minapi").unwrap();

        assert_eq!(e.value.as_deref(), Some("24"));
        assert_eq!(e.origin, Origin::Environment("APP_ANDROID_MINAPI".to_string()));
        // Only existing keys are overridden.
        assert!(m.raw.entry(APP, "android.api").is_none());
        assert_eq!(Raw::env_name("app", "p4a.local-recipes"), "APP_P4A_LOCAL_RECIPES");
    }

    #[test]
    fn requirement_tokens() {
        let r = Requirement::parse(" kivy==2.3.0 ").unwrap();
        assert_eq!(r.name, "kivy");
        assert_eq!(r.constraint.as_deref(), Some("==2.3.0"));

        let r = Requirement::parse("arabic-reshaper").unwrap();
        assert_eq!(r.constraint, None);
        assert_eq!(r.normalized(), "arabic_reshaper");

        let r = Requirement::parse("kivy_garden.graph @ https://example.org/graph.zip").unwrap();
        assert_eq!(r.name, "kivy_garden.graph");
        assert_eq!(r.constraint.as_deref(), Some("@ https://example.org/graph.zip"));

        assert_eq!(Requirement::parse(""), Err(ErrorToken::Empty));
        assert_eq!(Requirement::parse("==1.0"), Err(ErrorToken::Requirement("==1.0".to_string())));
        assert_eq!(Requirement::parse("ki vy"), Err(ErrorToken::Requirement("ki vy".to_string())));
    }

    #[test]
    fn permission_tokens() {
        assert_eq!(
            Permission::parse("INTERNET").unwrap().name,
            "android.permission.INTERNET",
        );
        assert_eq!(
            Permission::parse("com.vendor.permission.SYNC").unwrap().name,
            "com.vendor.permission.SYNC",
        );

        let p = Permission::parse("(name=android.permission.WRITE_EXTERNAL_STORAGE;maxSdkVersion=18)").unwrap();
        assert_eq!(p.name, "android.permission.WRITE_EXTERNAL_STORAGE");
        assert_eq!(p.max_sdk_version, Some(18));

        assert_eq!(Permission::parse("internet"), Err(ErrorToken::PermissionName("internet".to_string())));
        assert_eq!(
            Permission::parse("(maxSdkVersion=18)"),
            Err(ErrorToken::PermissionAttributes("(maxSdkVersion=18)".to_string())),
        );
        assert_eq!(
            Permission::parse("(name=INTERNET;maxSdkVersion=x)"),
            Err(ErrorToken::MaxSdkVersion("x".to_string())),
        );
        assert_eq!(
            Permission::parse("(name=INTERNET"),
            Err(ErrorToken::PermissionAttributes("(name=INTERNET".to_string())),
        );
    }

    #[test]
    fn view_app_minimal() {
        let m = Manifest::parse_str(MINIMAL).unwrap();
        let app = m.raw.view_app().unwrap();

        assert_eq!(app.title, "Gold Shop Manager");
        assert_eq!(app.package_id(), "org.goldshop.goldshopmanager");
        assert_eq!(app.version, VersionSource::Literal { version: "1.0.0".to_string() });
        assert_eq!(app.orientation, vec![Orientation::Portrait]);
        assert_eq!(app.requirements.len(), 3);
        assert_eq!(app.requirements[1].constraint.as_deref(), Some("==2.3.0"));
        assert!(!app.fullscreen);
    }

    #[test]
    fn view_app_missing() {
        let m = Manifest::parse_str("[app]\ntitle = x\n").unwrap();

        assert_eq!(m.raw.view_app(), Err(ErrorView::MissingKey("version")));

        let m = Manifest::parse_str("[app]\nversion = 1\nrequirements = ,\n").unwrap();
        assert_eq!(
            m.raw.view_app(),
            Err(ErrorView::Token { section: APP, key: "requirements", source: ErrorToken::Empty }),
        );
    }

    #[test]
    fn view_android_defaults() {
        let m = Manifest::parse_str("[app]\nandroid.minapi = 24\nandroid.arch = x86_64\n").unwrap();
        let a = m.raw.view_android().unwrap();

        assert_eq!(a.api, android::DEFAULT_API);
        assert_eq!(a.minapi, 24);
        assert_eq!(a.ndk_api, 24);
        assert_eq!(a.ndk, "25b");
        assert_eq!(a.archs, vec!["x86_64"]);
        assert!(a.permissions.is_empty());

        let m = Manifest::parse_str("[app]\nandroid.api = -1\n").unwrap();
        assert!(matches!(m.raw.view_android(), Err(ErrorView::Value(ErrorValue::Integer { .. }))));

        let m = Manifest::parse_str("[app]\nandroid.arch = mips\n").unwrap();
        assert_eq!(
            m.raw.view_android(),
            Err(ErrorView::Token {
                section: APP,
                key: "android.arch",
                source: ErrorToken::Arch("mips".to_string()),
            }),
        );
    }

    #[test]
    fn view_buildozer() {
        let m = Manifest::parse_str("[buildozer]\nlog_level = 2\nwarn_on_root = 0\n").unwrap();
        let b = m.raw.view_buildozer().unwrap();

        assert_eq!(b.log_level, LogLevel::Debug);
        assert!(!b.warn_on_root);

        let m = Manifest::parse_str("[buildozer]\nlog_level = 3\n").unwrap();
        assert_eq!(
            m.raw.view_buildozer(),
            Err(ErrorView::Token { section: BUILDOZER, key: "log_level", source: ErrorToken::LogLevel(3) }),
        );
    }

    #[test]
    fn version_regex() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "__version__ = '2.4.1'\n").unwrap();
        std::fs::write(
            dir.path().join("buildozer.spec"),
            MINIMAL.replace(
                "version = 1.0.0",
                "version.regex = __version__ = ['\"](.*)['\"]\nversion.filename = %(source.dir)s/main.py",
            ),
        ).unwrap();

        let m = Manifest::parse_path(&dir.path().join("buildozer.spec")).unwrap();
        let app = m.raw.view_app().unwrap();

        assert!(matches!(app.version, VersionSource::Regex { .. }));
        assert_eq!(m.resolve_version(&app).unwrap(), "2.4.1");

        let source = VersionSource::Regex { regex: "no-group".to_string(), filename: "main.py".to_string() };
        assert!(matches!(source.resolve(dir.path()), Err(ErrorVersion::NoGroup)));
    }

    #[test]
    fn manifest_parse_errors() {
        assert!(matches!(Manifest::parse_str("title = x"), Err(Error::Syntax(_))));
        assert!(matches!(
            Manifest::parse_path(std::path::Path::new("/nonexistent/buildozer.spec")),
            Err(Error::Io { .. }),
        ));
    }
}
