//! Dump Manifest
//!
//! The `dump` operation renders the typed views of a manifest as JSON or
//! TOML. Profiles, environment overrides, interpolation and defaults are all
//! applied, so the output is what the packaging tool will effectively use.

use crate::manifest::{self, Manifest};

/// Dump Errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    View(#[from] manifest::ErrorView),
    #[error(transparent)]
    Version(#[from] manifest::ErrorVersion),
    #[error("cannot serialize as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot serialize as TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Output Format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl std::str::FromStr for Format {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("toml") {
            Ok(Self::Toml)
        } else {
            Err(())
        }
    }
}

/// Effective Manifest
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dump {
    pub package_id: String,
    pub version: String,
    pub app: manifest::ViewApp,
    pub android: manifest::ViewAndroid,
    pub buildozer: manifest::ViewBuildozer,
}

/// Collect the effective manifest
///
/// Build all views and resolve the application version.
pub fn collect(manifest: &Manifest) -> Result<Dump, Error> {
    let app = manifest.raw.view_app()?;

    Ok(Dump {
        package_id: app.package_id(),
        version: manifest.resolve_version(&app)?,
        android: manifest.raw.view_android()?,
        buildozer: manifest.raw.view_buildozer()?,
        app: app,
    })
}

/// Dump manifest
///
/// Render the effective manifest in the given format.
pub fn dump(manifest: &Manifest, format: Format) -> Result<String, Error> {
    let dump = collect(manifest)?;

    match format {
        Format::Json => Ok(serde_json::to_string_pretty(&dump)? + "\n"),
        Format::Toml => Ok(toml::to_string(&dump)?),
    }
}
