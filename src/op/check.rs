//! Check Manifest
//!
//! The `check` operation validates a manifest for a target platform. On top
//! of the static checks of the validator, it resolves a regex-based version
//! against the file-system, since the packaging tool fails late if the
//! version file is missing or does not match.

use crate::manifest::{Manifest, VersionSource};
use crate::platform;
use crate::validate::{self, Diagnostic, Report, Severity};

/// Check manifest
///
/// Validate the manifest for the given target platform and return the full
/// report. The operation never fails; problems are reported as diagnostics.
pub fn check(manifest: &Manifest, target: platform::Id) -> Report {
    let mut report = validate::validate(&manifest.raw, target);

    // Only resolve the version if the version keys passed validation, to
    // avoid reporting the same problem twice.
    let version_ok = !["version", "version.regex", "version.filename"]
        .iter()
        .any(|v| report.mentions(crate::manifest::APP, v));

    // Unrelated `[app]` problems must not hide a broken version file, so
    // only the version keys are read here.
    if version_ok {
        if let Ok(source @ VersionSource::Regex { .. }) = manifest.raw.version_source() {
            match source.resolve(manifest.base()) {
                Ok(v) => tracing::debug!(version = %v, "resolved application version"),
                Err(e) => report.push(Diagnostic {
                    severity: Severity::Error,
                    section: crate::manifest::APP.to_string(),
                    key: Some("version.filename".to_string()),
                    line: manifest.raw.line(crate::manifest::APP, "version.filename"),
                    message: e.to_string(),
                }),
            }
        }
    }

    tracing::info!(
        errors = report.count(Severity::Error),
        warnings = report.count(Severity::Warning),
        "checked manifest",
    );

    report
}
