//! Packaging Manifest Tooling
//!
//! The packspec module reads, validates, queries and edits packaging
//! manifests. A packaging manifest is a declarative, INI-style file that
//! describes how an external packaging tool assembles a distributable
//! application bundle (usually an Android APK or AAB) from a Python/Kivy
//! application. The manifest is usually called `buildozer.spec` and lives in
//! the root of the application repository.
//!
//! The manifest holds no logic. It is a flat set of sections, each mapping
//! option names to string values. Some values are interpreted as
//! comma-separated lists, integers or booleans by convention. This module
//! implements that convention, so applications and CI pipelines can verify a
//! manifest before handing it to the packaging tool, and script routine edits
//! like version bumps without disturbing comments or layout.
//!
//! Model
//! -----
//!
//! Processing is split into layers, each usable on its own:
//!
//!  * [`ini`] parses the section/key/value text into a lossless document that
//!    remembers line numbers and can be edited in place.
//!
//!  * [`manifest`] resolves a document into the effective configuration,
//!    applying profile sections (`[app@demo]`) and environment overrides
//!    (`APP_ANDROID_MINAPI=24`). It offers typed accessors and typed views of
//!    the well-known `[app]` and `[buildozer]` sections.
//!
//!  * [`validate`] checks the effective configuration and reports
//!    diagnostics with their source line, rather than stopping at the first
//!    problem.
//!
//!  * [`op`] contains the operations exposed by the `packspec` command-line
//!    tool.
//!
//! Driving the actual packaging pipeline (SDK downloads, compilation, bundle
//! assembly) is left to the external tool.
//!
//! Supported Platforms
//! -------------------
//!
//! Validation rules are selected per target platform:
//!
//!  * [Android](platform::android)

pub mod ini;
pub mod interpolate;
pub mod manifest;
pub mod validate;

/// Manifest Operations
///
/// The `op` module is a collection of all operations that can be performed via
/// the command-line interface. Each operation is implemented in a submodule
/// and can be used independently.
pub mod op {
    pub mod check;
    pub mod dump;
    pub mod get;
    pub mod init;
    pub mod set;

    mod file;
}

/// Platform Integration
///
/// The `platform` module carries the platform-specific knowledge needed to
/// judge manifest values for each respective target platform.
pub mod platform {
    pub mod android;

    /// Platform Identifier
    ///
    /// This enum is an enumeration of supported platforms. It implements
    /// `FromStr` to allow creation from string representation. Use `as_str()`
    /// to get a static string-representation back.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Id {
        Android,
    }

    impl Id {
        /// Get string representation
        ///
        /// Return the string representation of the platform identifier. This
        /// is guaranteed to be parsable by the `FromStr` implementation.
        pub fn as_str(&self) -> &'static str {
            match self {
                Id::Android => "android",
            }
        }
    }

    // Parse platform identifiers from strings
    //
    // This implements `FromStr` to allow using `std::str::parse()` and thus
    // get platform identifiers from their respective string representation.
    // Note that this uses case-insensitive matching.
    impl std::str::FromStr for Id {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            if s.eq_ignore_ascii_case("android") {
                Ok(Self::Android)
            } else {
                Err(())
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn id_roundtrip() {
            let id: Id = "Android".parse().unwrap();

            assert_eq!(id, Id::Android);
            assert_eq!(id.as_str().parse::<Id>().unwrap(), Id::Android);
            assert!("ios".parse::<Id>().is_err());
        }
    }
}
