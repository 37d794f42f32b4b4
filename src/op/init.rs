//! Initialize Manifest
//!
//! The `init` operation writes a new manifest with the most common options,
//! each preceded by a comment describing it. Optional settings are included
//! as commented-out examples. The result passes validation as is.

use crate::manifest;
use crate::platform::android;

/// Init Errors
///
/// This is the exhaustive list of possible errors raised by the init
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A manifest is already present and overwriting was not allowed by the
    /// caller.
    #[error("manifest {0:?} already exists")]
    Already(std::ffi::OsString),
    /// The specified parameter cannot be used in a manifest.
    #[error("invalid {0}: {1:?}")]
    Parameter(&'static str, String),
    /// Creation of the directory at the specified path failed.
    #[error("cannot create directory {0:?}: {1}")]
    DirectoryCreation(std::ffi::OsString, std::io::Error),
    /// Updating the file at the specified path failed with the given error.
    #[error("cannot update {0:?}: {1}")]
    FileUpdate(std::ffi::OsString, std::io::Error),
}

/// Manifest Parameters
#[derive(Clone, Debug)]
pub struct Params {
    pub title: String,
    pub package_name: String,
    pub package_domain: String,
    pub requirements: Vec<String>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            title: "My Application".to_string(),
            package_name: "myapp".to_string(),
            package_domain: "org.test".to_string(),
            requirements: vec!["python3".to_string(), "kivy".to_string()],
        }
    }
}

impl Params {
    // Verify parameters
    //
    // Titles must fit on a single line, identifiers must pass the same checks
    // the validator applies, including the combined package identifier.
    fn verify(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() || self.title.chars().any(char::is_control) {
            return Err(Error::Parameter("title", self.title.clone()));
        }
        if !android::is_identifier(&self.package_name) {
            return Err(Error::Parameter("package name", self.package_name.clone()));
        }
        if !android::is_package_name(&self.package_domain) {
            return Err(Error::Parameter("package domain", self.package_domain.clone()));
        }
        let id = format!("{}.{}", self.package_domain, self.package_name).to_lowercase();
        if !android::is_package_name(&id) {
            return Err(Error::Parameter("package identifier", id));
        }
        if self.requirements.is_empty() {
            return Err(Error::Parameter("requirements", String::new()));
        }
        for v in self.requirements.iter() {
            if manifest::Requirement::parse(v).is_err() || v.contains(',') {
                return Err(Error::Parameter("requirement", v.clone()));
            }
        }
        Ok(())
    }
}

// Render the manifest for the given parameters.
fn render(params: &Params) -> String {
    format!(
        concat!(
            "[app]\n",
            "\n",
            "# (str) Title of your application\n",
            "title = {title}\n",
            "\n",
            "# (str) Package name\n",
            "package.name = {name}\n",
            "\n",
            "# (str) Package domain (needed for android/ios packaging)\n",
            "package.domain = {domain}\n",
            "\n",
            "# (str) Source code where the main.py live\n",
            "source.dir = .\n",
            "\n",
            "# (list) Source files to include (let empty to include all the files)\n",
            "source.include_exts = py,png,jpg,kv,atlas\n",
            "\n",
            "# (str) Application versioning (method 1)\n",
            "version = 0.1\n",
            "\n",
            "# (str) Application versioning (method 2)\n",
            "# version.regex = __version__ = ['\"](.*)['\"]\n",
            "# version.filename = %(source.dir)s/main.py\n",
            "\n",
            "# (list) Application requirements\n",
            "requirements = {requirements}\n",
            "\n",
            "# (list) Supported orientations: landscape, portrait, landscape-reverse, portrait-reverse\n",
            "orientation = portrait\n",
            "\n",
            "# (bool) Indicate if the application should be fullscreen or not\n",
            "fullscreen = 0\n",
            "\n",
            "# (list) Permissions\n",
            "# android.permissions = INTERNET, (name=android.permission.WRITE_EXTERNAL_STORAGE;maxSdkVersion=18)\n",
            "\n",
            "# (int) Target Android API, should be as high as possible.\n",
            "android.api = {api}\n",
            "\n",
            "# (int) Minimum API your APK / AAB will support.\n",
            "android.minapi = {minapi}\n",
            "\n",
            "# (str) Android NDK version to use\n",
            "android.ndk = {ndk}\n",
            "\n",
            "# (list) The Android archs to build for\n",
            "android.archs = {archs}\n",
            "\n",
            "[buildozer]\n",
            "\n",
            "# (int) Log level (0 = error only, 1 = info, 2 = debug (with command output))\n",
            "log_level = 2\n",
            "\n",
            "# (int) Display warning if buildozer is run as root (0 = False, 1 = True)\n",
            "warn_on_root = 1\n",
        ),
        title = params.title.trim().replace('%', "%%"),
        name = params.package_name,
        domain = params.package_domain,
        requirements = params.requirements.iter().map(|v| v.trim()).collect::<Vec<_>>().join(","),
        api = android::DEFAULT_API,
        minapi = android::DEFAULT_MINAPI,
        ndk = android::DEFAULT_NDK,
        archs = android::DEFAULT_ARCHS.join(", "),
    )
}

/// Initialize manifest
///
/// Write a new manifest to `path`, creating parent directories as needed.
/// This function will fail if the file already exists, unless `overwrite`
/// is `true`.
pub fn init(
    path: &std::path::Path,
    params: &Params,
    overwrite: bool,
) -> Result<(), Error> {
    params.verify()?;

    if !overwrite && path.exists() {
        return Err(Error::Already(path.as_os_str().to_os_string()));
    }

    if let Some(parent) = path.parent() {
        super::file::ensure_dir(parent).map_err(
            |v| Error::DirectoryCreation(parent.as_os_str().to_os_string(), v),
        )?;
    }

    super::file::update_file(path, &render(params)).map_err(
        |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
    )?;

    tracing::info!(path = %path.display(), "initialized manifest");

    Ok(())
}
