//! Packaging Manifest Tooling
//!
//! This is the entry-point of `packspec`, a command-line tool to inspect and
//! maintain the `buildozer.spec` packaging manifest of an application. It
//! validates the manifest against the rules of the packaging tool, queries
//! and edits single values, writes new manifests, and dumps the effective
//! configuration.
//!
//! This CLI is mainly a dispatcher of all the operations available in
//! `packspec::op::*`. It is a simple clap-based CLI that forwards the
//! arguments to `packspec` and visualizes the results.

use clap;
use packspec;

struct Cli {
    cmd: clap::Command,
}

fn arg_platform_id(
    s: &str,
) -> Result<packspec::platform::Id, clap::error::Error> {
    s.parse().map_err(
        |_| {
            clap::error::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "Invalid platform identifier",
            )
        }
    )
}

fn arg_kind(
    s: &str,
) -> Result<packspec::op::get::Kind, clap::error::Error> {
    s.parse().map_err(
        |_| {
            clap::error::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "Invalid value type, expected one of: string, list, integer, boolean",
            )
        }
    )
}

fn arg_format(
    s: &str,
) -> Result<packspec::op::dump::Format, clap::error::Error> {
    s.parse().map_err(
        |_| {
            clap::error::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "Invalid output format, expected one of: json, toml",
            )
        }
    )
}

// Install the log subscriber. `RUST_LOG` takes precedence over the verbosity
// flags. Logs go to STDERR, so they never mix with command output.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

impl Cli {
    fn new() -> Self {
        let mut cmd;

        cmd = clap::Command::new("packspec")
            .propagate_version(true)
            .subcommand_required(true)
            .about("Packaging Manifest Tooling")
            .long_about("Validate, query, and edit buildozer-style packaging manifests")
            .version(clap::crate_version!());

        cmd = cmd.arg(
            clap::Arg::new("manifest")
                .long("manifest")
                .value_name("PATH")
                .help("Path to the packaging manifest relative to the working directory")
                .env("PACKSPEC_MANIFEST")
                .default_value("./buildozer.spec")
                .global(true)
                .value_parser(clap::builder::ValueParser::os_string())
        );

        cmd = cmd.arg(
            clap::Arg::new("profile")
                .long("profile")
                .value_name("NAME")
                .help("Profile whose sections are merged into the base sections")
                .global(true)
        );

        cmd = cmd.arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (repeatable)")
                .global(true)
                .action(clap::ArgAction::Count)
        );

        cmd = cmd.subcommand(
            clap::Command::new("check")
                .about("Validate the manifest for a target platform")
                .arg(
                    clap::Arg::new("target")
                        .long("target")
                        .value_name("NAME")
                        .help("Name of the target platform to validate for")
                        .default_value("android")
                        .value_parser(arg_platform_id)
                )
                .arg(
                    clap::Arg::new("strict")
                        .long("strict")
                        .help("Treat warnings as errors")
                        .action(clap::ArgAction::SetTrue)
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("get")
                .about("Print a single manifest value")
                .arg(
                    clap::Arg::new("section")
                        .value_name("SECTION")
                        .help("Name of the section")
                        .required(true)
                )
                .arg(
                    clap::Arg::new("key")
                        .value_name("KEY")
                        .help("Name of the key")
                        .required(true)
                )
                .arg(
                    clap::Arg::new("type")
                        .long("type")
                        .value_name("TYPE")
                        .help("Type to read the value as")
                        .default_value("string")
                        .value_parser(arg_kind)
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("set")
                .about("Change a single manifest value in place")
                .arg(
                    clap::Arg::new("section")
                        .value_name("SECTION")
                        .help("Name of the section")
                        .required(true)
                )
                .arg(
                    clap::Arg::new("key")
                        .value_name("KEY")
                        .help("Name of the key")
                        .required(true)
                )
                .arg(
                    clap::Arg::new("value")
                        .value_name("VALUE")
                        .help("New value")
                        .required(true)
                        .allow_hyphen_values(true)
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("init")
                .about("Write a new manifest")
                .arg(
                    clap::Arg::new("title")
                        .long("title")
                        .value_name("TITLE")
                        .help("Title of the application")
                )
                .arg(
                    clap::Arg::new("package-name")
                        .long("package-name")
                        .value_name("NAME")
                        .help("Package name of the application")
                )
                .arg(
                    clap::Arg::new("package-domain")
                        .long("package-domain")
                        .value_name("DOMAIN")
                        .help("Package domain of the application")
                )
                .arg(
                    clap::Arg::new("requirements")
                        .long("requirements")
                        .value_name("LIST")
                        .help("Comma-separated list of runtime requirements")
                        .value_delimiter(',')
                )
                .arg(
                    clap::Arg::new("force")
                        .long("force")
                        .help("Overwrite an existing manifest")
                        .action(clap::ArgAction::SetTrue)
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("dump")
                .about("Print the effective manifest configuration")
                .arg(
                    clap::Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format")
                        .default_value("json")
                        .value_parser(arg_format)
                )
        );

        Self {
            cmd: cmd,
        }
    }

    fn manifest_path<'a>(
        &self,
        m: &'a clap::ArgMatches,
    ) -> &'a std::path::Path {
        std::path::Path::new(
            m.get_one::<std::ffi::OsString>("manifest")
                .expect("Manifest path lacks a value"),
        )
    }

    fn manifest(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<packspec::manifest::Manifest, u8> {
        let path = self.manifest_path(m);
        let options = packspec::manifest::Options {
            profile: m.get_one::<String>("profile").cloned(),
            // Variables that are not valid UTF-8 cannot name or carry an
            // override and are skipped.
            env: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        };

        match packspec::manifest::Manifest::load_path(path, &options) {
            Err(e) => {
                eprintln!("Cannot load manifest: {}", e);
                Err(1)
            },
            Ok(v) => {
                Ok(v)
            },
        }
    }

    fn op_check(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;
        let path = self.manifest_path(m);
        let target = *m_op.get_one("target").expect("Target-flag lacks a value");
        let strict = m_op.get_flag("strict");

        let report = packspec::op::check::check(&manifest, target);
        for v in report.diagnostics.iter() {
            println!("{}", v);
        }

        let errors = report.count(packspec::validate::Severity::Error);
        let warnings = report.count(packspec::validate::Severity::Warning);

        if errors > 0 || (strict && warnings > 0) {
            eprintln!(
                "{}: failed ({} errors, {} warnings)",
                path.display(), errors, warnings,
            );
            Err(1)
        } else {
            println!("{}: ok ({} warnings)", path.display(), warnings);
            Ok(())
        }
    }

    fn op_get(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;
        let section = m_op.get_one::<String>("section").expect("Section lacks a value");
        let key = m_op.get_one::<String>("key").expect("Key lacks a value");
        let kind = *m_op.get_one("type").expect("Type-flag lacks a value");

        match packspec::op::get::get(&manifest.raw, section, key, kind) {
            Err(e) => {
                eprintln!("Cannot get value: {}", e);
                Err(1)
            },
            Ok(v) => {
                println!("{}", v);
                Ok(())
            },
        }
    }

    fn op_set(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let path = self.manifest_path(m);
        let section = m_op.get_one::<String>("section").expect("Section lacks a value");
        let key = m_op.get_one::<String>("key").expect("Key lacks a value");
        let value = m_op.get_one::<String>("value").expect("Value lacks a value");

        match packspec::op::set::set(path, section, key, value) {
            Err(packspec::op::set::Error::FileRead(file, error)) => {
                eprintln!("Cannot set value: Failed to read {:?} ({})", file, error);
                Err(1)
            },
            Err(packspec::op::set::Error::Document(error)) => {
                eprintln!("Cannot set value: {}", error);
                Err(1)
            },
            Err(packspec::op::set::Error::FileUpdate(file, error)) => {
                eprintln!("Cannot set value: Failed to update {:?} ({})", file, error);
                Err(1)
            },
            Ok(_) => {
                Ok(())
            },
        }
    }

    fn op_init(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let path = self.manifest_path(m);
        let mut params = packspec::op::init::Params::default();

        if let Some(v) = m_op.get_one::<String>("title") {
            params.title = v.clone();
        }
        if let Some(v) = m_op.get_one::<String>("package-name") {
            params.package_name = v.clone();
        }
        if let Some(v) = m_op.get_one::<String>("package-domain") {
            params.package_domain = v.clone();
        }
        if let Some(v) = m_op.get_many::<String>("requirements") {
            params.requirements = v.cloned().collect();
        }

        match packspec::op::init::init(path, &params, m_op.get_flag("force")) {
            Err(packspec::op::init::Error::Already(file)) => {
                eprintln!("Cannot initialize manifest: {:?} already present (use --force to overwrite)", file);
                Err(1)
            },
            Err(packspec::op::init::Error::Parameter(name, value)) => {
                eprintln!("Cannot initialize manifest: Invalid {} {:?}", name, value);
                Err(1)
            },
            Err(packspec::op::init::Error::DirectoryCreation(dir, error)) => {
                eprintln!("Cannot initialize manifest: Failed to create directory {:?} ({})", dir, error);
                Err(1)
            },
            Err(packspec::op::init::Error::FileUpdate(file, error)) => {
                eprintln!("Cannot initialize manifest: Failed to update {:?} ({})", file, error);
                Err(1)
            },
            Ok(_) => {
                Ok(())
            },
        }
    }

    fn op_dump(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;
        let format = *m_op.get_one("format").expect("Format-flag lacks a value");

        match packspec::op::dump::dump(&manifest, format) {
            Err(e) => {
                eprintln!("Cannot dump manifest: {}", e);
                Err(1)
            },
            Ok(v) => {
                print!("{}", v);
                Ok(())
            },
        }
    }

    fn run(mut self) -> Result<(), u8> {
        let (m, r);

        r = self.cmd.try_get_matches_from_mut(
            std::env::args_os(),
        );

        match r {
            Ok(v) => m = v,
            Err(e) => {
                return match e.kind() {
                    clap::error::ErrorKind::DisplayHelp |
                    clap::error::ErrorKind::DisplayVersion => {
                        e.print().expect("Cannot write to STDERR");
                        Ok(())
                    },
                    _ => {
                        e.print().expect("Cannot write to STDERR");
                        Err(2)
                    }
                }
            }
        }

        init_logging(m.get_count("verbose"));

        match m.subcommand() {
            Some(("check", m_op)) => self.op_check(&m, &m_op),
            Some(("get", m_op)) => self.op_get(&m, &m_op),
            Some(("set", m_op)) => self.op_set(&m, &m_op),
            Some(("init", m_op)) => self.op_init(&m, &m_op),
            Some(("dump", m_op)) => self.op_dump(&m, &m_op),
            _ => std::unreachable!(),
        }
    }
}

fn main() -> std::process::ExitCode {
    match Cli::new().run() {
        Ok(()) => 0.into(),
        Err(v) => v.into(),
    }
}
