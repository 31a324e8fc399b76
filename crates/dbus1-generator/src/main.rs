//! systemd-dbus1-generator — Generate busname units from D-Bus activation files.
//!
//! A drop-in replacement for `systemd-dbus1-generator`. Classic D-Bus
//! activation files (`/usr/share/dbus-1/system-services/*.service` for the
//! system bus, `/usr/share/dbus-1/services/*.service` for the session bus)
//! are translated into units so that the service manager, rather than the bus
//! daemon, starts services when their bus name is first requested:
//!
//!   <dest>/<name>.busname                        always
//!   <dest>/dbus-<name>.service                   when the file only has Exec=
//!   <dest>/busnames.target.wants/<name>.busname  symlink to the busname unit
//!
//! Usage:
//!   systemd-dbus1-generator                            # write to /tmp
//!   systemd-dbus1-generator <normal> <early> <late>    # write to <late>
//!
//! Nothing happens unless the kernel bus (`/dev/kdbus/control`) exists.
//!
//! Exit codes:
//!   0 — success (units generated or activation files skipped)
//!   1 — error

mod activation;
mod config;
mod driver;
mod materialize;
mod scope;
mod synthesize;

use clap::Parser;
use libgenerator::config::LoggingConfig;
use libgenerator::generators::GeneratorDirs;
use log::error;
use nix::sys::stat::{Mode, umask};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use config::Config;
use scope::BusScope;

const IDENT: &str = "systemd-dbus1-generator";

/// systemd-dbus1-generator — Generate busname units from D-Bus activation files
#[derive(Parser, Debug)]
#[command(name = "systemd-dbus1-generator", version, about)]
struct Cli {
    /// Generator output directories (normal, early, late). Units are written
    /// to the late directory.
    #[arg(value_name = "DIR")]
    dirs: Vec<PathBuf>,
}

fn run(config: &Config) -> Result<(), libgenerator::Error> {
    if !config.kdbus_available() {
        log::debug!(
            "{} does not exist, nothing to do",
            config.kdbus_control.display()
        );
        return Ok(());
    }

    let scope = BusScope::detect().inspect_err(|e| {
        error!("Failed to determine whether we are running as user or system instance: {e}");
    })?;

    driver::parse_dbus_fragments(config, scope).map(|_| ())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = libgenerator::logging::setup_logging(IDENT, &LoggingConfig::from_env()) {
        eprintln!("{IDENT}: {e}");
    }

    let dirs = match GeneratorDirs::from_args(&cli.dirs, Path::new(config::DEFAULT_DEST)) {
        Ok(dirs) => dirs,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    umask(Mode::from_bits_truncate(0o022));

    let config = Config::with_dest(dirs.late_dir);
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
