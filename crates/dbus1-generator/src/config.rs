//! Well-known paths used by the generator.
//!
//! Everything is compiled in; tests build a [`Config`] pointing into a
//! temporary directory instead.

use std::path::PathBuf;

/// Activation files of the session bus.
pub const SESSION_SERVICES_DIR: &str = "/usr/share/dbus-1/services";
/// Activation files of the system bus.
pub const SYSTEM_SERVICES_DIR: &str = "/usr/share/dbus-1/system-services";
/// Present only when the kernel provides kdbus.  Without it there is no bus
/// to activate names on and the generator does nothing.
pub const KDBUS_CONTROL: &str = "/dev/kdbus/control";
/// Output directory when run without arguments.
pub const DEFAULT_DEST: &str = "/tmp";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the generated units are written to.
    pub dest: PathBuf,
    pub session_services_dir: PathBuf,
    pub system_services_dir: PathBuf,
    pub kdbus_control: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dest: PathBuf::from(DEFAULT_DEST),
            session_services_dir: PathBuf::from(SESSION_SERVICES_DIR),
            system_services_dir: PathBuf::from(SYSTEM_SERVICES_DIR),
            kdbus_control: PathBuf::from(KDBUS_CONTROL),
        }
    }
}

impl Config {
    pub fn with_dest(dest: PathBuf) -> Self {
        Config {
            dest,
            ..Config::default()
        }
    }

    /// Whether the kernel bus is available at all.
    pub fn kdbus_available(&self) -> bool {
        self.kdbus_control.exists()
    }
}
