//! Validation of D-Bus activation files.
//!
//! An activation file names a bus name and either the binary to run for it
//! (`Exec=`, optionally `User=`) or a unit that already provides it
//! (`SystemdService=`).  [`validate`] turns the raw fields into an
//! [`ActivationRecord`] or explains why the file is skipped.

use libgenerator::bus_name::service_name_is_valid;
use libgenerator::ini::ParsedSection;
use libgenerator::unit_name::{UnitType, unit_name_is_valid, unit_type_from_name};
use log::Level;
use std::path::{Path, PathBuf};

use crate::scope::BusScope;

/// Section of the activation file we read.
pub const SECTION: &str = "D-BUS Service";

/// `Exec=` value used by packages to disable activation of a name.
pub const DISABLED_EXEC: &str = "/bin/false";

/// The fields of one activation file, as read from disk.
#[derive(Debug, Clone, Default)]
pub struct RawDescriptor {
    pub path: PathBuf,
    pub name: Option<String>,
    pub exec: Option<String>,
    pub user: Option<String>,
    pub systemd_service: Option<String>,
}

impl RawDescriptor {
    /// Pick the recognized fields out of a parsed `[D-BUS Service]` section.
    /// Empty values count as unset.
    pub fn from_section(path: &Path, mut section: ParsedSection) -> RawDescriptor {
        let mut take = |key: &str| section.remove(key).filter(|v| !v.is_empty());
        RawDescriptor {
            path: path.to_path_buf(),
            name: take("Name"),
            exec: take("Exec"),
            user: take("User"),
            systemd_service: take("SystemdService"),
        }
    }
}

/// How the bus name gets its service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceRef {
    /// `SystemdService=`: an existing service unit.
    Explicit(String),
    /// `Exec=`: a service unit is generated for this command line.
    Exec { exec: String, user: Option<String> },
}

/// A validated activation file, ready for unit generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRecord {
    pub bus_name: String,
    pub source_path: PathBuf,
    pub service: ServiceRef,
}

/// Reasons for ignoring an activation file.  None of them fail the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Skip {
    #[error("Activation file {} lacks name setting, ignoring.", .path.display())]
    NoName { path: PathBuf },

    #[error("Bus service name {name} is not valid, ignoring.")]
    InvalidName { name: String },

    #[error("Skipping {}, identified as systemd.", .path.display())]
    ReservedName { path: PathBuf },

    #[error("Unit name {unit} is not valid, ignoring.")]
    InvalidServiceUnit { unit: String },

    #[error("Bus names can only activate services, ignoring {}.", .path.display())]
    ServiceNotAService { path: PathBuf },

    #[error("Neither service name nor binary path specified, ignoring {}.", .path.display())]
    NoExecOrService { path: PathBuf },

    #[error("Exec= in {} does not start with an absolute path, ignoring.", .path.display())]
    ExecNotAbsolute { path: PathBuf },
}

impl Skip {
    /// Level the skip is reported at.  Skipping the service manager's own
    /// name is expected and only interesting when debugging.
    pub fn log_level(&self) -> Level {
        match self {
            Skip::ReservedName { .. } => Level::Debug,
            _ => Level::Warn,
        }
    }
}

/// Decide whether `raw` can be turned into units.  Rules are checked in a
/// fixed order and the first one that fails determines the [`Skip`].
pub fn validate(raw: RawDescriptor, scope: BusScope) -> Result<ActivationRecord, Skip> {
    let RawDescriptor {
        path,
        name,
        exec,
        user,
        systemd_service,
    } = raw;

    let Some(name) = name else {
        return Err(Skip::NoName { path });
    };

    if !service_name_is_valid(&name) {
        return Err(Skip::InvalidName { name });
    }

    if name == scope.reserved_bus_name() {
        return Err(Skip::ReservedName { path });
    }

    let service = match systemd_service {
        Some(unit) => {
            if !unit_name_is_valid(&unit, false) {
                return Err(Skip::InvalidServiceUnit { unit });
            }
            if unit_type_from_name(&unit) != Some(UnitType::Service) {
                return Err(Skip::ServiceNotAService { path });
            }
            ServiceRef::Explicit(unit)
        }
        None => {
            let Some(exec) = exec.filter(|e| e != DISABLED_EXEC) else {
                return Err(Skip::NoExecOrService { path });
            };
            if !exec.starts_with('/') {
                return Err(Skip::ExecNotAbsolute { path });
            }
            ServiceRef::Exec { exec, user }
        }
    };

    Ok(ActivationRecord {
        bus_name: name,
        source_path: path,
        service,
    })
}
