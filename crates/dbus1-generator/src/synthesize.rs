//! Rendering of the generated units.
//!
//! For a bus name `N` the generator always emits `N.busname`, wired into
//! `busnames.target`.  If the activation file only gave a command line, it
//! also emits `dbus-N.service` running it.  All names derive from the bus
//! name, never from the activation file's name.

use libgenerator::generators::{BUSNAMES_TARGET, wants_link_path};
use std::path::{Path, PathBuf};

use crate::activation::{ActivationRecord, ServiceRef};
use crate::scope::BusScope;

const HEADER: &str = "# Automatically generated by systemd-dbus1-generator\n\n";

/// A unit file to be written below the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub file_name: String,
    pub contents: String,
}

/// A symlink below the destination directory pointing at a generated unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WantsLink {
    /// Relative to the destination directory.
    pub link: PathBuf,
    /// File name of the unit the link points at.
    pub target: String,
}

/// Everything generated for one activation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Units {
    pub service: Option<GeneratedUnit>,
    pub busname: GeneratedUnit,
    pub wants: WantsLink,
}

pub fn service_unit_name(bus_name: &str) -> String {
    format!("dbus-{bus_name}.service")
}

pub fn busname_unit_name(bus_name: &str) -> String {
    format!("{bus_name}.busname")
}

/// Render the units for `record`.
///
/// The session bus address embeds the uid of the generator process, not the
/// `User=` of the activated service.
pub fn synthesize(record: &ActivationRecord, scope: BusScope) -> Units {
    synthesize_for_uid(record, scope, nix::unistd::getuid().as_raw())
}

/// [`synthesize`] with the uid used in the session bus address given
/// explicitly.
pub fn synthesize_for_uid(record: &ActivationRecord, scope: BusScope, uid: u32) -> Units {
    let (service, service_name) = match &record.service {
        ServiceRef::Explicit(unit) => (None, unit.clone()),
        ServiceRef::Exec { exec, user } => {
            let unit = GeneratedUnit {
                file_name: service_unit_name(&record.bus_name),
                contents: render_service(record, exec, user.as_deref(), scope, uid),
            };
            let name = unit.file_name.clone();
            (Some(unit), name)
        }
    };

    let busname = GeneratedUnit {
        file_name: busname_unit_name(&record.bus_name),
        contents: render_busname(record, &service_name),
    };

    let wants = WantsLink {
        link: wants_link_path(Path::new(""), BUSNAMES_TARGET, &busname.file_name),
        target: busname.file_name.clone(),
    };

    Units {
        service,
        busname,
        wants,
    }
}

fn render_unit_section(record: &ActivationRecord) -> String {
    format!(
        "{HEADER}[Unit]\nSource={}\nDescription=DBUS1: {}\n\n",
        record.source_path.display(),
        record.bus_name
    )
}

fn render_service(
    record: &ActivationRecord,
    exec: &str,
    user: Option<&str>,
    scope: BusScope,
    uid: u32,
) -> String {
    let mut out = render_unit_section(record);

    out.push_str(&format!(
        "[Service]\nExecStart={exec}\nType=dbus\nBusName={}\n",
        record.bus_name
    ));
    if let Some(user) = user {
        out.push_str(&format!("User={user}\n"));
    }
    out.push_str(&format!(
        "Environment=DBUS_STARTER_BUS_TYPE={}\nEnvironment=DBUS_STARTER_ADDRESS={}\n",
        scope.bus_type(),
        scope.starter_address(uid)
    ));

    out
}

fn render_busname(record: &ActivationRecord, service: &str) -> String {
    format!(
        "{}[BusName]\nName={}\nService={service}\n",
        render_unit_section(record),
        record.bus_name
    )
}
