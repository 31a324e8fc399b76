//! Which bus the generator is translating activation files for.

use libgenerator::cgroup;
use log::debug;
use std::path::Path;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusScope {
    /// A per-user manager: activation files of the session bus.
    User,
    /// The system manager: activation files of the system bus.
    System,
}

impl BusScope {
    /// Decide the scope from the cgroup owner of the current process.
    ///
    /// No owner means we run for the system manager; any other lookup failure
    /// is returned to the caller.
    pub fn detect() -> libgenerator::Result<BusScope> {
        let owner = cgroup::get_owner_uid()?;
        Ok(Self::from_owner(owner))
    }

    pub fn from_owner(owner: Option<u32>) -> BusScope {
        match owner {
            Some(uid) => {
                debug!("cgroup owned by uid {uid}, generating for the session bus");
                BusScope::User
            }
            None => {
                debug!("cgroup has no owner, generating for the system bus");
                BusScope::System
            }
        }
    }

    /// Value of `DBUS_STARTER_BUS_TYPE` for services started on this bus.
    pub fn bus_type(self) -> &'static str {
        match self {
            BusScope::User => "session",
            BusScope::System => "system",
        }
    }

    /// Directory holding the activation files for this bus.
    pub fn services_dir(self, config: &Config) -> &Path {
        match self {
            BusScope::User => &config.session_services_dir,
            BusScope::System => &config.system_services_dir,
        }
    }

    /// `DBUS_STARTER_ADDRESS` for this bus.  `uid` is the uid of the
    /// generator process and is only used for the session bus.
    pub fn starter_address(self, uid: u32) -> String {
        match self {
            BusScope::User => format!("kernel:/dev/kdbus/{uid}-user"),
            BusScope::System => "kernel:/dev/kdbus/0-system".to_owned(),
        }
    }

    /// The bus name no activation file may claim: it belongs to the service
    /// manager.  The same on both buses.
    pub fn reserved_bus_name(self) -> &'static str {
        libgenerator::bus_name::SYSTEMD_BUS_NAME
    }
}
