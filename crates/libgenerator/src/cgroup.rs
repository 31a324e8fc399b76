//! cgroup ownership lookup.
//!
//! Generators run both for the system manager and for per-user managers, and
//! some of them need to know which.  The answer comes from the cgroup the
//! process lives in: user managers (and everything in a login session) live
//! below `user-<uid>.slice`, the system manager does not.

use log::trace;
use std::path::Path;

use crate::error::{Error, Result};

const PROC_SELF_CGROUP: &str = "/proc/self/cgroup";

/// Return the uid owning the cgroup of the calling process.
///
/// `Ok(None)` means the process is not inside any user slice, which is the
/// case for the system instance.
pub fn get_owner_uid() -> Result<Option<u32>> {
    owner_uid_from_file(Path::new(PROC_SELF_CGROUP))
}

/// Like [`get_owner_uid`], reading the membership from `path` (a file in
/// `/proc/<pid>/cgroup` format).
pub fn owner_uid_from_file(path: &Path) -> Result<Option<u32>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Cgroup {
        path: path.to_path_buf(),
        source,
    })?;

    let Some(cgroup) = systemd_cgroup_path(&content) else {
        trace!("cgroup: no systemd hierarchy in {}", path.display());
        return Ok(None);
    };
    trace!("cgroup: {} -> {cgroup}", path.display());

    owner_uid_from_path(cgroup)
}

/// Pick the cgroup path of the systemd hierarchy from `/proc/<pid>/cgroup`
/// contents.  The named v1 hierarchy wins over the unified one.
fn systemd_cgroup_path(content: &str) -> Option<&str> {
    let mut unified = None;

    for line in content.lines() {
        let mut fields = line.splitn(3, ':');
        let (Some(id), Some(controllers), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        if controllers == "name=systemd" {
            return Some(path);
        }
        if id == "0" && controllers.is_empty() {
            unified = Some(path);
        }
    }

    unified
}

/// Return the innermost slice of the leading run of `.slice` components, or
/// `-.slice` for the root.
pub fn slice_from_path(cgroup: &str) -> &str {
    cgroup
        .split('/')
        .filter(|c| !c.is_empty())
        .take_while(|c| c.ends_with(".slice"))
        .last()
        .unwrap_or("-.slice")
}

/// Derive the owner uid from a cgroup path such as
/// `/user.slice/user-1000.slice/user@1000.service/init.scope`.
pub fn owner_uid_from_path(cgroup: &str) -> Result<Option<u32>> {
    let slice = slice_from_path(cgroup);

    let Some(uid) = slice
        .strip_prefix("user-")
        .and_then(|s| s.strip_suffix(".slice"))
    else {
        return Ok(None);
    };

    uid.parse::<u32>()
        .ok()
        // (uid_t) -1 is never a valid owner
        .filter(|uid| *uid != u32::MAX)
        .map(Some)
        .ok_or_else(|| Error::InvalidOwner {
            slice: slice.to_owned(),
        })
}
