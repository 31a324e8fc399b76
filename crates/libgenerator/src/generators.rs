//! Generator side of the systemd generator protocol.
//!
//! The service manager runs every generator early during boot, before unit
//! files are loaded, as
//!
//! ```text
//! <generator> <normal_dir> <early_dir> <late_dir>
//! ```
//!
//! and then adds those directories to the unit search path:
//!
//! - `normal_dir` (`/run/systemd/generator/`) between `/etc` and `/run`
//! - `early_dir` (`/run/systemd/generator.early/`) before `/etc`
//! - `late_dir` (`/run/systemd/generator.late/`) after `/lib`
//!
//! Generators may also be run by hand without arguments, in which case they
//! write to a fallback directory of their choice.
//!
//! This module holds the pieces every generator needs: argument handling and
//! the directory/symlink primitives used to wire generated units into
//! targets.

use log::trace;
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Target pulling in all `.busname` units.
pub const BUSNAMES_TARGET: &str = "busnames.target";

/// Output directories handed to a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorDirs {
    pub normal_dir: PathBuf,
    pub early_dir: PathBuf,
    pub late_dir: PathBuf,
}

impl GeneratorDirs {
    /// Interpret the positional arguments of a generator.
    ///
    /// Either no arguments (every directory is `fallback`) or exactly three
    /// are accepted.
    pub fn from_args(args: &[PathBuf], fallback: &Path) -> Result<GeneratorDirs> {
        match args {
            [] => Ok(GeneratorDirs {
                normal_dir: fallback.to_path_buf(),
                early_dir: fallback.to_path_buf(),
                late_dir: fallback.to_path_buf(),
            }),
            [normal, early, late] => Ok(GeneratorDirs {
                normal_dir: normal.clone(),
                early_dir: early.clone(),
                late_dir: late.clone(),
            }),
            _ => Err(Error::Usage),
        }
    }
}

/// Create all missing parent directories of `path` with `mode`.
/// Directories that already exist are left alone.
pub fn mkdir_parents(path: &Path, mode: u32) -> std::io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    trace!("generators: creating {}", parent.display());
    DirBuilder::new().recursive(true).mode(mode).create(parent)
}

/// Path of the symlink that makes `target` want `unit`, below `dir`.
///
/// ```
/// use libgenerator::generators::wants_link_path;
/// use std::path::Path;
/// assert_eq!(
///     wants_link_path(Path::new("/run/gen"), "busnames.target", "a.b.busname"),
///     Path::new("/run/gen/busnames.target.wants/a.b.busname"),
/// );
/// ```
pub fn wants_link_path(dir: &Path, target: &str, unit: &str) -> PathBuf {
    dir.join(format!("{target}.wants")).join(unit)
}

/// Create `link` pointing at `target`, creating the parent directories of
/// `link` first.  A failure to create the parents is not reported on its own;
/// the symlink call then fails and that error is returned.
pub fn add_symlink(target: &Path, link: &Path) -> Result<()> {
    if let Err(e) = mkdir_parents(link, 0o755) {
        trace!(
            "generators: failed to create parents of {}: {e}",
            link.display()
        );
    }

    std::os::unix::fs::symlink(target, link).map_err(|source| Error::Symlink {
        path: link.to_path_buf(),
        source,
    })
}
