//! Writing generated units to the destination directory.
//!
//! Unit files are created exclusively: an existing file is an error, never
//! overwritten.  Nothing is rolled back on failure, so a service unit may be
//! left behind when the busname unit after it cannot be written.

use libgenerator::Error;
use libgenerator::generators::add_symlink;
use log::debug;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::synthesize::{GeneratedUnit, Units};

/// Join `name` onto `dest`, reporting allocation failure instead of aborting.
fn dest_path(dest: &Path, name: &Path) -> Result<PathBuf, Error> {
    let mut path = PathBuf::new();
    let needed = dest.as_os_str().len() + name.as_os_str().len() + 1;
    if path.try_reserve(needed).is_err() {
        return Err(Error::OutOfMemory {
            path: dest.join(name),
        });
    }
    path.push(dest);
    path.push(name);
    Ok(path)
}

/// Create `path` with `contents`, failing if it already exists.
fn write_exclusive(path: &Path, contents: &str) -> Result<(), Error> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => Error::AlreadyExists {
                path: path.to_path_buf(),
            },
            _ => Error::Create {
                path: path.to_path_buf(),
                source,
            },
        })?;

    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn write_unit(dest: &Path, unit: &GeneratedUnit) -> Result<(), Error> {
    let path = dest_path(dest, Path::new(&unit.file_name))?;
    write_exclusive(&path, &unit.contents)?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Write `units` below `dest`: the service unit (if any), the busname unit,
/// then the wants symlink pointing at the busname unit's full path.
pub fn materialize(units: &Units, dest: &Path) -> Result<(), Error> {
    if let Some(service) = &units.service {
        write_unit(dest, service)?;
    }

    write_unit(dest, &units.busname)?;

    let link = dest_path(dest, &units.wants.link)?;
    let target = dest_path(dest, Path::new(&units.wants.target))?;
    add_symlink(&target, &link)?;
    debug!("linked {} -> {}", link.display(), target.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{ActivationRecord, ServiceRef};
    use crate::scope::BusScope;
    use crate::synthesize::synthesize_for_uid;
    use std::fs;

    fn units(service: ServiceRef) -> Units {
        let record = ActivationRecord {
            bus_name: "com.example.Foo".to_owned(),
            source_path: PathBuf::from("/usr/share/dbus-1/system-services/foo.service"),
            service,
        };
        synthesize_for_uid(&record, BusScope::System, 0)
    }

    fn exec_units() -> Units {
        units(ServiceRef::Exec {
            exec: "/usr/bin/foo".to_owned(),
            user: None,
        })
    }

    #[test]
    fn test_materialize_exec() {
        let dir = tempfile::tempdir().unwrap();
        let units = exec_units();
        materialize(&units, dir.path()).unwrap();

        let service = dir.path().join("dbus-com.example.Foo.service");
        let busname = dir.path().join("com.example.Foo.busname");
        let link = dir.path().join("busnames.target.wants/com.example.Foo.busname");

        assert_eq!(
            fs::read_to_string(&service).unwrap(),
            units.service.as_ref().unwrap().contents
        );
        assert_eq!(fs::read_to_string(&busname).unwrap(), units.busname.contents);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        // The link points at the written path, not just the unit name.
        assert_eq!(fs::read_link(&link).unwrap(), busname);
    }

    #[test]
    fn test_materialize_explicit_writes_no_service() {
        let dir = tempfile::tempdir().unwrap();
        materialize(&units(ServiceRef::Explicit("bar.service".to_owned())), dir.path()).unwrap();

        assert!(dir.path().join("com.example.Foo.busname").is_file());
        assert!(!dir.path().join("dbus-com.example.Foo.service").exists());

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["busnames.target.wants", "com.example.Foo.busname"]);
    }

    #[test]
    fn test_existing_busname_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let busname = dir.path().join("com.example.Foo.busname");
        fs::write(&busname, "stale").unwrap();

        let err = materialize(&exec_units(), dir.path()).unwrap_err();
        match &err {
            Error::AlreadyExists { path } => assert_eq!(path, &busname),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.errno(), libc::EEXIST);
        assert_eq!(fs::read_to_string(&busname).unwrap(), "stale");

        // The service unit written before the failure stays behind.
        assert!(dir.path().join("dbus-com.example.Foo.service").is_file());
        assert!(!dir.path().join("busnames.target.wants").exists());
    }

    #[test]
    fn test_rerun_fails_with_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        materialize(&exec_units(), dir.path()).unwrap();
        let before = fs::read_to_string(dir.path().join("dbus-com.example.Foo.service")).unwrap();

        let err = materialize(&exec_units(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }), "{err:?}");
        assert_eq!(
            fs::read_to_string(dir.path().join("dbus-com.example.Foo.service")).unwrap(),
            before
        );
    }

    #[test]
    fn test_existing_link_is_symlink_error() {
        let dir = tempfile::tempdir().unwrap();
        let wants = dir.path().join("busnames.target.wants");
        fs::create_dir(&wants).unwrap();
        fs::write(wants.join("com.example.Foo.busname"), "").unwrap();

        let err = materialize(&exec_units(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::Symlink { .. }), "{err:?}");
        // Both units were written before the link failed.
        assert!(dir.path().join("com.example.Foo.busname").is_file());
    }

    #[test]
    fn test_missing_dest_is_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("does-not-exist");
        let err = materialize(&exec_units(), &dest).unwrap_err();
        match err {
            Error::Create { path, source } => {
                assert_eq!(path, dest.join("dbus-com.example.Foo.service"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dest_path() {
        assert_eq!(
            dest_path(Path::new("/run/gen"), Path::new("a.busname")).unwrap(),
            PathBuf::from("/run/gen/a.busname")
        );
    }
}
