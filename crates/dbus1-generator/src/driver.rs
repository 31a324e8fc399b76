//! Walking the activation directory.
//!
//! Every `*.service` file in the scope's activation directory is read,
//! validated, rendered and written independently.  A failing file does not
//! stop the others; the last hard error is reported once all of them have
//! been tried.

use libgenerator::{Error, ini};
use log::{debug, error, info, log};
use std::io;
use std::path::{Path, PathBuf};

use crate::activation::{self, RawDescriptor};
use crate::config::Config;
use crate::materialize::materialize;
use crate::scope::BusScope;
use crate::synthesize::synthesize;

/// Counters for the end-of-run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// What happened to a single activation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Generated,
    Skipped,
    /// The file disappeared between listing and reading.
    Vanished,
}

/// List the activation files in `dir`, sorted by name.  Hidden entries are
/// skipped, and a missing directory has no activation files.
fn list_activation_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let enumerate_error = |source| Error::Enumerate {
        path: dir.to_path_buf(),
        source,
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist, nothing to do", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(enumerate_error(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(enumerate_error)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with('.') && name.ends_with(".service") {
            files.push(entry.path());
        }
    }
    files.sort();

    Ok(files)
}

/// Translate the activation file at `path` into units below `config.dest`.
pub fn add_dbus(path: &Path, config: &Config, scope: BusScope) -> Result<FileOutcome, Error> {
    let Some(section) = ini::read_section(path, activation::SECTION)? else {
        return Ok(FileOutcome::Vanished);
    };

    let raw = RawDescriptor::from_section(path, section);
    let record = match activation::validate(raw, scope) {
        Ok(record) => record,
        Err(skip) => {
            log!(skip.log_level(), "{skip}");
            return Ok(FileOutcome::Skipped);
        }
    };

    let units = synthesize(&record, scope);
    materialize(&units, &config.dest)?;

    debug!(
        "{} -> {} for {}",
        path.display(),
        units.busname.file_name,
        record.bus_name
    );
    Ok(FileOutcome::Generated)
}

/// Process every activation file of `scope`.
///
/// Returns the last hard error if any file failed, after all files have been
/// attempted.
pub fn parse_dbus_fragments(config: &Config, scope: BusScope) -> Result<RunSummary, Error> {
    let dir = scope.services_dir(config);
    let files = list_activation_files(dir).inspect_err(|e| error!("{e}"))?;

    let mut summary = RunSummary::default();
    let mut last_error = None;

    for path in &files {
        match add_dbus(path, config, scope) {
            Ok(FileOutcome::Generated) => summary.generated += 1,
            Ok(FileOutcome::Skipped) => summary.skipped += 1,
            Ok(FileOutcome::Vanished) => {}
            Err(e) => {
                error!("{e}");
                summary.failed += 1;
                last_error = Some(e);
            }
        }
    }

    info!(
        "Processed {} activation file(s) in {}: {} generated, {} skipped, {} failed",
        files.len(),
        dir.display(),
        summary.generated,
        summary.skipped,
        summary.failed
    );

    match last_error {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        config: Config,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let config = Config {
            dest: root.path().join("dest"),
            session_services_dir: root.path().join("services"),
            system_services_dir: root.path().join("system-services"),
            kdbus_control: root.path().join("kdbus/control"),
        };
        fs::create_dir(&config.dest).unwrap();
        Fixture {
            _root: root,
            config,
        }
    }

    fn write_activation(dir: &Path, file: &str, content: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(file);
        fs::write(&path, content).unwrap();
        path
    }

    fn dest_entries(config: &Config) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&config.dest)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_absent_source_dir() {
        let f = fixture();
        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(dest_entries(&f.config).is_empty());
    }

    #[test]
    fn test_empty_source_dir() {
        let f = fixture();
        fs::create_dir(&f.config.system_services_dir).unwrap();
        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(dest_entries(&f.config).is_empty());
    }

    #[test]
    fn test_system_exec_descriptor() {
        let f = fixture();
        let source = write_activation(
            &f.config.system_services_dir,
            "com.example.Foo.service",
            "[D-BUS Service]\nName=com.example.Foo\nExec=/usr/bin/foo\n",
        );

        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(summary.generated, 1);

        let service =
            fs::read_to_string(f.config.dest.join("dbus-com.example.Foo.service")).unwrap();
        assert!(service.contains("ExecStart=/usr/bin/foo\n"));
        assert!(service.contains("BusName=com.example.Foo\n"));
        assert!(service.contains(&format!("Source={}\n", source.display())));
        assert!(service.contains("Environment=DBUS_STARTER_ADDRESS=kernel:/dev/kdbus/0-system\n"));

        let busname = f.config.dest.join("com.example.Foo.busname");
        assert!(
            fs::read_to_string(&busname)
                .unwrap()
                .contains("Service=dbus-com.example.Foo.service\n")
        );

        let link = f
            .config
            .dest
            .join("busnames.target.wants/com.example.Foo.busname");
        assert_eq!(fs::read_link(link).unwrap(), busname);
    }

    #[test]
    fn test_session_scope_reads_session_dir() {
        let f = fixture();
        write_activation(
            &f.config.session_services_dir,
            "bar.service",
            "[D-BUS Service]\nName=com.example.Bar\nSystemdService=bar.service\n",
        );
        // Not looked at for the session bus.
        write_activation(
            &f.config.system_services_dir,
            "foo.service",
            "[D-BUS Service]\nName=com.example.Foo\nExec=/usr/bin/foo\n",
        );

        let summary = parse_dbus_fragments(&f.config, BusScope::User).unwrap();
        assert_eq!(summary.generated, 1);
        assert_eq!(
            dest_entries(&f.config),
            ["busnames.target.wants", "com.example.Bar.busname"]
        );
        let busname = fs::read_to_string(f.config.dest.join("com.example.Bar.busname")).unwrap();
        assert!(busname.contains("Service=bar.service\n"));
    }

    #[test]
    fn test_skips_do_not_fail_the_run() {
        let f = fixture();
        let dir = &f.config.system_services_dir;
        write_activation(dir, "a.service", "[D-BUS Service]\nExec=/usr/bin/a\n");
        write_activation(dir, "b.service", "[D-BUS Service]\nName=nodot\nExec=/usr/bin/b\n");
        write_activation(
            dir,
            "c.service",
            "[D-BUS Service]\nName=org.freedesktop.systemd1\nExec=/usr/lib/systemd/systemd\n",
        );
        write_activation(
            dir,
            "d.service",
            "[D-BUS Service]\nName=com.example.D\nSystemdService=d.target\n",
        );
        write_activation(dir, "e.service", "[D-BUS Service]\nName=com.example.E\nExec=/bin/false\n");
        write_activation(dir, "f.service", "[D-BUS Service]\nName=com.example.F\nExec=f\n");

        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                generated: 0,
                skipped: 6,
                failed: 0
            }
        );
        assert!(dest_entries(&f.config).is_empty());
    }

    #[test]
    fn test_only_service_files_are_considered() {
        let f = fixture();
        let dir = &f.config.system_services_dir;
        write_activation(
            dir,
            "com.example.Foo.conf",
            "[D-BUS Service]\nName=com.example.Foo\nExec=/usr/bin/foo\n",
        );
        write_activation(dir, "README", "not an activation file");

        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn test_hidden_files_are_skipped() {
        let f = fixture();
        write_activation(
            &f.config.system_services_dir,
            ".hidden.service",
            "[D-BUS Service]\nName=com.example.H\nExec=/usr/bin/h\n",
        );

        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(dest_entries(&f.config).is_empty());
    }

    #[test]
    fn test_foreign_sections_and_preamble_are_tolerated() {
        let f = fixture();
        let dir = &f.config.system_services_dir;
        write_activation(
            dir,
            "a.service",
            "[X-Vendor]\nsome free text\n[D-BUS Service]\nName=com.example.A\nExec=/usr/bin/a\n",
        );
        write_activation(
            dir,
            "b.service",
            "Foo=bar\n[D-BUS Service]\nName=com.example.B\nExec=/usr/bin/b\n",
        );

        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(summary.generated, 2);
        assert!(f.config.dest.join("com.example.A.busname").is_file());
        assert!(f.config.dest.join("com.example.B.busname").is_file());
    }

    #[test]
    fn test_non_utf8_comment_is_tolerated() {
        let f = fixture();
        fs::create_dir_all(&f.config.system_services_dir).unwrap();
        fs::write(
            f.config.system_services_dir.join("a.service"),
            b"# caf\xe9\n[D-BUS Service]\nName=com.example.A\nExec=/usr/bin/a\n",
        )
        .unwrap();

        let summary = parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        assert_eq!(summary.generated, 1);
        assert!(f.config.dest.join("dbus-com.example.A.service").is_file());
    }

    #[test]
    fn test_error_does_not_stop_later_files() {
        let f = fixture();
        let dir = &f.config.system_services_dir;
        // Sorted first, and its busname unit already exists.
        write_activation(
            dir,
            "a.service",
            "[D-BUS Service]\nName=com.example.A\nExec=/usr/bin/a\n",
        );
        fs::write(f.config.dest.join("com.example.A.busname"), "stale").unwrap();
        write_activation(
            dir,
            "b.service",
            "[D-BUS Service]\nName=com.example.B\nExec=/usr/bin/b\n",
        );

        let err = parse_dbus_fragments(&f.config, BusScope::System).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }), "{err:?}");
        assert_eq!(
            fs::read_to_string(f.config.dest.join("com.example.A.busname")).unwrap(),
            "stale"
        );
        assert!(f.config.dest.join("com.example.B.busname").is_file());
        assert!(f.config.dest.join("dbus-com.example.B.service").is_file());
    }

    #[test]
    fn test_last_error_is_reported() {
        let f = fixture();
        let dir = &f.config.system_services_dir;
        write_activation(dir, "a.service", "[D-BUS Service]\nName=com.example.A\nExec=/usr/bin/a\n");
        write_activation(dir, "b.service", "[D-BUS Service]\ngarbage line\n");
        fs::write(f.config.dest.join("dbus-com.example.A.service"), "").unwrap();

        let err = parse_dbus_fragments(&f.config, BusScope::System).unwrap_err();
        match err {
            Error::Parse { path, line, .. } => {
                assert_eq!(path, dir.join("b.service"));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rerun_into_same_dest_fails() {
        let f = fixture();
        write_activation(
            &f.config.system_services_dir,
            "foo.service",
            "[D-BUS Service]\nName=com.example.Foo\nExec=/usr/bin/foo\n",
        );

        parse_dbus_fragments(&f.config, BusScope::System).unwrap();
        let err = parse_dbus_fragments(&f.config, BusScope::System).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }), "{err:?}");
    }

    #[test]
    fn test_add_dbus_vanished_file() {
        let f = fixture();
        let outcome = add_dbus(
            &f.config.system_services_dir.join("gone.service"),
            &f.config,
            BusScope::System,
        )
        .unwrap();
        assert_eq!(outcome, FileOutcome::Vanished);
    }

    #[test]
    fn test_source_dir_is_a_file() {
        let f = fixture();
        fs::write(&f.config.system_services_dir, "").unwrap();
        let err = parse_dbus_fragments(&f.config, BusScope::System).unwrap_err();
        assert!(matches!(err, Error::Enumerate { .. }), "{err:?}");
    }
}
