use crate::config::{LogTarget, LoggingConfig};
use std::fs::OpenOptions;

const KMSG: &str = "/dev/kmsg";

/// Syslog priority for a log level, as used in the `<N>` prefix understood
/// by `/dev/kmsg`.
fn syslog_priority(level: log::Level) -> u8 {
    match level {
        log::Level::Error => 3,
        log::Level::Warn => 4,
        log::Level::Info => 6,
        log::Level::Debug | log::Level::Trace => 7,
    }
}

fn console_dispatch(color: bool) -> fern::Dispatch {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = record.level();
            let shown_level = if color {
                match level {
                    log::Level::Error => format!("\x1b[31m{}\x1b[0m", level),
                    log::Level::Warn => format!("\x1b[33m{}\x1b[0m", level),
                    log::Level::Info => format!("\x1b[32m{}\x1b[0m", level),
                    log::Level::Debug => format!("\x1b[34m{}\x1b[0m", level),
                    log::Level::Trace => format!("\x1b[36m{}\x1b[0m", level),
                }
            } else {
                level.to_string()
            };
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                shown_level,
                message
            ));
        })
        .chain(std::io::stderr())
}

fn kmsg_dispatch(ident: &'static str, kmsg: std::fs::File) -> fern::Dispatch {
    let pid = nix::unistd::getpid();
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "<{}>{}[{}]: {}",
                syslog_priority(record.level()),
                ident,
                pid,
                message
            ));
        })
        .chain(kmsg)
}

/// Install the global logger.
///
/// `ident` is the program name used to tag kernel log lines.  With the
/// `safe`/`auto` targets the kernel log is preferred and stderr is used when
/// `/dev/kmsg` cannot be opened (e.g. when running unprivileged).
pub fn setup_logging(ident: &'static str, conf: &LoggingConfig) -> Result<(), String> {
    let open_kmsg = || OpenOptions::new().append(true).open(KMSG);

    let output = match conf.target {
        LogTarget::Null => fern::Dispatch::new(),
        LogTarget::Console => console_dispatch(conf.color),
        LogTarget::Kmsg => {
            let kmsg = open_kmsg().map_err(|e| format!("Failed to open {KMSG}: {e}"))?;
            kmsg_dispatch(ident, kmsg)
        }
        LogTarget::Safe | LogTarget::Auto => match open_kmsg() {
            Ok(kmsg) => kmsg_dispatch(ident, kmsg),
            Err(_) => console_dispatch(conf.color),
        },
    };

    fern::Dispatch::new()
        .level(conf.level)
        .chain(output)
        .apply()
        .map_err(|e| format!("Error while setting up logger: {e}"))
}
