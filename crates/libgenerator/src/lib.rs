//! `libgenerator` is the support library shared by the systemd-rs unit
//! generators.  Generators are short-lived programs invoked with three output
//! directories before unit files are loaded; the pieces they have in common
//! live here so each generator crate only carries its own translation logic.
//!
//! It contains:
//! - Generator command line conventions and output helpers
//! - INI-style key/value file reading (unit files, D-Bus activation files)
//! - Unit name and D-Bus bus name validation
//! - cgroup ownership lookup (user vs system instance detection)
//! - Logging setup driven by the standard `SYSTEMD_LOG_*` environment
//! - A shared error type

pub mod bus_name;
pub mod cgroup;
pub mod config;
pub mod error;
pub mod generators;
pub mod ini;
pub mod logging;
pub mod unit_name;

pub use error::{Error, Result};
