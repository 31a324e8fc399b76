//! D-Bus bus name validation.
//!
//! Follows the well-formedness rules of the D-Bus specification for bus
//! names:
//!
//! - At most [`BUS_NAME_MAX`] bytes, never empty
//! - Unique names start with `:`, well-known names do not
//! - Two or more elements separated by single `.` characters
//! - Elements consist of `[A-Za-z0-9_-]`
//! - In well-known names an element may not start with a digit

/// Maximum length of a bus name in bytes.
pub const BUS_NAME_MAX: usize = 255;

/// The bus name claimed by the service manager itself.
pub const SYSTEMD_BUS_NAME: &str = "org.freedesktop.systemd1";

/// Check whether `name` is a valid unique or well-known bus name.
///
/// # Examples
///
/// ```
/// use libgenerator::bus_name::service_name_is_valid;
/// assert!(service_name_is_valid("org.freedesktop.Foo"));
/// assert!(service_name_is_valid(":1.42"));
/// assert!(!service_name_is_valid("nodot"));
/// assert!(!service_name_is_valid("org.9lives"));
/// ```
pub fn service_name_is_valid(name: &str) -> bool {
    if name.is_empty() || name.len() > BUS_NAME_MAX {
        return false;
    }

    let (unique, rest) = match name.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, name),
    };

    // `at_element_start` is true right after a dot (and at the beginning).
    let mut at_element_start = true;
    let mut found_dot = false;

    for c in rest.chars() {
        if c == '.' {
            if at_element_start {
                return false;
            }
            found_dot = true;
            at_element_start = true;
            continue;
        }

        let good = c.is_ascii_alphabetic()
            || c == '_'
            || c == '-'
            || (c.is_ascii_digit() && (unique || !at_element_start));
        if !good {
            return false;
        }
        at_element_start = false;
    }

    !at_element_start && found_dot
}
