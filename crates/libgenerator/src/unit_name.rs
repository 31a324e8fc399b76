//! Unit name validation.
//!
//! Implements the naming rules from `systemd.unit(5)`:
//!
//! - A unit name is a prefix followed by `.` and a known unit type suffix
//!   (`foo.service`, `dev-sda.device`, `getty@tty1.service`).
//! - The prefix may only contain `[a-zA-Z0-9:_.\-\\]`, plus at most one
//!   meaningful `@` separating a template from its instance.
//! - The whole name is shorter than [`UNIT_NAME_MAX`] bytes.

/// Maximum length of a unit name, including the suffix.
pub const UNIT_NAME_MAX: usize = 256;

/// Characters allowed in the prefix of a unit name (besides `@`).
fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.' | '\\')
}

/// The unit types a name suffix may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitType {
    Service,
    Socket,
    BusName,
    Target,
    Snapshot,
    Device,
    Mount,
    Automount,
    Swap,
    Timer,
    Path,
    Slice,
    Scope,
}

impl UnitType {
    const ALL: &'static [UnitType] = &[
        UnitType::Service,
        UnitType::Socket,
        UnitType::BusName,
        UnitType::Target,
        UnitType::Snapshot,
        UnitType::Device,
        UnitType::Mount,
        UnitType::Automount,
        UnitType::Swap,
        UnitType::Timer,
        UnitType::Path,
        UnitType::Slice,
        UnitType::Scope,
    ];

    /// The suffix without the leading dot, e.g. `"service"`.
    pub fn as_str(self) -> &'static str {
        match self {
            UnitType::Service => "service",
            UnitType::Socket => "socket",
            UnitType::BusName => "busname",
            UnitType::Target => "target",
            UnitType::Snapshot => "snapshot",
            UnitType::Device => "device",
            UnitType::Mount => "mount",
            UnitType::Automount => "automount",
            UnitType::Swap => "swap",
            UnitType::Timer => "timer",
            UnitType::Path => "path",
            UnitType::Slice => "slice",
            UnitType::Scope => "scope",
        }
    }

    /// Look up a unit type by its suffix (without the dot).
    pub fn from_suffix(suffix: &str) -> Option<UnitType> {
        Self::ALL.iter().copied().find(|t| t.as_str() == suffix)
    }
}

/// Return the unit type of `name` if it ends in a recognized suffix.
pub fn unit_type_from_name(name: &str) -> Option<UnitType> {
    let (_, suffix) = name.rsplit_once('.')?;
    UnitType::from_suffix(suffix)
}

/// Check whether `name` is a syntactically valid unit name.
///
/// Templates (`foo@.service`) are only accepted when `template_ok` is set;
/// instances (`foo@bar.service`) and plain names are always accepted.
///
/// # Examples
///
/// ```
/// use libgenerator::unit_name::unit_name_is_valid;
/// assert!(unit_name_is_valid("foo.service", false));
/// assert!(unit_name_is_valid("getty@tty1.service", false));
/// assert!(!unit_name_is_valid("getty@.service", false));
/// assert!(unit_name_is_valid("getty@.service", true));
/// assert!(!unit_name_is_valid("foo.bogus", false));
/// ```
pub fn unit_name_is_valid(name: &str, template_ok: bool) -> bool {
    if name.len() >= UNIT_NAME_MAX {
        return false;
    }

    let Some(dot_pos) = name.rfind('.') else {
        return false;
    };
    if dot_pos == 0 {
        return false;
    }
    if UnitType::from_suffix(&name[dot_pos + 1..]).is_none() {
        return false;
    }

    let prefix = &name[..dot_pos];
    let mut at_pos = None;
    for (i, c) in prefix.char_indices() {
        if c == '@' {
            at_pos.get_or_insert(i);
            continue;
        }
        if !is_valid_char(c) {
            return false;
        }
    }

    match at_pos {
        Some(0) => false,
        Some(i) if i + 1 == dot_pos => template_ok,
        _ => true,
    }
}
