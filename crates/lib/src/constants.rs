//! Constants used throughout the regsettings library.
//!
//! Limits mirror the native registry conventions the backend is mapped onto.

/// Root under which every settings path is placed, unless configured otherwise.
pub const DEFAULT_BASE_PATH: &str = "Software/GSettings";

/// Maximum number of native watches held at once.
///
/// The platform wait primitive accepts 64 handles and one slot is reserved
/// for the loop's own wake-up handle.
pub const DEFAULT_MAX_WATCHES: usize = 63;

/// Longest value name that is stored verbatim.
pub const MAX_VALUE_NAME_LEN: usize = 32;

/// Longest path component (sub-key name) that is stored verbatim.
pub const MAX_KEY_NAME_LEN: usize = 255;

/// Number of hex digits of the name digest appended to shortened names.
pub const NAME_DIGEST_LEN: usize = 16;

/// Separator between the kept prefix and the digest of a shortened name.
pub const NAME_DIGEST_SEPARATOR: char = '~';
