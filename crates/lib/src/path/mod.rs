//! Mapping of settings paths and key names onto the native namespace.
//!
//! A settings path such as `/org/example/editor/` is split into segments and
//! placed under the configured base root, giving a [`Location`] such as
//! `Software\GSettings\org\example\editor`. Segments holding characters the
//! native namespace cannot represent are escaped as `%XX` per UTF-8 byte.
//!
//! Key names become native value names. Names that are short enough and free
//! of reserved characters are kept as they are; anything else is shortened to
//! a fixed-length name ending in a digest of the full key. The reverse mapping
//! lives in the schema's [`KeyIndex`](crate::schema::KeyIndex).

pub mod errors;

use std::fmt::{self, Write as _};

use sha2::{Digest, Sha256};

pub use errors::LocationError;

use crate::{
    constants::{MAX_KEY_NAME_LEN, MAX_VALUE_NAME_LEN, NAME_DIGEST_LEN, NAME_DIGEST_SEPARATOR},
    schema::Schema,
};

/// A position in the native store: the base root followed by escaped segments.
///
/// Locations order lexicographically by segment, so an ancestor always sorts
/// before its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Location {
    components: Vec<String>,
}

impl Location {
    /// Builds a root location from a base path such as `Software/GSettings`.
    ///
    /// Both `/` and `\` are accepted as separators; empty parts are skipped.
    pub fn root(base: &str) -> Self {
        Self {
            components: base
                .split(['/', '\\'])
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Builds a location from already-escaped components.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses the native `a\b\c` form.
    pub fn from_native(native: &str) -> Self {
        Self::from_components(native.split('\\').filter(|part| !part.is_empty()))
    }

    /// The escaped components, outermost first.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Appends one already-escaped segment.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(segment.into());
        Self { components }
    }

    /// The enclosing location, or `None` at the top of the namespace.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.components.split_last()?;
        Some(Self {
            components: rest.to_vec(),
        })
    }

    /// True if `other` lies strictly below this location.
    pub fn is_ancestor_of(&self, other: &Location) -> bool {
        other.components.len() > self.components.len()
            && other.components.starts_with(&self.components)
    }

    /// True if `other` is this location or lies below it.
    pub fn contains(&self, other: &Location) -> bool {
        other.components.starts_with(&self.components)
    }

    /// The components of `self` below `ancestor`, if `ancestor` contains `self`.
    pub fn relative_to(&self, ancestor: &Location) -> Option<&[String]> {
        self.components.strip_prefix(ancestor.components.as_slice())
    }

    /// The deepest location containing both `self` and `other`.
    pub fn common_ancestor(&self, other: &Location) -> Location {
        let shared = self
            .components
            .iter()
            .zip(&other.components)
            .take_while(|(a, b)| a == b)
            .count();
        Self {
            components: self.components[..shared].to_vec(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.components.join("\\"))
    }
}

fn is_reserved(c: char) -> bool {
    c == '\\' || c.is_control()
}

/// Escapes one settings path segment for use as a native sub-key name.
///
/// `\`, control characters and `%` become `%XX` for each of their UTF-8
/// bytes. An empty segment becomes a lone `%`.
pub fn escape_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if is_reserved(c) || c == '%' {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                // Writing to a String cannot fail.
                let _ = write!(out, "%{byte:02X}");
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Maps one settings path segment to its native sub-key name.
///
/// The segment is escaped with [`escape_segment`]. Results longer than
/// [`MAX_KEY_NAME_LEN`] keep a prefix of whole escapes followed by `~` and
/// the first [`NAME_DIGEST_LEN`] hex digits of the SHA-256 of the raw
/// segment.
pub fn segment_name(segment: &str) -> String {
    let escaped = escape_segment(segment);
    if escaped.chars().count() <= MAX_KEY_NAME_LEN {
        return escaped;
    }
    let mut prefix: String = escaped
        .chars()
        .take(MAX_KEY_NAME_LEN - NAME_DIGEST_LEN - 1)
        .collect();
    // Every '%' starts a three character escape; never keep half of one.
    if let Some(cut) = prefix
        .char_indices()
        .rev()
        .take(2)
        .find(|(_, c)| *c == '%')
        .map(|(i, _)| i)
    {
        prefix.truncate(cut);
    }
    let digest = hex::encode(Sha256::digest(segment.as_bytes()));
    format!("{prefix}{NAME_DIGEST_SEPARATOR}{}", &digest[..NAME_DIGEST_LEN])
}

/// Reverses [`escape_segment`].
///
/// Shortened names produced by [`segment_name`] are not reversible; they
/// unescape to their prefix and digest.
pub fn unescape_segment(segment: &str) -> Result<String, LocationError> {
    if segment == "%" {
        return Ok(String::new());
    }
    let invalid = |reason: &str| LocationError::InvalidEscape {
        segment: segment.to_string(),
        reason: reason.to_string(),
    };

    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let digits = segment
                .get(i + 1..i + 3)
                .ok_or_else(|| invalid("truncated escape"))?;
            let byte =
                u8::from_str_radix(digits, 16).map_err(|_| invalid("escape is not two hex digits"))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| invalid("escapes do not form valid UTF-8"))
}

/// Maps a key name to its native value name.
///
/// Names of at most [`MAX_VALUE_NAME_LEN`] characters without reserved
/// characters are returned unchanged. Others keep a short prefix followed by
/// `~` and the first [`NAME_DIGEST_LEN`] hex digits of the SHA-256 of the
/// full name.
pub fn value_name(key: &str) -> String {
    if key.chars().count() <= MAX_VALUE_NAME_LEN && !key.chars().any(is_reserved) {
        return key.to_string();
    }
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    let prefix: String = key
        .chars()
        .take(MAX_VALUE_NAME_LEN - NAME_DIGEST_LEN - 1)
        .map(|c| if is_reserved(c) { '_' } else { c })
        .collect();
    format!("{prefix}{NAME_DIGEST_SEPARATOR}{}", &digest[..NAME_DIGEST_LEN])
}

/// Splits a `/a/b/` settings path into raw segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, LocationError> {
    let malformed = |reason: &str| LocationError::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if !path.starts_with('/') {
        return Err(malformed("path must begin with '/'"));
    }
    if !path.ends_with('/') {
        return Err(malformed("path must end with '/'"));
    }
    if path == "/" {
        return Ok(Vec::new());
    }
    Ok(path[1..path.len() - 1].split('/').collect())
}

/// Resolves the location of a schema instance under `base`.
///
/// Fixed-path schemas always live at their own path; relocatable schemas
/// need `instance_path`.
pub fn resolve(
    base: &Location,
    schema: &Schema,
    instance_path: Option<&str>,
) -> Result<Location, LocationError> {
    let path = match (schema.path(), instance_path) {
        (Some(fixed), Some(requested)) if fixed != requested => {
            tracing::debug!(
                schema = schema.id(),
                fixed,
                requested,
                "ignoring instance path for fixed-path schema"
            );
            fixed
        }
        (Some(fixed), _) => fixed,
        (None, Some(requested)) => requested,
        (None, None) => {
            return Err(LocationError::PathRequired {
                schema: schema.id().to_string(),
            });
        }
    };

    let mut components = base.components.clone();
    for segment in split_path(path)? {
        components.push(segment_name(segment));
    }
    Ok(Location { components })
}
