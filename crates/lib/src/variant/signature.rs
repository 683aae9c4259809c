//! Type signatures.
//!
//! A signature is a compact string naming a value type, one character per
//! basic type and a small set of container constructors:
//!
//! | Signature   | Type                                  |
//! |-------------|---------------------------------------|
//! | `b`         | boolean                               |
//! | `i`         | 32-bit signed integer                 |
//! | `x`         | 64-bit signed integer                 |
//! | `t`         | 64-bit unsigned integer               |
//! | `d`         | double                                |
//! | `s`         | UTF-8 string                          |
//! | `mT`        | maybe `T`                             |
//! | `aT`        | array of `T`                          |
//! | `(T...)`    | tuple                                 |
//! | `a{sT}`     | mapping of string to `T`              |

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::VariantError;

/// The type of a [`Variant`](super::Variant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariantType {
    /// `b`
    Bool,
    /// `i`
    Int32,
    /// `x`
    Int64,
    /// `t`
    UInt64,
    /// `d`
    Double,
    /// `s`
    String,
    /// `m` followed by the inner type
    Maybe(Box<VariantType>),
    /// `a` followed by the element type
    Array(Box<VariantType>),
    /// `(...)` with the field types in order
    Tuple(Vec<VariantType>),
    /// `a{s...}`, string keys mapping to the given value type
    Dict(Box<VariantType>),
}

impl VariantType {
    /// Shorthand for `as`, the string array type.
    pub fn string_array() -> Self {
        VariantType::Array(Box::new(VariantType::String))
    }

    /// Returns true for the single-character basic types.
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            VariantType::Bool
                | VariantType::Int32
                | VariantType::Int64
                | VariantType::UInt64
                | VariantType::Double
                | VariantType::String
        )
    }

    /// Returns true for maybe, array, tuple and dict types.
    pub fn is_container(&self) -> bool {
        !self.is_basic()
    }

    /// Renders the signature string.
    pub fn signature(&self) -> String {
        self.to_string()
    }

    /// Parses a complete signature string.
    pub fn parse(signature: &str) -> Result<Self, VariantError> {
        let mut parser = SignatureParser {
            signature,
            chars: signature.char_indices().peekable(),
        };
        let ty = parser.parse_one()?;
        if let Some((offset, _)) = parser.chars.next() {
            return Err(parser.invalid(format!(
                "trailing characters after a complete type at offset {offset}"
            )));
        }
        Ok(ty)
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantType::Bool => f.write_str("b"),
            VariantType::Int32 => f.write_str("i"),
            VariantType::Int64 => f.write_str("x"),
            VariantType::UInt64 => f.write_str("t"),
            VariantType::Double => f.write_str("d"),
            VariantType::String => f.write_str("s"),
            VariantType::Maybe(inner) => write!(f, "m{inner}"),
            VariantType::Array(element) => write!(f, "a{element}"),
            VariantType::Tuple(fields) => {
                f.write_str("(")?;
                for field in fields {
                    write!(f, "{field}")?;
                }
                f.write_str(")")
            }
            VariantType::Dict(value) => write!(f, "a{{s{value}}}"),
        }
    }
}

impl FromStr for VariantType {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariantType::parse(s)
    }
}

impl Serialize for VariantType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.signature())
    }
}

impl<'de> Deserialize<'de> for VariantType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let signature = String::deserialize(deserializer)?;
        VariantType::parse(&signature).map_err(serde::de::Error::custom)
    }
}

struct SignatureParser<'a> {
    signature: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl SignatureParser<'_> {
    fn invalid(&self, reason: impl Into<String>) -> VariantError {
        VariantError::InvalidSignature {
            signature: self.signature.to_string(),
            reason: reason.into(),
        }
    }

    fn unsupported(&self, reason: impl Into<String>) -> VariantError {
        VariantError::UnsupportedType {
            signature: self.signature.to_string(),
            reason: reason.into(),
        }
    }

    fn parse_one(&mut self) -> Result<VariantType, VariantError> {
        let Some((offset, c)) = self.chars.next() else {
            return Err(self.invalid("expected a type, found end of signature"));
        };
        match c {
            'b' => Ok(VariantType::Bool),
            'i' => Ok(VariantType::Int32),
            'x' => Ok(VariantType::Int64),
            't' => Ok(VariantType::UInt64),
            'd' => Ok(VariantType::Double),
            's' => Ok(VariantType::String),
            'm' => Ok(VariantType::Maybe(Box::new(self.parse_one()?))),
            'a' => {
                if matches!(self.chars.peek(), Some((_, '{'))) {
                    self.chars.next();
                    self.parse_dict_entry()
                } else {
                    Ok(VariantType::Array(Box::new(self.parse_one()?)))
                }
            }
            '(' => {
                let mut fields = Vec::new();
                loop {
                    match self.chars.peek() {
                        Some((_, ')')) => {
                            self.chars.next();
                            return Ok(VariantType::Tuple(fields));
                        }
                        Some(_) => fields.push(self.parse_one()?),
                        None => return Err(self.invalid("unterminated tuple")),
                    }
                }
            }
            'y' | 'n' | 'q' | 'u' | 'h' | 'o' | 'g' | 'v' => Err(self.unsupported(format!(
                "basic type '{c}' has no native mapping"
            ))),
            other => Err(self.invalid(format!("unexpected '{other}' at offset {offset}"))),
        }
    }

    fn parse_dict_entry(&mut self) -> Result<VariantType, VariantError> {
        let key = self.parse_one()?;
        if key != VariantType::String {
            return Err(self.unsupported(format!(
                "dictionary keys must be strings, found '{key}'"
            )));
        }
        let value = self.parse_one()?;
        match self.chars.next() {
            Some((_, '}')) => Ok(VariantType::Dict(Box::new(value))),
            _ => Err(self.invalid("dictionary entry must hold exactly a key and a value")),
        }
    }
}
