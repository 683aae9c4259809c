//! Conversion between variants and native values.
//!
//! | Type                        | Native form                    |
//! |-----------------------------|--------------------------------|
//! | `b`, `i`                    | `Dword`                        |
//! | `x`, `t`                    | `Qword` (two's complement)     |
//! | `s`                         | `String` with the raw text     |
//! | anything else               | `String` with canonical text   |
//!
//! Decoding is strict about the native kind. Readers use
//! [`decode_or_fallback`], which turns any failure into the key's default.

pub mod errors;

pub use errors::DecodeError;

use crate::{
    schema::SchemaKey,
    store::{NativeKind, NativeValue},
    variant::{Variant, VariantType, text},
};

/// The native kind values of type `ty` are stored as.
pub fn native_kind_for(ty: &VariantType) -> NativeKind {
    match ty {
        VariantType::Bool | VariantType::Int32 => NativeKind::Dword,
        VariantType::Int64 | VariantType::UInt64 => NativeKind::Qword,
        _ => NativeKind::String,
    }
}

/// Encodes a value in its native form.
pub fn encode(value: &Variant) -> NativeValue {
    match value {
        Variant::Bool(b) => NativeValue::Dword(u32::from(*b)),
        Variant::Int32(n) => NativeValue::Dword(*n as u32),
        Variant::Int64(n) => NativeValue::Qword(*n as u64),
        Variant::UInt64(n) => NativeValue::Qword(*n),
        Variant::String(s) => NativeValue::String(s.clone()),
        other => NativeValue::String(text::print(other)),
    }
}

/// Decodes a native value as type `ty`.
pub fn decode(native: &NativeValue, ty: &VariantType) -> Result<Variant, DecodeError> {
    let expected = native_kind_for(ty);
    match (ty, native) {
        (VariantType::Bool, NativeValue::Dword(n)) => match n {
            0 => Ok(Variant::Bool(false)),
            1 => Ok(Variant::Bool(true)),
            _ => Err(DecodeError::OutOfRange {
                value: u64::from(*n),
                signature: ty.signature(),
            }),
        },
        (VariantType::Int32, NativeValue::Dword(n)) => Ok(Variant::Int32(*n as i32)),
        (VariantType::Int64, NativeValue::Qword(n)) => Ok(Variant::Int64(*n as i64)),
        (VariantType::UInt64, NativeValue::Qword(n)) => Ok(Variant::UInt64(*n)),
        (VariantType::String, NativeValue::String(s)) => Ok(Variant::String(s.clone())),
        (_, NativeValue::String(s)) if expected == NativeKind::String => {
            Variant::parse(s, ty).map_err(|source| DecodeError::Malformed { source })
        }
        _ => Err(DecodeError::WrongNativeType {
            expected,
            actual: native.kind(),
        }),
    }
}

/// Outcome of reading a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A stored value decoded cleanly.
    Value(Variant),
    /// Nothing is stored; this is the default.
    Default(Variant),
    /// Something is stored but unusable; this is the default.
    Fallback {
        /// The key's default
        value: Variant,
        /// Why the stored value was rejected
        error: DecodeError,
    },
}

impl Decoded {
    /// The value a reader should see.
    pub fn value(&self) -> &Variant {
        match self {
            Decoded::Value(v) | Decoded::Default(v) | Decoded::Fallback { value: v, .. } => v,
        }
    }

    /// Consumes the outcome, returning the value a reader should see.
    pub fn into_value(self) -> Variant {
        match self {
            Decoded::Value(v) | Decoded::Default(v) | Decoded::Fallback { value: v, .. } => v,
        }
    }

    /// True if a stored value was rejected.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Decoded::Fallback { .. })
    }
}

/// Decodes whatever is stored for `key`, falling back to its default.
pub fn decode_or_fallback(native: Option<&NativeValue>, key: &SchemaKey) -> Decoded {
    let Some(native) = native else {
        return Decoded::Default(key.default_value().clone());
    };
    match decode(native, key.value_type()) {
        Ok(value) => Decoded::Value(value),
        Err(error) => Decoded::Fallback {
            value: key.default_value().clone(),
            error,
        },
    }
}
