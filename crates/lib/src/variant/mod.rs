//! The generic value model carried by settings keys.
//!
//! A [`Variant`] is an immutable tagged value. Every variant knows its own
//! [`VariantType`], including empty containers, so a value can always be
//! checked against the type a schema declares for a key.
//!
//! Variants have a canonical text form (see [`text`]) used when a value has
//! no richer native representation.
//!
//! ```
//! use regsettings::variant::{Variant, VariantType};
//!
//! let value = Variant::strv(["Hello world", "Pipo"]);
//! assert_eq!(value.type_of(), VariantType::string_array());
//! assert_eq!(value.to_string(), "['Hello world', 'Pipo']");
//! ```

pub mod errors;
pub mod signature;
pub mod text;

use std::{collections::BTreeMap, fmt};

pub use errors::VariantError;
pub use signature::VariantType;

/// A typed settings value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    /// Boolean value
    Bool(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// Double precision float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Nullable value of a fixed inner type
    Maybe {
        /// Type of the wrapped value
        inner: VariantType,
        /// The value, or `None` for nothing
        value: Option<Box<Variant>>,
    },
    /// Homogeneous sequence
    Array {
        /// Type of every element
        element: VariantType,
        /// The elements in order
        items: Vec<Variant>,
    },
    /// Fixed-arity heterogeneous sequence
    Tuple(Vec<Variant>),
    /// Mapping from string to values of one type
    Dict {
        /// Type of every value
        value: VariantType,
        /// The entries, ordered by key
        entries: BTreeMap<String, Variant>,
    },
}

impl Variant {
    /// Builds a string array (`as`).
    pub fn strv<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Variant::Array {
            element: VariantType::String,
            items: items.into_iter().map(|s| Variant::String(s.into())).collect(),
        }
    }

    /// Builds an empty maybe of the given inner type.
    pub fn nothing(inner: VariantType) -> Self {
        Variant::Maybe { inner, value: None }
    }

    /// Wraps a value in a maybe.
    pub fn just(value: Variant) -> Self {
        Variant::Maybe {
            inner: value.type_of(),
            value: Some(Box::new(value)),
        }
    }

    /// Builds a tuple.
    pub fn tuple(items: impl IntoIterator<Item = Variant>) -> Self {
        Variant::Tuple(items.into_iter().collect())
    }

    /// Builds an array, checking that every item has the element type.
    pub fn array(element: VariantType, items: Vec<Variant>) -> Result<Self, VariantError> {
        for item in &items {
            item.expect_type(&element)?;
        }
        Ok(Variant::Array { element, items })
    }

    /// Builds a string-keyed dictionary, checking every value's type.
    pub fn dict<K>(
        value: VariantType,
        entries: impl IntoIterator<Item = (K, Variant)>,
    ) -> Result<Self, VariantError>
    where
        K: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (k, v) in entries {
            v.expect_type(&value)?;
            map.insert(k.into(), v);
        }
        Ok(Variant::Dict {
            value,
            entries: map,
        })
    }

    /// Computes the type of this value.
    pub fn type_of(&self) -> VariantType {
        match self {
            Variant::Bool(_) => VariantType::Bool,
            Variant::Int32(_) => VariantType::Int32,
            Variant::Int64(_) => VariantType::Int64,
            Variant::UInt64(_) => VariantType::UInt64,
            Variant::Double(_) => VariantType::Double,
            Variant::String(_) => VariantType::String,
            Variant::Maybe { inner, .. } => VariantType::Maybe(Box::new(inner.clone())),
            Variant::Array { element, .. } => VariantType::Array(Box::new(element.clone())),
            Variant::Tuple(items) => VariantType::Tuple(items.iter().map(Variant::type_of).collect()),
            Variant::Dict { value, .. } => VariantType::Dict(Box::new(value.clone())),
        }
    }

    /// Returns the type signature of this value.
    pub fn type_signature(&self) -> String {
        self.type_of().signature()
    }

    /// Returns true if this value has exactly the given type.
    pub fn is_of_type(&self, ty: &VariantType) -> bool {
        &self.type_of() == ty
    }

    /// Fails with [`VariantError::TypeMismatch`] unless the value has type `ty`.
    pub fn expect_type(&self, ty: &VariantType) -> Result<(), VariantError> {
        let actual = self.type_of();
        if &actual == ty {
            Ok(())
        } else {
            Err(VariantError::TypeMismatch {
                expected: ty.signature(),
                actual: actual.signature(),
            })
        }
    }

    /// Parses the canonical text form as a value of type `ty`.
    pub fn parse(text: &str, ty: &VariantType) -> Result<Self, VariantError> {
        text::parse(text, ty)
    }

    /// Attempts to convert to a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to convert to a 32-bit integer
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Variant::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a 64-bit signed integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a 64-bit unsigned integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Variant::UInt64(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a double
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Attempts to convert to a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to convert to a list of strings (`as` only)
    pub fn as_strv(&self) -> Option<Vec<&str>> {
        match self {
            Variant::Array {
                element: VariantType::String,
                items,
            } => items.iter().map(Variant::as_str).collect(),
            _ => None,
        }
    }

    /// Attempts to view the fields of a tuple
    pub fn as_tuple(&self) -> Option<&[Variant]> {
        match self {
            Variant::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to view the items of an array
    pub fn as_array(&self) -> Option<&[Variant]> {
        match self {
            Variant::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Attempts to view the entries of a dictionary
    pub fn as_dict(&self) -> Option<&BTreeMap<String, Variant>> {
        match self {
            Variant::Dict { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// Unwraps a maybe. The outer `None` means "not a maybe".
    pub fn as_maybe(&self) -> Option<Option<&Variant>> {
        match self {
            Variant::Maybe { value, .. } => Some(value.as_deref()),
            _ => None,
        }
    }
}

/// The canonical text form.
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&text::print(self))
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$variant(value)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => String,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl From<Vec<String>> for Variant {
    fn from(value: Vec<String>) -> Self {
        Variant::strv(value)
    }
}

impl From<&[&str]> for Variant {
    fn from(value: &[&str]) -> Self {
        Variant::strv(value.iter().copied())
    }
}
