//! Canonical text form of variants.
//!
//! Values without a native encoding are stored as text. Printing is
//! deterministic and parsing is driven by the expected type, so
//! `parse(&print(v), &v.type_of()) == v` for every value (NaN aside).
//!
//! - booleans: `true`, `false`
//! - integers: decimal
//! - doubles: shortest round-trip form (`3.0`, `1e300`, `-10000000000.5`);
//!   any form accepted by [`f64::from_str`] is read back
//! - strings: single quoted with `\\`, `\'`, `\n`, `\t`, `\r` and `\uXXXX`
//!   escapes; double quotes are also accepted on input
//! - maybes: `nothing` or the inner value, with `just ` in front when the
//!   inner type is itself a maybe
//! - arrays `[a, b]`, tuples `(a, b)` and `(a,)`, dictionaries `{'k': v}`

use std::collections::BTreeMap;

use super::{Variant, VariantError, VariantType};

/// Prints a value in canonical text form.
pub fn print(value: &Variant) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Quotes a string the way it appears inside a printed value.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    write_quoted(&mut out, s);
    out
}

fn write_value(out: &mut String, value: &Variant) {
    match value {
        Variant::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Variant::Int32(n) => out.push_str(&n.to_string()),
        Variant::Int64(n) => out.push_str(&n.to_string()),
        Variant::UInt64(n) => out.push_str(&n.to_string()),
        Variant::Double(d) => out.push_str(&format!("{d:?}")),
        Variant::String(s) => write_quoted(out, s),
        Variant::Maybe { inner, value } => match value {
            None => out.push_str("nothing"),
            Some(v) => {
                if matches!(inner, VariantType::Maybe(_)) {
                    out.push_str("just ");
                }
                write_value(out, v);
            }
        },
        Variant::Array { items, .. } => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Variant::Tuple(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Variant::Dict { entries, .. } => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_quoted(out, k);
                out.push_str(": ");
                write_value(out, v);
            }
            out.push('}');
        }
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
}

/// Parses `text` as a value of type `ty`.
pub fn parse(text: &str, ty: &VariantType) -> Result<Variant, VariantError> {
    let mut parser = Parser {
        text,
        signature: ty,
        pos: 0,
    };
    let value = parser.value(ty)?;
    parser.skip_ws();
    if parser.pos != text.len() {
        return Err(parser.error("trailing characters after value"));
    }
    Ok(value)
}

struct Parser<'a> {
    text: &'a str,
    signature: &'a VariantType,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> VariantError {
        VariantError::Parse {
            text: self.text.to_string(),
            signature: self.signature.signature(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), VariantError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    /// Consumes the next run of word characters (letters, digits, `+-._`).
    fn word(&mut self) -> &str {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '+' | '-' | '.' | '_') {
                self.bump();
            } else {
                break;
            }
        }
        &self.text[start..self.pos]
    }

    fn peek_word(&mut self) -> String {
        let saved = self.pos;
        let word = self.word().to_string();
        self.pos = saved;
        word
    }

    fn value(&mut self, ty: &VariantType) -> Result<Variant, VariantError> {
        match ty {
            VariantType::Bool => match self.word() {
                "true" => Ok(Variant::Bool(true)),
                "false" => Ok(Variant::Bool(false)),
                other => {
                    let other = other.to_string();
                    Err(self.error(format!("expected boolean, found '{other}'")))
                }
            },
            VariantType::Int32 => self.number::<i32>().map(Variant::Int32),
            VariantType::Int64 => self.number::<i64>().map(Variant::Int64),
            VariantType::UInt64 => self.number::<u64>().map(Variant::UInt64),
            VariantType::Double => self.number::<f64>().map(Variant::Double),
            VariantType::String => self.string().map(Variant::String),
            VariantType::Maybe(inner) => self.maybe(inner),
            VariantType::Array(element) => self.array(element),
            VariantType::Tuple(fields) => self.tuple(fields),
            VariantType::Dict(value) => self.dict(value),
        }
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T, VariantError> {
        let word = self.word().to_string();
        if word.is_empty() {
            return Err(self.error("expected a number"));
        }
        word.parse::<T>()
            .map_err(|_| self.error(format!("'{word}' is not a valid number of this type")))
    }

    fn string(&mut self) -> Result<String, VariantError> {
        self.skip_ws();
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            Some(c) => return Err(self.error(format!("expected quoted string, found '{c}'"))),
            None => return Err(self.error("expected quoted string, found end of input")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => out.push(self.unicode_escape()?),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, VariantError> {
        let end = self.pos + 4;
        let digits = self
            .text
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated \\u escape"))?;
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| self.error(format!("invalid \\u escape '{digits}'")))?;
        let c = char::from_u32(code)
            .ok_or_else(|| self.error(format!("\\u{digits} is not a character")))?;
        self.pos = end;
        Ok(c)
    }

    fn maybe(&mut self, inner: &VariantType) -> Result<Variant, VariantError> {
        match self.peek_word().as_str() {
            "nothing" => {
                self.word();
                Ok(Variant::nothing(inner.clone()))
            }
            "just" => {
                self.word();
                let value = self.value(inner)?;
                Ok(Variant::Maybe {
                    inner: inner.clone(),
                    value: Some(Box::new(value)),
                })
            }
            _ => {
                let value = self.value(inner)?;
                Ok(Variant::Maybe {
                    inner: inner.clone(),
                    value: Some(Box::new(value)),
                })
            }
        }
    }

    /// Parses a comma separated list between `open` and `close`, calling
    /// `item` for each element. Returns whether a trailing comma was seen.
    fn list(
        &mut self,
        open: char,
        close: char,
        mut item: impl FnMut(&mut Self) -> Result<(), VariantError>,
    ) -> Result<bool, VariantError> {
        self.expect(open)?;
        self.skip_ws();
        if self.peek() == Some(close) {
            self.bump();
            return Ok(false);
        }
        loop {
            item(self)?;
            self.skip_ws();
            match self.bump() {
                Some(',') => {
                    self.skip_ws();
                    if self.peek() == Some(close) {
                        self.bump();
                        return Ok(true);
                    }
                }
                Some(c) if c == close => return Ok(false),
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{close}', found '{c}'")));
                }
                None => return Err(self.error(format!("expected '{close}', found end of input"))),
            }
        }
    }

    fn array(&mut self, element: &VariantType) -> Result<Variant, VariantError> {
        let mut items = Vec::new();
        self.list('[', ']', |p| {
            items.push(p.value(element)?);
            Ok(())
        })?;
        Ok(Variant::Array {
            element: element.clone(),
            items,
        })
    }

    fn tuple(&mut self, fields: &[VariantType]) -> Result<Variant, VariantError> {
        let mut items = Vec::with_capacity(fields.len());
        self.list('(', ')', |p| {
            let Some(field) = fields.get(items.len()) else {
                return Err(p.error(format!("tuple has more than {} fields", fields.len())));
            };
            items.push(p.value(field)?);
            Ok(())
        })?;
        if items.len() != fields.len() {
            return Err(self.error(format!(
                "tuple has {} fields, expected {}",
                items.len(),
                fields.len()
            )));
        }
        Ok(Variant::Tuple(items))
    }

    fn dict(&mut self, value: &VariantType) -> Result<Variant, VariantError> {
        let mut entries = BTreeMap::new();
        self.list('{', '}', |p| {
            let key = p.string()?;
            p.expect(':')?;
            let v = p.value(value)?;
            if entries.insert(key.clone(), v).is_some() {
                return Err(p.error(format!("duplicate dictionary key '{key}'")));
            }
            Ok(())
        })?;
        Ok(Variant::Dict {
            value: value.clone(),
            entries,
        })
    }
}
