// Binary encoding of IR
//
//  Copyright (C) 2014-2022 Ryan Specialty Group, LLC.
//
//  This file is part of klink.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Binary encoding of declarations.
//!
//! Every value is encoded as follows:
//!
//!   - Strings are a `usize` byte length followed by UTF-8 bytes;
//!   - Sequences are a `usize` element count followed by each element;
//!   - Optional values are a `u8` flag (`0` or `1`) followed by the value
//!       if present;
//!   - [`StableId`]s are a `u64`;
//!   - Enumerations are a `u8` tag followed by the fields of the variant.
//!
//! Expression tags,
//!   in order,
//!   are `Const`, `Ref`, `Call`, `New`, `Block`, `Let`, `Local` and
//!   `Return`, numbered from `0`.
//! Literal tags are `Null`, `Bool`, `Int` and `Str`.
//! Declaration kind tags are those of [`DeclKind::tag`].
//!
//! Expressions nest no deeper than
//!   [`MAX_EXPR_DEPTH`](crate::global::MAX_EXPR_DEPTH);
//!     decoding fails past that depth.
//!
//! Tags are never reassigned;
//!   a change in encoding requires a change in
//!   [`DECL_FORMAT_VERSION`](crate::global::DECL_FORMAT_VERSION).

use winter_utils::{
    ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable,
};

use crate::global;
use crate::ir::{DeclKind, Declaration, Expr, Literal, StableId};

const EXPR_CONST: u8 = 0;
const EXPR_REF: u8 = 1;
const EXPR_CALL: u8 = 2;
const EXPR_NEW: u8 = 3;
const EXPR_BLOCK: u8 = 4;
const EXPR_LET: u8 = 5;
const EXPR_LOCAL: u8 = 6;
const EXPR_RETURN: u8 = 7;

const LIT_NULL: u8 = 0;
const LIT_BOOL: u8 = 1;
const LIT_INT: u8 = 2;
const LIT_STR: u8 = 3;

pub fn write_string<W: ByteWriter>(target: &mut W, s: &str) {
    target.write_usize(s.len());
    target.write_bytes(s.as_bytes());
}

pub fn read_string<R: ByteReader>(
    source: &mut R,
) -> Result<String, DeserializationError> {
    let len = source.read_usize()?;
    let bytes = source.read_slice(len)?;

    String::from_utf8(bytes.to_vec())
        .map_err(|e| DeserializationError::InvalidValue(e.to_string()))
}

pub fn write_flag<W: ByteWriter>(target: &mut W, flag: bool) {
    target.write_u8(flag as u8);
}

pub fn read_flag<R: ByteReader>(
    source: &mut R,
) -> Result<bool, DeserializationError> {
    match source.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DeserializationError::InvalidValue(format!(
            "invalid flag byte {other}"
        ))),
    }
}

pub fn write_seq<W: ByteWriter, T: Serializable>(target: &mut W, items: &[T]) {
    target.write_usize(items.len());
    items.iter().for_each(|item| item.write_into(target));
}

pub fn read_seq<R: ByteReader, T: Deserializable>(
    source: &mut R,
) -> Result<Vec<T>, DeserializationError> {
    let len = source.read_usize()?;

    // Untrusted length.
    let mut items = Vec::with_capacity(len.min(1024));

    for _ in 0..len {
        items.push(T::read_from(source)?);
    }

    Ok(items)
}

pub fn write_strings<W: ByteWriter>(target: &mut W, items: &[String]) {
    target.write_usize(items.len());
    items.iter().for_each(|item| write_string(target, item));
}

pub fn read_strings<R: ByteReader>(
    source: &mut R,
) -> Result<Vec<String>, DeserializationError> {
    let len = source.read_usize()?;
    let mut items = Vec::with_capacity(len.min(1024));

    for _ in 0..len {
        items.push(read_string(source)?);
    }

    Ok(items)
}

impl Serializable for StableId {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        target.write_u64(self.as_u64());
    }
}

impl Deserializable for StableId {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_u64().map(StableId::from_raw)
    }
}

impl Serializable for DeclKind {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        target.write_u8(self.tag());
    }
}

impl Deserializable for DeclKind {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let tag = source.read_u8()?;

        DeclKind::from_tag(tag).ok_or_else(|| {
            DeserializationError::InvalidValue(format!(
                "unknown declaration kind tag {tag}"
            ))
        })
    }
}

impl Serializable for Literal {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        match self {
            Self::Null => target.write_u8(LIT_NULL),
            Self::Bool(b) => {
                target.write_u8(LIT_BOOL);
                write_flag(target, *b);
            }
            Self::Int(i) => {
                target.write_u8(LIT_INT);
                target.write_u64(*i as u64);
            }
            Self::Str(s) => {
                target.write_u8(LIT_STR);
                write_string(target, s);
            }
        }
    }
}

impl Deserializable for Literal {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        match source.read_u8()? {
            LIT_NULL => Ok(Self::Null),
            LIT_BOOL => read_flag(source).map(Self::Bool),
            LIT_INT => source.read_u64().map(|i| Self::Int(i as i64)),
            LIT_STR => read_string(source).map(Self::Str),
            tag => Err(DeserializationError::InvalidValue(format!(
                "unknown literal tag {tag}"
            ))),
        }
    }
}

impl Serializable for Expr {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        match self {
            Self::Const(lit) => {
                target.write_u8(EXPR_CONST);
                lit.write_into(target);
            }
            Self::Ref(id) => {
                target.write_u8(EXPR_REF);
                id.write_into(target);
            }
            Self::Call { callee, args } => {
                target.write_u8(EXPR_CALL);
                callee.write_into(target);
                write_seq(target, args);
            }
            Self::New { class, args } => {
                target.write_u8(EXPR_NEW);
                class.write_into(target);
                write_seq(target, args);
            }
            Self::Block(exprs) => {
                target.write_u8(EXPR_BLOCK);
                write_seq(target, exprs);
            }
            Self::Let { name, value } => {
                target.write_u8(EXPR_LET);
                write_string(target, name);
                value.write_into(target);
            }
            Self::Local(name) => {
                target.write_u8(EXPR_LOCAL);
                write_string(target, name);
            }
            Self::Return(value) => {
                target.write_u8(EXPR_RETURN);
                write_flag(target, value.is_some());

                if let Some(value) = value {
                    value.write_into(target);
                }
            }
        }
    }
}

impl Deserializable for Expr {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        read_expr(source, 1)
    }
}

/// Decode an expression at nesting level `depth`.
fn read_expr<R: ByteReader>(
    source: &mut R,
    depth: usize,
) -> Result<Expr, DeserializationError> {
    if depth > global::MAX_EXPR_DEPTH {
        return Err(DeserializationError::InvalidValue(format!(
            "expression nesting exceeds {}",
            global::MAX_EXPR_DEPTH
        )));
    }

    let inner = depth + 1;

    match source.read_u8()? {
        EXPR_CONST => Literal::read_from(source).map(Expr::Const),
        EXPR_REF => StableId::read_from(source).map(Expr::Ref),
        EXPR_CALL => Ok(Expr::Call {
            callee: StableId::read_from(source)?,
            args: read_exprs(source, inner)?,
        }),
        EXPR_NEW => Ok(Expr::New {
            class: StableId::read_from(source)?,
            args: read_exprs(source, inner)?,
        }),
        EXPR_BLOCK => read_exprs(source, inner).map(Expr::Block),
        EXPR_LET => Ok(Expr::Let {
            name: read_string(source)?,
            value: Box::new(read_expr(source, inner)?),
        }),
        EXPR_LOCAL => read_string(source).map(Expr::Local),
        EXPR_RETURN => {
            let value = if read_flag(source)? {
                Some(Box::new(read_expr(source, inner)?))
            } else {
                None
            };

            Ok(Expr::Return(value))
        }
        tag => Err(DeserializationError::InvalidValue(format!(
            "unknown expression tag {tag}"
        ))),
    }
}

fn read_exprs<R: ByteReader>(
    source: &mut R,
    depth: usize,
) -> Result<Vec<Expr>, DeserializationError> {
    let len = source.read_usize()?;
    let mut items = Vec::with_capacity(len.min(1024));

    for _ in 0..len {
        items.push(read_expr(source, depth)?);
    }

    Ok(items)
}

impl Serializable for Declaration {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        self.id.write_into(target);
        self.kind.write_into(target);
        write_string(target, &self.name);
        write_string(target, &self.signature);

        write_flag(target, self.parent.is_some());
        if let Some(parent) = self.parent {
            parent.write_into(target);
        }

        write_seq(target, &self.body);
    }
}

impl Deserializable for Declaration {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let id = StableId::read_from(source)?;
        let kind = DeclKind::read_from(source)?;
        let name = read_string(source)?;
        let signature = read_string(source)?;

        let parent = if read_flag(source)? {
            Some(StableId::read_from(source)?)
        } else {
            None
        };

        let body = read_exprs(source, 1)?;

        Ok(Self {
            id,
            kind,
            name,
            signature,
            parent,
            body,
        })
    }
}
