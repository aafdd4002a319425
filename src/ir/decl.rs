// Declarations and their bodies
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

//! Declarations and the expressions that make up their bodies.

use fxhash::FxHashSet;
use std::fmt::{self, Display};

use super::StableId;

/// Kind of declaration.
///
/// The discriminant of each variant is its tag in the klib format and must
///   never be reassigned;
///     new kinds are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeclKind {
    Function = 0,
    Class = 1,
    Property = 2,
    Field = 3,
    TypeAlias = 4,
    Variable = 5,
    EnumEntry = 6,
}

impl DeclKind {
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        use DeclKind::*;

        Some(match tag {
            0 => Function,
            1 => Class,
            2 => Property,
            3 => Field,
            4 => TypeAlias,
            5 => Variable,
            6 => EnumEntry,
            _ => return None,
        })
    }
}

impl Display for DeclKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Function => write!(fmt, "fun"),
            Self::Class => write!(fmt, "class"),
            Self::Property => write!(fmt, "val"),
            Self::Field => write!(fmt, "field"),
            Self::TypeAlias => write!(fmt, "typealias"),
            Self::Variable => write!(fmt, "var"),
            Self::EnumEntry => write!(fmt, "entry"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Display for Literal {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(fmt, "null"),
            Self::Bool(b) => write!(fmt, "{b}"),
            Self::Int(i) => write!(fmt, "{i}"),
            Self::Str(s) => write!(fmt, "{s:?}"),
        }
    }
}

/// An expression within a declaration body.
///
/// References to other declarations are always by [`StableId`];
///   local bindings are by name and never leave their declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(Literal),
    Ref(StableId),
    Call { callee: StableId, args: Vec<Expr> },
    New { class: StableId, args: Vec<Expr> },
    Block(Vec<Expr>),
    Let { name: String, value: Box<Expr> },
    Local(String),
    Return(Option<Box<Expr>>),
}

impl Expr {
    /// Visit every declaration referenced by this expression,
    ///   depth-first and left-to-right.
    pub fn visit_refs<F: FnMut(StableId)>(&self, f: &mut F) {
        match self {
            Self::Const(_) | Self::Local(_) | Self::Return(None) => (),
            Self::Ref(id) => f(*id),
            Self::Call { callee: id, args } | Self::New { class: id, args } => {
                f(*id);
                args.iter().for_each(|arg| arg.visit_refs(f));
            }
            Self::Block(exprs) => exprs.iter().for_each(|e| e.visit_refs(f)),
            Self::Let { value, .. } => value.visit_refs(f),
            Self::Return(Some(value)) => value.visit_refs(f),
        }
    }

    /// Nesting depth of this expression,
    ///   where an expression with no subexpressions has depth `1`.
    pub fn depth(&self) -> usize {
        let deepest = |exprs: &[Expr]| exprs.iter().map(Expr::depth).max().unwrap_or(0);

        1 + match self {
            Self::Const(_) | Self::Ref(_) | Self::Local(_) | Self::Return(None) => 0,
            Self::Call { args, .. } | Self::New { args, .. } => deepest(args),
            Self::Block(exprs) => deepest(exprs),
            Self::Let { value, .. } | Self::Return(Some(value)) => value.depth(),
        }
    }
}

/// A single linkable declaration.
///
/// The identifier is derived from `name` and `signature` at construction
///   (see [`StableId::for_identity`]);
///     there is no way to construct a [`Declaration`] with an arbitrary
///     identifier other than by decoding one from a klib,
///       which is why the writer confirms identities before persisting
///       them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub id: StableId,
    pub kind: DeclKind,
    pub name: String,
    pub signature: String,
    /// Enclosing declaration,
    ///   such as the class of a member function.
    pub parent: Option<StableId>,
    pub body: Vec<Expr>,
}

impl Declaration {
    pub fn new<N: Into<String>, S: Into<String>>(
        kind: DeclKind,
        name: N,
        signature: S,
    ) -> Self {
        let name = name.into();
        let signature = signature.into();

        Self {
            id: StableId::for_identity(&name, &signature),
            kind,
            name,
            signature,
            parent: None,
            body: Vec::new(),
        }
    }

    pub fn with_parent(self, parent: StableId) -> Self {
        Self {
            parent: Some(parent),
            ..self
        }
    }

    pub fn with_body(self, body: Vec<Expr>) -> Self {
        Self { body, ..self }
    }

    /// Every declaration referenced by this one,
    ///   in order of first appearance and without duplicates.
    ///
    /// The parent,
    ///   if any,
    ///   is always first.
    pub fn references(&self) -> Vec<StableId> {
        let mut seen = FxHashSet::default();
        let mut refs = Vec::new();

        let mut push = |id: StableId| {
            if seen.insert(id) {
                refs.push(id);
            }
        };

        if let Some(parent) = self.parent {
            push(parent);
        }

        self.body.iter().for_each(|expr| expr.visit_refs(&mut push));

        refs
    }

    /// Deepest nesting of any expression of the body,
    ///   or `0` for an empty body.
    pub fn body_depth(&self) -> usize {
        self.body.iter().map(Expr::depth).max().unwrap_or(0)
    }
}

impl Display for Declaration {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} {}{}", self.kind, self.name, self.signature)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_tags_are_fixed() {
        assert_eq!(0, DeclKind::Function.tag());
        assert_eq!(6, DeclKind::EnumEntry.tag());

        for tag in 0..=6 {
            assert_eq!(Some(tag), DeclKind::from_tag(tag).map(DeclKind::tag));
        }

        assert_eq!(None, DeclKind::from_tag(7));
    }

    #[test]
    fn body_depth_is_deepest_expression() {
        let id = StableId::for_identity("m.g", "()");

        let sut = Declaration::new(DeclKind::Function, "m.f", "()").with_body(vec![
            Expr::Ref(id),
            Expr::Let {
                name: "x".into(),
                value: Box::new(Expr::Block(vec![Expr::Call {
                    callee: id,
                    args: vec![Expr::Local("y".into())],
                }])),
            },
        ]);

        assert_eq!(4, sut.body_depth());
        assert_eq!(0, Declaration::new(DeclKind::Class, "m.A", "").body_depth());
    }

    #[test]
    fn references_include_parent_first_and_dedupe() {
        let class = Declaration::new(DeclKind::Class, "lib.Greeter", "");
        let helper = Declaration::new(DeclKind::Function, "lib.helper", "()");

        let sut = Declaration::new(DeclKind::Function, "lib.Greeter.greet", "()")
            .with_parent(class.id)
            .with_body(vec![
                Expr::Call {
                    callee: helper.id,
                    args: vec![Expr::Ref(class.id)],
                },
                Expr::Return(Some(Box::new(Expr::Call {
                    callee: helper.id,
                    args: vec![],
                }))),
            ]);

        assert_eq!(vec![class.id, helper.id], sut.references());
    }

    #[test]
    fn references_descend_into_nested_forms() {
        let a = StableId::from_raw(1);
        let b = StableId::from_raw(2);
        let c = StableId::from_raw(3);

        let sut = Declaration::new(DeclKind::Variable, "x", "").with_body(vec![
            Expr::Block(vec![
                Expr::Let {
                    name: "t".into(),
                    value: Box::new(Expr::New {
                        class: a,
                        args: vec![Expr::Ref(b)],
                    }),
                },
                Expr::Local("t".into()),
            ]),
            Expr::Return(Some(Box::new(Expr::Ref(c)))),
        ]);

        assert_eq!(vec![a, b, c], sut.references());
    }

    #[test]
    fn leaf_declaration_has_no_references() {
        let sut = Declaration::new(DeclKind::Class, "kotlin.Any", "")
            .with_body(vec![Expr::Const(Literal::Null), Expr::Return(None)]);

        assert!(sut.references().is_empty());
    }

    #[test]
    fn display_shows_kind_and_identity() {
        let sut = Declaration::new(DeclKind::Function, "app.main", "()");
        assert_eq!("fun app.main()", sut.to_string());
    }
}
