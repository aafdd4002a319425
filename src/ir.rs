// Intermediate representation of linkable declarations
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

//! Intermediate representation (IR) of a module's declarations.
//!
//! This is the form of a module after translation by the frontend and
//!   before lowering by a backend.
//! The linker does not interpret the IR beyond what it needs to link:
//!   each [`Declaration`] carries a [`StableId`],
//!     and every reference from one declaration to another is expressed as
//!     the [`StableId`] of its target rather than as a pointer.
//! This allows a reference to be written to a klib and read back in a later
//!   compilation session,
//!     and it allows a reference to be recorded before its target has
//!     been loaded
//!       (see [`crate::link`]).
//!
//! Declaration kinds and expression forms are closed enumerations;
//!   each variant has an explicit binary tag in the klib format
//!   (see [`crate::klib`]).
//!
//! ```
//! use klink::ir::{DeclKind, Declaration, Expr, Literal, ModuleIr, StableId};
//!
//! let println = Declaration::new(DeclKind::Function, "kotlin.println", "(Any)");
//! let main = Declaration::new(DeclKind::Function, "app.main", "()")
//!     .with_body(vec![Expr::Call {
//!         callee: println.id,
//!         args: vec![Expr::Const(Literal::Str("hi".into()))],
//!     }]);
//!
//! // Identifiers are derived from identity and nothing else.
//! assert_eq!(StableId::for_identity("app.main", "()"), main.id);
//! assert_eq!(vec![println.id], main.references());
//!
//! let mut ir = ModuleIr::new("app");
//! ir.add_file("main.kt", vec![main]);
//! assert_eq!(1, ir.declarations().count());
//! ```

mod decl;
mod id;
mod module;

pub use decl::{DeclKind, Declaration, Expr, Literal};
pub use id::{IdentityError, IdentityTable, ParseStableIdError, StableId};
pub use module::{FileIndex, IrFile, ModuleIr, SymbolDescriptor};
