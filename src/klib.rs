// klib artifact format
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

//! The klib artifact format.
//!
//! A klib is a directory capturing the IR and metadata of one compiled
//!   module for reuse by later compilations:
//!
//! ```text
//! <module>.klib/
//!   irHeader.kji            header: entry points, per-file declarations
//!   irDeclarations/
//!     <016x id>.kjd         one blob per declaration
//!   <module>.kjsm           symbol metadata
//!   debugIndex.knd          optional; "<id> --- <text>" per line
//! ```
//!
//! These names are fixed
//!   (see [`crate::global`])
//!   and form a contract that every consumer must honor.
//!
//! Header and metadata begin with the magic `KLIB` followed by a `u16`
//!   format version;
//!     each declaration blob begins with a `u8` version of the IR
//!     encoding.
//! A reader rejects any version other than its own with
//!   [`KlibError::VersionMismatch`].
//! The encoding of values is described in [`codec`].
//!
//! Identifiers
//! ===========
//! Declarations are addressed by [`StableId`](crate::ir::StableId),
//!   both as the name of their blob and as the token for references
//!   embedded in other blobs.
//! Every identifier embedded in a klib must resolve within the klib
//!   itself or within one of the dependencies named in its metadata;
//!     [`KlibWriter`] in strict mode verifies this before the klib is made
//!     visible.

pub mod codec;
mod error;
mod header;
mod metadata;
mod reader;
mod writer;

pub use error::{KlibError, KlibResult};
pub use header::ModuleHeader;
pub use metadata::{IrRef, MetadataEntry, ModuleMetadata, RawModuleHeader};
pub use reader::KlibReader;
pub use writer::{encode_declaration, KlibWriter, ModuleArtifact};
