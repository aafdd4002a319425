// Global constants across the entirety of klink
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

//! System-wide static configuration.
//!
//! This module provides a system-wide configuration.
//! Subsystems should reference these values rather than defining their own
//!   and risk incompatibilities or maintenance issues as requirements
//!   change.
//! This is especially true of the artifact layout:
//!   every name below is part of the on-disk contract that consumers of a
//!   klib must honor bit-for-bit.
//!
//! By convention,
//!   import this entire module rather than individual members and reference
//!   them as `global::foo` to emphasize their nature and risk.

/// Leading bytes of every klib header and metadata file.
pub const KLIB_MAGIC: [u8; 4] = *b"KLIB";

/// Version of the header and metadata encoding.
///
/// A reader refuses any artifact whose version differs from its own;
///   there is no attempt at cross-version compatibility.
pub const KLIB_FORMAT_VERSION: u16 = 1;

/// Version byte leading each declaration blob.
///
/// This is versioned independently of [`KLIB_FORMAT_VERSION`] since the
///   IR encoding of declaration bodies changes more often than the
///   surrounding container.
pub const DECL_FORMAT_VERSION: u8 = 1;

/// Deepest expression nesting that a declaration blob may encode.
///
/// Top-level expressions of a declaration body are at depth `1`.
/// Decoding a blob that exceeds this depth fails rather than recursing
///   without bound on untrusted input,
///     and the writer refuses to produce such a blob.
pub const MAX_EXPR_DEPTH: usize = 512;

/// Name of the header file at the root of an artifact directory.
pub const HEADER_FILE: &str = "irHeader.kji";

/// Name of the subdirectory holding one blob per declaration.
pub const DECLARATIONS_DIR: &str = "irDeclarations";

/// Extension of each declaration blob,
///   whose stem is the hex-encoded [`StableId`](crate::ir::StableId).
pub const DECLARATION_EXT: &str = "kjd";

/// Extension of the metadata file,
///   whose stem is the module name.
pub const METADATA_EXT: &str = "kjsm";

/// Name of the optional debug index.
pub const DEBUG_INDEX_FILE: &str = "debugIndex.knd";

/// Separator between identifier and text on each debug index line.
pub const DEBUG_INDEX_SEPARATOR: &str = " --- ";

/// Extension of an artifact directory when located by module name on a
///   library search path.
pub const KLIB_EXT: &str = "klib";

/// A size capable of representing every declaration and stub of every
///   module linked into a single program.
pub type ProgDeclSize = u32;

/// A size capable of representing every compiled module record known to a
///   single compilation session.
pub type ModuleRecordSize = u32;
