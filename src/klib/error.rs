// klib errors
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

use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use crate::ir::{IdentityError, StableId};
use crate::link::LinkError;

/// A [`Result`] with a hard-coded [`KlibError`] error type.
pub type KlibResult<T> = Result<T, KlibError>;

/// Error reading or writing a klib.
///
/// Every error concerning a particular artifact carries its path so that
///   the caller may fall back to recompiling that module from source.
#[derive(Debug)]
pub enum KlibError {
    Io {
        path: PathBuf,
        err: std::io::Error,
    },

    /// The artifact is malformed.
    Corrupt { path: PathBuf, reason: String },

    /// A module cannot be represented as a klib at `path`.
    ///
    /// Nothing is staged when this is returned.
    Unwritable { path: PathBuf, reason: String },

    /// The artifact was produced by an incompatible version of its format.
    VersionMismatch {
        path: PathBuf,
        found: u16,
        expected: u16,
    },

    /// The artifact of a dependency could not be found.
    UnresolvedDependency { module: String, path: PathBuf },

    /// An identifier embedded in an artifact resolves neither within the
    ///   artifact nor within any of its declared dependencies.
    Dangling {
        path: PathBuf,
        module: String,
        id: StableId,
    },

    Identity(IdentityError),
    Link(LinkError),
}

impl KlibError {
    pub fn io<P: AsRef<Path>>(path: P, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            err,
        }
    }

    pub fn corrupt<P: AsRef<Path>, R: ToString>(path: P, reason: R) -> Self {
        Self::Corrupt {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Path of the offending artifact,
    ///   if the error concerns one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. }
            | Self::Corrupt { path, .. }
            | Self::Unwritable { path, .. }
            | Self::VersionMismatch { path, .. }
            | Self::UnresolvedDependency { path, .. }
            | Self::Dangling { path, .. } => Some(path),
            Self::Identity(_) | Self::Link(_) => None,
        }
    }
}

impl Display for KlibError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io { path, err } => write!(fmt, "{}: {err}", path.display()),
            Self::Corrupt { path, reason } => {
                write!(fmt, "{}: corrupt klib: {reason}", path.display())
            }
            Self::Unwritable { path, reason } => {
                write!(fmt, "{}: cannot write klib: {reason}", path.display())
            }
            Self::VersionMismatch {
                path,
                found,
                expected,
            } => write!(
                fmt,
                "{}: klib format version {found} is not supported \
                   (expected {expected})",
                path.display()
            ),
            Self::UnresolvedDependency { module, path } => write!(
                fmt,
                "missing klib for dependency `{module}` at {}",
                path.display()
            ),
            Self::Dangling { path, module, id } => write!(
                fmt,
                "{}: identifier {id} of module `{module}` does not resolve \
                   within the klib or its dependencies",
                path.display()
            ),
            Self::Identity(err) => Display::fmt(err, fmt),
            Self::Link(err) => Display::fmt(err, fmt),
        }
    }
}

impl std::error::Error for KlibError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { err, .. } => Some(err),
            Self::Identity(err) => Some(err),
            Self::Link(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IdentityError> for KlibError {
    fn from(err: IdentityError) -> Self {
        Self::Identity(err)
    }
}

impl From<LinkError> for KlibError {
    fn from(err: LinkError) -> Self {
        Self::Link(err)
    }
}
