// Link errors
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

use crate::ir::StableId;

/// A [`Result`] with a hard-coded [`LinkError`] error type.
pub type LinkResult<T> = Result<T, LinkError>;

/// Failure to link declarations into a [`LinkGraph`](super::LinkGraph).
///
/// This stores only owned values so that it may be freely propagated
///   after the graph has been discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Two modules provide different declarations with the same
    ///   identifier.
    ///
    /// Since identifiers are derived from identity,
    ///   this means that two modules both claim to define the same
    ///   declaration.
    DuplicateDeclaration {
        id: StableId,
        existing: String,
        given: String,
    },

    /// Declarations were referenced but never provided by any linked
    ///   module.
    ///
    /// Identifiers are sorted in ascending order.
    /// This is either a missing dependency or a reference to a declaration
    ///   whose identity has since changed.
    UnresolvedSymbols(Vec<StableId>),
}

impl Display for LinkError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateDeclaration {
                id,
                existing,
                given,
            } => write!(
                fmt,
                "declaration {id} provided by module `{given}` \
                   is already provided by module `{existing}`"
            ),
            Self::UnresolvedSymbols(ids) => {
                let list: Vec<_> = ids.iter().map(|id| id.to_string()).collect();

                write!(
                    fmt,
                    "{} unresolved symbol(s): {}",
                    ids.len(),
                    list.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for LinkError {}
