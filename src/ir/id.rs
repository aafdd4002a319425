// Stable declaration identifiers
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

//! Stable identifiers.
//!
//! A [`StableId`] is derived solely from the _identity_ of a
//!   declaration---its
//!     fully qualified name and its signature.
//! The same declaration therefore receives the same identifier in every
//!   compilation session,
//!     which is what allows one to serve both as the filename of a
//!     declaration within a klib and as the cross-reference token within
//!     serialized IR.
//!
//! Identity Policy
//! ---------------
//! Changing either the name _or_ the signature of a declaration yields a
//!   new identity and therefore a new identifier;
//!     there is no notion of a declaration "surviving" a signature
//!     change.
//! Any klib referencing the old identifier must be rebuilt,
//!   and a stale reference is reported as an unresolved symbol at link
//!   time rather than silently binding to the changed declaration.
//!
//! Identifiers are the leading 64 bits of a SHA-256 digest.
//! Collisions are not assumed away:
//!   [`IdentityTable`] records every identity it confirms and fails if
//!   two distinct identities produce the same identifier.

use fxhash::FxHashMap;
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::global;

/// Deterministic, session-independent declaration identifier.
///
/// See the [module-level documentation](self) for more information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableId(u64);

assert_eq_size!(StableId, u64);

impl StableId {
    /// Derive the identifier for the declaration `name` with `signature`.
    pub fn for_identity(name: &str, signature: &str) -> Self {
        let mut hasher = Sha256::new();

        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(signature.as_bytes());

        let digest = hasher.finalize();
        let mut lead = [0u8; 8];
        lead.copy_from_slice(&digest[..8]);

        Self(u64::from_be_bytes(lead))
    }

    /// Reconstitute an identifier previously produced by
    ///   [`StableId::as_u64`].
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Name of the blob holding this declaration within a klib.
    pub fn file_name(self) -> String {
        format!("{}.{}", self, global::DECLARATION_EXT)
    }

    /// Parse a blob name produced by [`StableId::file_name`].
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.strip_suffix(global::DECLARATION_EXT)
            .and_then(|stem| stem.strip_suffix('.'))
            .and_then(|stem| stem.parse().ok())
    }
}

impl Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Parse the fixed-width form produced by [`Display`]:
///   exactly sixteen hexadecimal digits.
impl FromStr for StableId {
    type Err = ParseStableIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseStableIdError(s.to_string());

        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }

        u64::from_str_radix(s, 16).map(Self).map_err(|_| err())
    }
}

/// A string is not the fixed-width form of a [`StableId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStableIdError(String);

impl Display for ParseStableIdError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "`{}` is not a 16-digit hexadecimal identifier", self.0)
    }
}

impl std::error::Error for ParseStableIdError {}

/// Identities confirmed during a session.
///
/// This is the first step of writing an artifact:
///   every declaration owned by the module must carry exactly the
///   identifier its identity produces,
///     and no two identities may share an identifier.
#[derive(Debug, Default)]
pub struct IdentityTable {
    seen: FxHashMap<StableId, (String, String)>,
}

impl IdentityTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Confirm that `id` is the identifier of `name` with `signature`,
    ///   recording the identity for later collision checks.
    ///
    /// Confirming the same identity more than once is permitted.
    pub fn confirm(
        &mut self,
        id: StableId,
        name: &str,
        signature: &str,
    ) -> Result<(), IdentityError> {
        let expected = StableId::for_identity(name, signature);

        if id != expected {
            return Err(IdentityError::Mismatch {
                name: name.into(),
                found: id,
                expected,
            });
        }

        match self.seen.get(&id) {
            Some((prev_name, prev_sig))
                if prev_name != name || prev_sig != signature =>
            {
                Err(IdentityError::Collision {
                    id,
                    first: format!("{prev_name}{prev_sig}"),
                    second: format!("{name}{signature}"),
                })
            }
            Some(_) => Ok(()),
            None => {
                self.seen.insert(id, (name.into(), signature.into()));
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// A declaration identity could not be confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// A declaration carries an identifier other than the one derived from
    ///   its identity.
    ///
    /// This indicates either IR that was altered after identifiers were
    ///   assigned or a bug in the frontend.
    Mismatch {
        name: String,
        found: StableId,
        expected: StableId,
    },

    /// Two distinct identities produced the same identifier.
    Collision {
        id: StableId,
        first: String,
        second: String,
    },
}

impl Display for IdentityError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Mismatch {
                name,
                found,
                expected,
            } => write!(
                fmt,
                "declaration `{name}` carries identifier {found}, \
                   but its identity produces {expected}"
            ),
            Self::Collision { id, first, second } => write!(
                fmt,
                "identifier {id} collides: `{first}` and `{second}`"
            ),
        }
    }
}

impl std::error::Error for IdentityError {}
