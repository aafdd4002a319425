// Light filesystem abstractions
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

//! Lightweight filesystem abstraction.
//!
//! This abstraction makes no attempt to be comprehensive---it
//!   includes only what is needed by the linker:
//!
//!   - [`Canonicalizer`] produces the keys under which loaded modules are
//!       memoized,
//!         so that two spellings of the same artifact path share one
//!         in-memory descriptor; and
//!   - [`StagedDir`] provides clear-then-recreate semantics for artifact
//!       directories without ever exposing a half-written artifact.
//!
//!
//! Staged Replacement
//! ==================
//! An artifact is a directory of many files,
//!   so it cannot be replaced with a single `rename` of a file.
//! [`StagedDir`] instead stages all content in a fresh sibling directory
//!   and only then swaps it into place:
//!
//!   1. Any previous artifact is renamed into the staging area;
//!   2. The staged content is renamed to the destination; and
//!   3. Dropping the staging area removes the previous artifact.
//!
//! If step 2 fails,
//!   the previous artifact is moved back.
//! Dropping a [`StagedDir`] without [committing](StagedDir::commit) it
//!   removes all staged content and leaves the destination untouched.

use std::fs;
use std::io::Result;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Name of the staged content within the staging area.
const STAGED_NAME: &str = "staged";

/// Name given to a previous artifact while it is being replaced.
const PREVIOUS_NAME: &str = "previous";

pub trait Canonicalizer {
    fn canonicalize<P: AsRef<Path>>(path: P) -> Result<PathBuf>;
}

pub struct FsCanonicalizer;

impl Canonicalizer for FsCanonicalizer {
    fn canonicalize<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// A directory staged for atomic replacement of `dest`.
///
/// See the [module-level documentation](self) for more information.
#[derive(Debug)]
pub struct StagedDir {
    area: TempDir,
    dest: PathBuf,
}

impl StagedDir {
    /// Prepare to replace the directory at `dest`.
    ///
    /// The staging area is created beside `dest` so that the final swap is
    ///   a `rename` within a single filesystem.
    /// The parent of `dest` is created if it does not yet exist.
    pub fn new<P: AsRef<Path>>(dest: P) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();

        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&parent)?;

        let area = tempfile::Builder::new()
            .prefix(".klib-stage-")
            .tempdir_in(&parent)?;

        fs::create_dir(area.path().join(STAGED_NAME))?;

        Ok(Self { area, dest })
    }

    /// Root of the staged content,
    ///   which will become `dest` once committed.
    pub fn path(&self) -> PathBuf {
        self.area.path().join(STAGED_NAME)
    }

    /// Final destination of the staged content.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Swap the staged content into place.
    pub fn commit(self) -> Result<()> {
        let staged = self.path();

        if fs::symlink_metadata(&self.dest).is_ok() {
            let previous = self.area.path().join(PREVIOUS_NAME);

            fs::rename(&self.dest, &previous)?;

            if let Err(e) = fs::rename(&staged, &self.dest) {
                if let Err(restore) = fs::rename(&previous, &self.dest) {
                    tracing::error!(
                        dest = %self.dest.display(),
                        error = %restore,
                        "failed to restore previous artifact"
                    );
                }

                return Err(e);
            }
        } else {
            fs::rename(&staged, &self.dest)?;
        }

        tracing::trace!(dest = %self.dest.display(), "committed staged artifact");

        // `self.area` is dropped here along with any previous artifact.
        Ok(())
    }
}
