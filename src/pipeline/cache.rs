// Dependency cache interface
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

use fxhash::FxHashMap;
use std::path::PathBuf;

/// Linked dependencies of a module in link order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedDependencies {
    pub modules: Vec<(String, PathBuf)>,
}

/// Key-value memoization of module dependencies,
///   such as that kept by an editor between compilations.
///
/// This is a pass-through layer outside of the klib format;
///   the linker only ever stores into it.
pub trait DependencyCache {
    fn has_cached_dependencies(&self, key: &str) -> bool;
    fn fetch(&self, key: &str) -> Option<CachedDependencies>;
    fn store(&mut self, key: &str, value: CachedDependencies);
}

#[derive(Debug, Default)]
pub struct MemoryDependencyCache {
    entries: FxHashMap<String, CachedDependencies>,
}

impl MemoryDependencyCache {
    pub fn new() -> Self {
        Default::default()
    }
}

impl DependencyCache for MemoryDependencyCache {
    fn has_cached_dependencies(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn fetch(&self, key: &str) -> Option<CachedDependencies> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: CachedDependencies) {
        self.entries.insert(key.to_string(), value);
    }
}
