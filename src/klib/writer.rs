// klib writer
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

//! Persist a linked module as a klib.

use fxhash::FxHashSet;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use winter_utils::{ByteWriter, Serializable};

use super::header::{check_module_name, encode_container};
use super::{
    KlibError, KlibReader, KlibResult, MetadataEntry, ModuleHeader,
    ModuleMetadata,
};
use crate::fs::StagedDir;
use crate::global;
use crate::ir::{Declaration, IdentityTable, StableId};
use crate::link::{LinkGraph, LinkedModule};

/// An artifact as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleArtifact {
    pub path: PathBuf,
    pub header: ModuleHeader,

    /// Encoded blob of each declaration,
    ///   including its version byte.
    pub declarations: BTreeMap<StableId, Vec<u8>>,
    pub metadata: ModuleMetadata,
    pub debug_index: Option<Vec<(StableId, String)>>,
}

/// Writes klibs.
///
/// Writing either fully replaces the destination or leaves it untouched
///   (see [`StagedDir`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct KlibWriter {
    /// Verify after staging that every identifier embedded in the artifact
    ///   resolves within it or within a named dependency.
    pub strict: bool,

    /// Emit a debug index alongside the declarations.
    pub debug_index: bool,
}

impl KlibWriter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn strict(self, strict: bool) -> Self {
        Self { strict, ..self }
    }

    pub fn with_debug_index(self, debug_index: bool) -> Self {
        Self {
            debug_index,
            ..self
        }
    }

    /// Write `module` to the klib directory `dest`.
    ///
    /// `graph` is the graph into which `module` and its dependencies were
    ///   linked;
    ///     it is consulted only to determine the owner of identifiers that
    ///     the module does not itself declare.
    /// `dependency_names` are recorded in the metadata in the order given.
    pub fn write<P: AsRef<Path>>(
        &self,
        graph: &LinkGraph,
        module: &LinkedModule,
        dependency_names: &[String],
        dest: P,
    ) -> KlibResult<ModuleArtifact> {
        let dest = dest.as_ref();

        check_module_name(&module.name).map_err(|reason| KlibError::Unwritable {
            path: dest.to_path_buf(),
            reason,
        })?;

        let mut identities = IdentityTable::new();
        for decl in module.declarations.iter() {
            identities.confirm(decl.id, &decl.name, &decl.signature)?;

            if decl.body_depth() > global::MAX_EXPR_DEPTH {
                return Err(KlibError::Unwritable {
                    path: dest.to_path_buf(),
                    reason: format!(
                        "body of `{}` nests deeper than {}",
                        decl.name,
                        global::MAX_EXPR_DEPTH
                    ),
                });
            }
        }

        let header = ModuleHeader {
            name: module.name.to_string(),
            is_builtins: module.is_builtins,
            entry_points: module.entry_points.clone(),
            files: module.files.clone(),
        };

        let declarations: BTreeMap<_, _> = module
            .declarations
            .iter()
            .map(|decl| (decl.id, encode_declaration(decl)))
            .collect();

        let owned: FxHashSet<_> = module.declaration_ids().collect();

        let metadata = ModuleMetadata {
            name: module.name.to_string(),
            is_builtins: module.is_builtins,
            dependencies: dependency_names.to_vec(),
            entries: module
                .descriptors
                .iter()
                .map(|desc| MetadataEntry::for_descriptor(desc, owned.contains(&desc.id())))
                .collect(),
        };

        let debug_index = self.debug_index.then(|| {
            module
                .declarations
                .iter()
                .map(|decl| (decl.id, decl.to_string()))
                .collect::<Vec<_>>()
        });

        let stage = StagedDir::new(dest).map_err(|e| KlibError::io(dest, e))?;
        let root = stage.path();

        tracing::debug!(
            module = %module.name,
            declarations = declarations.len(),
            staging = %root.display(),
            "staging klib"
        );

        write_file(&root.join(global::HEADER_FILE), &encode_container(&header))?;

        let decl_dir = root.join(global::DECLARATIONS_DIR);
        fs::create_dir(&decl_dir).map_err(|e| KlibError::io(&decl_dir, e))?;

        for (id, blob) in declarations.iter() {
            write_file(&decl_dir.join(id.file_name()), blob)?;
        }

        write_file(
            &root.join(format!("{}.{}", metadata.name, global::METADATA_EXT)),
            &encode_container(&metadata),
        )?;

        if let Some(entries) = &debug_index {
            let text: String = entries
                .iter()
                .map(|(id, text)| {
                    format!(
                        "{id}{}{}\n",
                        global::DEBUG_INDEX_SEPARATOR,
                        escape_debug_text(text)
                    )
                })
                .collect();

            write_file(&root.join(global::DEBUG_INDEX_FILE), text.as_bytes())?;
        }

        if self.strict {
            check_staged(graph, &module.name, &root, dest, dependency_names)?;
        }

        stage.commit().map_err(|e| KlibError::io(dest, e))?;

        tracing::info!(module = %module.name, dest = %dest.display(), "wrote klib");

        Ok(ModuleArtifact {
            path: dest.to_path_buf(),
            header,
            declarations,
            metadata,
            debug_index,
        })
    }
}

/// Encode a declaration blob,
///   led by its format version.
pub fn encode_declaration(decl: &Declaration) -> Vec<u8> {
    let mut bytes = Vec::new();

    bytes.write_u8(global::DECL_FORMAT_VERSION);
    decl.write_into(&mut bytes);

    bytes
}

/// Escape `text` so that it occupies a single debug index line.
///
/// Backslash,
///   line feed and carriage return are written as `\\`,
///   `\n` and `\r` respectively.
pub(super) fn escape_debug_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }

    escaped
}

fn write_file(path: &Path, bytes: &[u8]) -> KlibResult<()> {
    fs::write(path, bytes).map_err(|e| KlibError::io(path, e))
}

/// Read back the staged artifact at `root` and verify that every
///   identifier it embeds resolves within it or within a module named by
///   `dependency_names`.
///
/// Errors are reported against `dest`,
///   since the staging area does not outlive the failure.
fn check_staged(
    graph: &LinkGraph,
    module: &str,
    root: &Path,
    dest: &Path,
    dependency_names: &[String],
) -> KlibResult<()> {
    let mut reader = KlibReader::new();
    let raw = reader.read_metadata(root)?;

    let local: FxHashSet<_> = raw.header.declarations().collect();

    let resolves = |id: StableId| {
        local.contains(&id)
            || graph
                .owner_of(id)
                .map_or(false, |owner| dependency_names.iter().any(|dep| dep == owner))
    };

    let mut embedded: Vec<StableId> = raw
        .header
        .entry_points
        .iter()
        .copied()
        .chain(raw.metadata.declarations())
        .collect();

    for id in local.iter() {
        embedded.extend(reader.read_declaration(root, *id)?.references());
    }

    let mut dangling: Vec<_> = embedded.into_iter().filter(|&id| !resolves(id)).collect();
    dangling.sort();

    match dangling.first() {
        Some(&id) => Err(KlibError::Dangling {
            path: dest.to_path_buf(),
            module: module.to_string(),
            id,
        }),
        None => {
            tracing::trace!(%module, "staged klib is consistent");
            Ok(())
        }
    }
}
