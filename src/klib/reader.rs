// klib reader
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

//! Read klibs back into memory.
//!
//! Reading is layered by cost:
//!
//!   - [`KlibReader::read_metadata`] decodes only the header and metadata,
//!       which is all that is needed to build a
//!       [`ModuleDescriptor`];
//!   - [`KlibReader::read_declaration`] decodes a single declaration on
//!       demand; and
//!   - [`KlibReader::deserialize_module`] decodes every declaration of a
//!       module and links it into a [`LinkGraph`].
//!
//! Everything decoded is cached for the remainder of the session,
//!   so repeated reads of the same artifact or declaration are free and
//!   return the same shared value.

use fxhash::FxHashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use winter_utils::{ByteReader, Deserializable, SliceReader};

use super::header::{check_module_name, check_preamble};
use super::{KlibError, KlibResult, ModuleHeader, ModuleMetadata, RawModuleHeader};
use super::IrRef;
use crate::global;
use crate::ir::{Declaration, StableId, SymbolDescriptor};
use crate::link::{LinkGraph, LinkedModule};
use crate::module::ModuleDescriptor;

/// Session-scoped reader of klibs.
#[derive(Debug, Default)]
pub struct KlibReader {
    metadata: FxHashMap<PathBuf, Rc<RawModuleHeader>>,
    declarations: FxHashMap<(PathBuf, StableId), Rc<Declaration>>,
}

impl KlibReader {
    pub fn new() -> Self {
        Default::default()
    }

    /// Read the header and metadata of the klib at `path` without
    ///   decoding any declaration.
    pub fn read_metadata<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> KlibResult<Rc<RawModuleHeader>> {
        let path = path.as_ref();

        if let Some(raw) = self.metadata.get(path) {
            return Ok(raw.clone());
        }

        let header_path = path.join(global::HEADER_FILE);
        let header: ModuleHeader =
            decode_container(&header_path, &read_file(&header_path)?)?;

        check_module_name(&header.name)
            .map_err(|reason| KlibError::corrupt(&header_path, reason))?;

        let meta_path =
            path.join(format!("{}.{}", header.name, global::METADATA_EXT));
        let metadata: ModuleMetadata =
            decode_container(&meta_path, &read_file(&meta_path)?)?;

        if metadata.name != header.name
            || metadata.is_builtins != header.is_builtins
        {
            return Err(KlibError::corrupt(
                &meta_path,
                format!(
                    "metadata describes module `{}`, but header describes `{}`",
                    metadata.name, header.name
                ),
            ));
        }

        tracing::debug!(
            module = %header.name,
            path = %path.display(),
            declarations = header.declaration_count(),
            "read klib metadata"
        );

        let raw = Rc::new(RawModuleHeader { header, metadata });
        self.metadata.insert(path.to_path_buf(), raw.clone());

        Ok(raw)
    }

    /// Read the single declaration `id` from the klib at `path`.
    ///
    /// No other declaration is decoded.
    pub fn read_declaration<P: AsRef<Path>>(
        &mut self,
        path: P,
        id: StableId,
    ) -> KlibResult<Rc<Declaration>> {
        let key = (path.as_ref().to_path_buf(), id);

        if let Some(decl) = self.declarations.get(&key) {
            return Ok(decl.clone());
        }

        let blob_path = key
            .0
            .join(global::DECLARATIONS_DIR)
            .join(id.file_name());

        let bytes = match fs::read(&blob_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(KlibError::corrupt(
                    &blob_path,
                    format!("missing declaration {id}"),
                ))
            }
            Err(e) => return Err(KlibError::io(&blob_path, e)),
        };

        let decl = decode_declaration(&blob_path, &bytes)?;

        if decl.id != id {
            return Err(KlibError::corrupt(
                &blob_path,
                format!("declaration {} stored as {id}", decl.id),
            ));
        }

        if StableId::for_identity(&decl.name, &decl.signature) != id {
            return Err(KlibError::corrupt(
                &blob_path,
                format!("identity of `{}` does not produce {id}", decl.name),
            ));
        }

        tracing::trace!(%id, path = %blob_path.display(), "read declaration");

        let decl = Rc::new(decl);
        self.declarations.insert(key, decl.clone());

        Ok(decl)
    }

    pub fn is_declaration_loaded<P: AsRef<Path>>(&self, path: P, id: StableId) -> bool {
        self.declarations
            .contains_key(&(path.as_ref().to_path_buf(), id))
    }

    /// Number of declarations decoded during this session across all
    ///   klibs.
    pub fn loaded_declaration_count(&self) -> usize {
        self.declarations.len()
    }

    /// Identifiers of every declaration of the klib at `path` in file
    ///   order.
    pub fn declaration_ids<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> KlibResult<Vec<StableId>> {
        Ok(self.read_metadata(path)?.header.declarations().collect())
    }

    /// Read the optional debug index of the klib at `path`.
    ///
    /// Each line of the index is `<id> --- <text>`,
    ///   with `text` escaped as by the writer.
    pub fn read_debug_index<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> KlibResult<Option<Vec<(StableId, String)>>> {
        let index_path = path.as_ref().join(global::DEBUG_INDEX_FILE);

        let bytes = match fs::read(&index_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KlibError::io(&index_path, e)),
        };

        let mut entries = Vec::new();
        let mut start = 0;

        let ends = memchr::memchr_iter(b'\n', &bytes).chain(std::iter::once(bytes.len()));

        for end in ends {
            let line = &bytes[start..end];
            start = end + 1;

            if line.is_empty() {
                continue;
            }

            entries.push(parse_debug_line(&index_path, line)?);
        }

        Ok(Some(entries))
    }

    /// Decode every declaration of the klib at `path` and link it into
    ///   `graph`.
    ///
    /// Each reference is linked either to a resident declaration or to a
    ///   stub
    ///     (see [`LinkGraph::import`]);
    ///   stubs are not reconciled here.
    /// Every artifact in `dependencies` must exist.
    pub fn deserialize_module<P: AsRef<Path>>(
        &mut self,
        graph: &mut LinkGraph,
        descriptor: Rc<ModuleDescriptor>,
        path: P,
        dependencies: &[PathBuf],
        is_builtins: bool,
    ) -> KlibResult<LinkedModule> {
        let path = path.as_ref();

        for dep in dependencies {
            if !dep.join(global::HEADER_FILE).is_file() {
                return Err(KlibError::UnresolvedDependency {
                    module: descriptor.name().to_string(),
                    path: dep.clone(),
                });
            }
        }

        let raw = self.read_metadata(path)?;

        if raw.header.name != descriptor.name() {
            return Err(KlibError::corrupt(
                path,
                format!(
                    "expected module `{}`, found `{}`",
                    descriptor.name(),
                    raw.header.name
                ),
            ));
        }

        if raw.header.is_builtins != is_builtins {
            return Err(KlibError::corrupt(
                path,
                format!("builtins flag of `{}` does not match", raw.header.name),
            ));
        }

        let declarations = raw
            .header
            .declarations()
            .map(|id| self.read_declaration(path, id))
            .collect::<KlibResult<Vec<_>>>()?;

        let descriptors = raw
            .metadata
            .entries
            .iter()
            .map(|entry| {
                let signature = match &entry.ir {
                    IrRef::Inline(signature) => signature.clone(),
                    IrRef::Declaration(id) => declarations
                        .iter()
                        .find(|decl| decl.id == *id)
                        .map(|decl| decl.signature.clone())
                        .ok_or_else(|| KlibError::Dangling {
                            path: path.to_path_buf(),
                            module: raw.header.name.clone(),
                            id: *id,
                        })?,
                };

                Ok(SymbolDescriptor::new(entry.kind, entry.name.clone(), signature))
            })
            .collect::<KlibResult<Vec<_>>>()?;

        let module = LinkedModule {
            name: raw.header.name.as_str().into(),
            is_builtins,
            descriptor,
            files: raw.header.files.clone(),
            entry_points: raw.header.entry_points.clone(),
            declarations,
            descriptors,
        };

        graph.import(&module)?;

        tracing::debug!(
            module = %module.name,
            declarations = module.declarations.len(),
            "deserialized module"
        );

        Ok(module)
    }
}

fn read_file(path: &Path) -> KlibResult<Vec<u8>> {
    fs::read(path).map_err(|e| KlibError::io(path, e))
}

/// Decode a header or metadata file,
///   verifying its preamble and that it is consumed entirely.
fn decode_container<T: Deserializable>(path: &Path, bytes: &[u8]) -> KlibResult<T> {
    let mut source = SliceReader::new(bytes);

    check_preamble(path, &mut source)?;

    let value = T::read_from(&mut source).map_err(|e| KlibError::corrupt(path, e))?;

    if source.has_more_bytes() {
        return Err(KlibError::corrupt(path, "trailing bytes"));
    }

    Ok(value)
}

fn decode_declaration(path: &Path, bytes: &[u8]) -> KlibResult<Declaration> {
    let mut source = SliceReader::new(bytes);

    let version = source.read_u8().map_err(|e| KlibError::corrupt(path, e))?;

    if version != global::DECL_FORMAT_VERSION {
        return Err(KlibError::VersionMismatch {
            path: path.to_path_buf(),
            found: version.into(),
            expected: global::DECL_FORMAT_VERSION.into(),
        });
    }

    let decl =
        Declaration::read_from(&mut source).map_err(|e| KlibError::corrupt(path, e))?;

    if source.has_more_bytes() {
        return Err(KlibError::corrupt(path, "trailing bytes"));
    }

    Ok(decl)
}

fn parse_debug_line(path: &Path, line: &[u8]) -> KlibResult<(StableId, String)> {
    let line = std::str::from_utf8(line).map_err(|e| KlibError::corrupt(path, e))?;

    let (id, text) = line
        .split_once(global::DEBUG_INDEX_SEPARATOR)
        .ok_or_else(|| KlibError::corrupt(path, format!("malformed line `{line}`")))?;

    let id = id
        .parse()
        .map_err(|_| KlibError::corrupt(path, format!("bad identifier `{id}`")))?;

    let text = unescape_debug_text(text)
        .ok_or_else(|| KlibError::corrupt(path, format!("bad escape in `{line}`")))?;

    Ok((id, text))
}

/// Reverse the escaping of debug index text,
///   failing on an unknown or incomplete escape.
fn unescape_debug_text(text: &str) -> Option<String> {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }

        unescaped.push(match chars.next()? {
            '\\' => '\\',
            'n' => '\n',
            'r' => '\r',
            _ => return None,
        });
    }

    Some(unescaped)
}
