// klib metadata
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

//! Symbol metadata of a module.
//!
//! Metadata is what a consumer needs to build a module namespace without
//!   decoding IR.
//! An entry describing a declaration that exists in the IR refers to that
//!   declaration by [`StableId`] rather than repeating it,
//!     which is what lets a metadata-only consumer address IR-level
//!     declarations.

use winter_utils::{
    ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable,
};

use super::codec::{
    read_flag, read_seq, read_string, read_strings, write_flag, write_seq,
    write_string, write_strings,
};
use super::header::ModuleHeader;
use crate::ir::{DeclKind, StableId, SymbolDescriptor};

const IR_REF_DECLARATION: u8 = 0;
const IR_REF_INLINE: u8 = 1;

/// How a metadata entry is tied to the IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrRef {
    /// The entry describes the IR declaration with this identifier.
    Declaration(StableId),

    /// The entry has no IR declaration in this module;
    ///   its signature is stored inline.
    Inline(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub name: String,
    pub kind: DeclKind,
    pub ir: IrRef,
}

impl MetadataEntry {
    /// Entry for `descriptor`,
    ///   referring to its declaration if `declared`.
    pub fn for_descriptor(descriptor: &SymbolDescriptor, declared: bool) -> Self {
        let ir = if declared {
            IrRef::Declaration(descriptor.id())
        } else {
            IrRef::Inline(descriptor.signature.clone())
        };

        Self {
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            ir,
        }
    }

    pub fn declaration(&self) -> Option<StableId> {
        match self.ir {
            IrRef::Declaration(id) => Some(id),
            IrRef::Inline(_) => None,
        }
    }
}

/// Metadata file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub name: String,
    pub is_builtins: bool,

    /// Names of the modules this module was linked against,
    ///   in link order.
    pub dependencies: Vec<String>,
    pub entries: Vec<MetadataEntry>,
}

impl ModuleMetadata {
    /// Identifiers referenced by entries.
    pub fn declarations(&self) -> impl Iterator<Item = StableId> + '_ {
        self.entries.iter().filter_map(MetadataEntry::declaration)
    }
}

/// Header and metadata of an artifact,
///   as read without touching any declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModuleHeader {
    pub header: ModuleHeader,
    pub metadata: ModuleMetadata,
}

impl Serializable for MetadataEntry {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        write_string(target, &self.name);
        self.kind.write_into(target);

        match &self.ir {
            IrRef::Declaration(id) => {
                target.write_u8(IR_REF_DECLARATION);
                id.write_into(target);
            }
            IrRef::Inline(signature) => {
                target.write_u8(IR_REF_INLINE);
                write_string(target, signature);
            }
        }
    }
}

impl Deserializable for MetadataEntry {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let name = read_string(source)?;
        let kind = DeclKind::read_from(source)?;

        let ir = match source.read_u8()? {
            IR_REF_DECLARATION => IrRef::Declaration(StableId::read_from(source)?),
            IR_REF_INLINE => IrRef::Inline(read_string(source)?),
            tag => {
                return Err(DeserializationError::InvalidValue(format!(
                    "unknown IR reference tag {tag}"
                )))
            }
        };

        Ok(Self { name, kind, ir })
    }
}

/// Body of the metadata,
///   without its preamble
///   (see [`encode_container`](super::header::encode_container)).
impl Serializable for ModuleMetadata {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        write_string(target, &self.name);
        write_flag(target, self.is_builtins);
        write_strings(target, &self.dependencies);
        write_seq(target, &self.entries);
    }
}

/// Body of the metadata following its preamble
///   (see [`check_preamble`](super::header::check_preamble)).
impl Deserializable for ModuleMetadata {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            name: read_string(source)?,
            is_builtins: read_flag(source)?,
            dependencies: read_strings(source)?,
            entries: read_seq(source)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descriptor_with_declaration_is_referenced_by_id() {
        let desc = SymbolDescriptor::new(DeclKind::Function, "app.main", "()");

        let sut = MetadataEntry::for_descriptor(&desc, true);
        assert_eq!(IrRef::Declaration(desc.id()), sut.ir);
        assert_eq!(Some(desc.id()), sut.declaration());
    }

    #[test]
    fn body_decodes_its_own_encoding() {
        let desc = SymbolDescriptor::new(DeclKind::Function, "app.main", "()");

        let sut = ModuleMetadata {
            name: "app".into(),
            is_builtins: false,
            dependencies: vec!["kotlin".into(), "lib".into()],
            entries: vec![MetadataEntry::for_descriptor(&desc, true)],
        };

        assert_eq!(sut, ModuleMetadata::read_from_bytes(&sut.to_bytes()).unwrap());
    }

    #[test]
    fn descriptor_without_declaration_is_inline() {
        let desc = SymbolDescriptor::new(DeclKind::TypeAlias, "app.Name", "=String");

        let sut = MetadataEntry::for_descriptor(&desc, false);
        assert_eq!(IrRef::Inline("=String".into()), sut.ir);
        assert_eq!(None, sut.declaration());
    }
}
