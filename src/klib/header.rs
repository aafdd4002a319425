// klib header
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

use std::path::{Path, PathBuf};
use winter_utils::{
    ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable,
};

use super::codec::{read_flag, read_seq, read_string, write_flag, write_seq, write_string};
use super::{KlibError, KlibResult};
use crate::global;
use crate::ir::{FileIndex, StableId};

/// Module header:
///   entry points and the declarations of each source file.
///
/// This is everything needed to locate declarations within an artifact
///   without decoding any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    pub name: String,
    pub is_builtins: bool,
    pub entry_points: Vec<StableId>,
    pub files: Vec<FileIndex>,
}

impl ModuleHeader {
    /// Every declaration of the module in file order.
    pub fn declarations(&self) -> impl Iterator<Item = StableId> + '_ {
        self.files
            .iter()
            .flat_map(|file| file.declarations.iter().copied())
    }

    pub fn declaration_count(&self) -> usize {
        self.files.iter().map(|file| file.declarations.len()).sum()
    }
}

impl Serializable for FileIndex {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        write_string(target, &self.path.to_string_lossy());
        write_seq(target, &self.declarations);
    }
}

impl Deserializable for FileIndex {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            path: PathBuf::from(read_string(source)?),
            declarations: read_seq(source)?,
        })
    }
}

/// Body of the header,
///   without its preamble
///   (see [`encode_container`]).
impl Serializable for ModuleHeader {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        write_string(target, &self.name);
        write_flag(target, self.is_builtins);
        write_seq(target, &self.entry_points);
        write_seq(target, &self.files);
    }
}

/// Body of the header following its preamble.
///
/// The preamble is checked separately by [`check_preamble`] so that a
///   version mismatch can be distinguished from corruption.
impl Deserializable for ModuleHeader {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            name: read_string(source)?,
            is_builtins: read_flag(source)?,
            entry_points: read_seq(source)?,
            files: read_seq(source)?,
        })
    }
}

/// Write the magic and format version leading the header and metadata.
pub fn write_preamble<W: ByteWriter>(target: &mut W) {
    target.write_bytes(&global::KLIB_MAGIC);
    target.write_u16(global::KLIB_FORMAT_VERSION);
}

/// Encode a header or metadata file:
///   the preamble followed by `value`.
pub fn encode_container<T: Serializable>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::new();

    write_preamble(&mut bytes);
    value.write_into(&mut bytes);

    bytes
}

/// Verify that `name` can name the metadata file of a klib.
///
/// The module name becomes a file name within the artifact directory,
///   so it must be a single non-empty path component.
pub fn check_module_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("`{name}` is not a valid module name"));
    }

    match name.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        Some(c) => Err(format!("module name `{}` contains {c:?}", name.escape_debug())),
        None => Ok(()),
    }
}

/// Consume and verify the preamble written by [`write_preamble`].
pub fn check_preamble<R: ByteReader>(path: &Path, source: &mut R) -> KlibResult<()> {
    let magic: [u8; 4] = source
        .read_array()
        .map_err(|e| KlibError::corrupt(path, e))?;

    if magic != global::KLIB_MAGIC {
        return Err(KlibError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("bad magic {magic:?}"),
        });
    }

    let version = source.read_u16().map_err(|e| KlibError::corrupt(path, e))?;

    if version != global::KLIB_FORMAT_VERSION {
        return Err(KlibError::VersionMismatch {
            path: path.to_path_buf(),
            found: version,
            expected: global::KLIB_FORMAT_VERSION,
        });
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use winter_utils::SliceReader;

    fn header() -> ModuleHeader {
        ModuleHeader {
            name: "lib".into(),
            is_builtins: false,
            entry_points: vec![StableId::from_raw(2)],
            files: vec![FileIndex {
                path: "lib/a.kt".into(),
                declarations: vec![StableId::from_raw(2), StableId::from_raw(3)],
            }],
        }
    }

    #[test]
    fn body_decodes_its_own_encoding() {
        let sut = header();

        assert_eq!(sut, ModuleHeader::read_from_bytes(&sut.to_bytes()).unwrap());
    }

    #[test]
    fn container_leads_with_preamble() {
        let sut = header();
        let bytes = encode_container(&sut);
        let path = Path::new("irHeader.kji");

        let mut source = SliceReader::new(&bytes);
        check_preamble(path, &mut source).unwrap();

        assert_eq!(sut, ModuleHeader::read_from(&mut source).unwrap());
        assert!(!source.has_more_bytes());
    }

    #[test]
    fn module_name_must_be_one_path_component() {
        assert_eq!(Ok(()), check_module_name("com.example.lib"));

        for bad in ["", ".", "..", "../lib", "a/b", "a\\b", "a\0b"] {
            assert!(check_module_name(bad).is_err(), "accepted `{bad}`");
        }
    }
}
