// Backend interface
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

use std::convert::Infallible;
use std::fmt::Write;

use crate::link::LinkedProgram;

/// Named configuration of lowering phases.
///
/// The linker does not interpret phases;
///   they are passed through to the [`Backend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseConfig {
    pub name: String,
    pub phases: Vec<String>,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            phases: vec![],
        }
    }
}

/// Lowering and text emission for a fully linked program.
pub trait Backend {
    type Lowered;
    type Error: std::error::Error + 'static;

    fn lower(
        &mut self,
        program: &LinkedProgram,
        config: &PhaseConfig,
    ) -> Result<Self::Lowered, Self::Error>;

    fn emit(&mut self, lowered: &Self::Lowered) -> Result<String, Self::Error>;
}

/// Backend rendering a listing of the linked program.
///
/// The listing names each linked module in link order followed by every
///   declaration reachable from the roots of the program,
///     each after all of the declarations it references.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListingBackend;

impl Backend for ListingBackend {
    type Lowered = Vec<String>;
    type Error = Infallible;

    fn lower(
        &mut self,
        program: &LinkedProgram,
        config: &PhaseConfig,
    ) -> Result<Self::Lowered, Self::Error> {
        let mut lines = vec![format!("; phases: {}", config.name)];

        lines.extend(config.phases.iter().map(|phase| format!(";   {phase}")));

        lines.extend(program.modules.iter().map(|module| {
            if module.is_builtins {
                format!("module {} (builtins)", module.name)
            } else {
                format!("module {}", module.name)
            }
        }));

        for decl in program.ordered_declarations() {
            let owner = program.graph.owner_of(decl.id).unwrap_or("?");
            lines.push(format!("{} {owner}: {decl}", decl.id));
        }

        Ok(lines)
    }

    fn emit(&mut self, lowered: &Self::Lowered) -> Result<String, Self::Error> {
        let mut out = String::new();

        for line in lowered {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{line}");
        }

        Ok(out)
    }
}
