// Fixtures shared by integration tests
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

#![allow(dead_code)]

use klink::ir::{DeclKind, Declaration, Expr, Literal, ModuleIr, StableId};
use klink::module::{CompiledModuleRecord, ModuleGraph};
use klink::pipeline::{
    LinkOptions, LinkOrchestrator, LinkRequest, ListingBackend, Outcome,
    PreparedModule, TranslationResult,
};
use std::path::{Path, PathBuf};

pub fn println_id() -> StableId {
    StableId::for_identity("kotlin.println", "(kotlin.Any)")
}

pub fn main_id() -> StableId {
    StableId::for_identity("app.main", "()")
}

pub fn kotlin() -> ModuleIr {
    let mut ir = ModuleIr::builtins("kotlin");

    ir.add_file(
        "kotlin/io.kt",
        vec![
            Declaration::new(DeclKind::Class, "kotlin.Any", ""),
            Declaration::new(DeclKind::Function, "kotlin.println", "(kotlin.Any)"),
        ],
    );

    ir
}

pub fn app() -> ModuleIr {
    let mut ir = ModuleIr::new("app");

    ir.add_file(
        "app/main.kt",
        vec![Declaration::new(DeclKind::Function, "app.main", "()").with_body(
            vec![Expr::Call {
                callee: println_id(),
                args: vec![Expr::Const(Literal::Str("hi".into()))],
            }],
        )],
    );

    ir.with_entry_point(main_id())
}

fn write(ir: ModuleIr, request: LinkRequest, dest: &Path) {
    let options = LinkOptions {
        strict: true,
        ..LinkOptions::klib(dest)
    };

    let outcome = LinkOrchestrator::new(options)
        .run(&mut PreparedModule::new(ir), &mut ListingBackend, request)
        .unwrap();

    assert_eq!(Outcome::Completed(TranslationResult::ArtifactWritten), outcome);
}

/// Write `kotlin.klib` and `app.klib` into `dir`.
pub fn build(dir: &Path) -> (PathBuf, PathBuf) {
    let kotlin_path = dir.join("kotlin.klib");
    let app_path = dir.join("app.klib");

    write(kotlin(), LinkRequest::default(), &kotlin_path);

    let mut graph = ModuleGraph::new();
    let builtins =
        graph.add_record(CompiledModuleRecord::builtins("kotlin", &kotlin_path));

    write(
        app(),
        LinkRequest {
            graph,
            roots: vec![builtins],
        },
        &app_path,
    );

    (kotlin_path, app_path)
}
