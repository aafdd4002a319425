// Fixtures shared by unit tests
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

//! Three small modules and the means to compile them into klibs:
//!
//!   - `kotlin`,
//!       the builtins module;
//!   - `lib`,
//!       depending only on builtins; and
//!   - `app`,
//!       depending on `lib` and containing a forward reference.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

use crate::ir::{DeclKind, Declaration, Expr, Literal, ModuleIr, StableId};
use crate::klib::KlibReader;
use crate::link::LinkedModule;
use crate::module::{Discovery, ModuleDescriptor, RecordRef};
use crate::pipeline::{
    LinkOptions, LinkOrchestrator, LinkRequest, ListingBackend, Outcome,
    PreparedModule, TranslationResult,
};

pub fn id(name: &str, signature: &str) -> StableId {
    StableId::for_identity(name, signature)
}

pub fn any_id() -> StableId {
    id("kotlin.Any", "")
}

pub fn unit_id() -> StableId {
    id("kotlin.Unit", "")
}

pub fn println_id() -> StableId {
    id("kotlin.println", "(kotlin.Any)")
}

pub fn greeter_id() -> StableId {
    id("lib.Greeter", "")
}

pub fn greet_id() -> StableId {
    id("lib.Greeter.greet", "()")
}

pub fn helper_id() -> StableId {
    id("lib.helper", "(kotlin.Int)")
}

pub fn main_id() -> StableId {
    id("app.main", "()")
}

pub fn later_id() -> StableId {
    id("app.later", "()")
}

pub fn call(callee: StableId, args: Vec<Expr>) -> Expr {
    Expr::Call { callee, args }
}

pub fn builtins_ir() -> ModuleIr {
    let mut ir = ModuleIr::builtins("kotlin");

    ir.add_file(
        "kotlin/Any.kt",
        vec![Declaration::new(DeclKind::Class, "kotlin.Any", "")],
    );

    // `println` refers to `Unit` before it is declared.
    ir.add_file(
        "kotlin/io.kt",
        vec![
            Declaration::new(DeclKind::Function, "kotlin.println", "(kotlin.Any)")
                .with_body(vec![Expr::Return(Some(Box::new(Expr::Ref(unit_id()))))]),
            Declaration::new(DeclKind::Class, "kotlin.Unit", "")
                .with_parent(any_id()),
        ],
    );

    ir
}

pub fn lib_ir() -> ModuleIr {
    let mut ir = ModuleIr::new("lib");

    ir.add_file(
        "lib/Greeter.kt",
        vec![
            Declaration::new(DeclKind::Class, "lib.Greeter", "")
                .with_parent(any_id()),
            Declaration::new(DeclKind::Function, "lib.Greeter.greet", "()")
                .with_parent(greeter_id())
                .with_body(vec![call(
                    println_id(),
                    vec![Expr::Const(Literal::Str("hello".into()))],
                )]),
        ],
    );

    ir.add_file(
        "lib/helper.kt",
        vec![Declaration::new(DeclKind::Function, "lib.helper", "(kotlin.Int)")
            .with_body(vec![
                Expr::Let {
                    name: "g".into(),
                    value: Box::new(Expr::New {
                        class: greeter_id(),
                        args: vec![],
                    }),
                },
                call(greet_id(), vec![Expr::Local("g".into())]),
            ])],
    );

    ir
}

pub fn app_ir() -> ModuleIr {
    let mut ir = ModuleIr::new("app");

    ir.add_file(
        "app/main.kt",
        vec![
            Declaration::new(DeclKind::Function, "app.main", "()")
                .with_body(vec![call(later_id(), vec![])]),
            Declaration::new(DeclKind::Function, "app.later", "()").with_body(vec![
                call(helper_id(), vec![Expr::Const(Literal::Int(1))]),
                call(println_id(), vec![Expr::Const(Literal::Null)]),
            ]),
        ],
    );

    ir.with_entry_point(main_id())
}

/// Take `ir` for linking with an empty namespace.
pub fn linked(ir: ModuleIr) -> LinkedModule {
    let desc = Rc::new(ModuleDescriptor::from_namespace(
        ir.name.clone(),
        ir.is_builtins,
        None,
        vec![],
        vec![],
    ));

    LinkedModule::from_ir(ir, desc)
}

/// Directory of klibs named `<module>.klib`.
pub struct KlibSet {
    pub dir: TempDir,
}

impl KlibSet {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// `kotlin`, `lib` and `app`,
    ///   all compiled.
    pub fn standard() -> Self {
        let set = Self::new();

        set.build(builtins_ir(), &[]);
        set.build(lib_ir(), &["kotlin"]);
        set.build(app_ir(), &["lib"]);

        set
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.klib"))
    }

    /// Request linking against the already-compiled modules `deps`.
    pub fn request(&self, deps: &[&str]) -> LinkRequest {
        let mut reader = KlibReader::new();
        let search = vec![self.dir.path().to_path_buf()];
        let mut discovery = Discovery::new(&mut reader, &search);

        let roots: Vec<RecordRef> = deps
            .iter()
            .map(|name| discovery.visit(&self.path(name)).unwrap())
            .collect();

        LinkRequest {
            graph: discovery.finish(),
            roots,
        }
    }

    /// Compile `ir` against `deps` into `<name>.klib`.
    pub fn build(&self, ir: ModuleIr, deps: &[&str]) -> PathBuf {
        let dest = self.path(&ir.name);

        let outcome = compile(ir, self.request(deps), &dest).unwrap();
        assert_eq!(
            Outcome::Completed(TranslationResult::ArtifactWritten),
            outcome
        );

        dest
    }
}

pub fn compile(
    ir: ModuleIr,
    request: LinkRequest,
    dest: &Path,
) -> Result<Outcome, crate::pipeline::PipelineError> {
    let options = LinkOptions {
        strict: true,
        debug_index: true,
        ..LinkOptions::klib(dest)
    };

    LinkOrchestrator::new(options).run(
        &mut PreparedModule::new(ir),
        &mut ListingBackend,
        request,
    )
}

/// Ensures that tests will hit debug assertions.
///
/// If this test fails,
///   then optimization settings are inhibiting debug assertions.
/// See the documentation for [`debug_assert!`] for more information.
#[test]
#[should_panic]
fn uses_debug_assertions() {
    debug_assert!(false, "should panic");
}
