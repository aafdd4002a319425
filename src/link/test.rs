// Tests for declaration linking
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

use super::*;
use crate::ir::{DeclKind, Declaration, Expr, Literal, ModuleIr};
use crate::test::*;
use std::rc::Rc;

type Sut = LinkGraph;

fn link(sut: &mut Sut, module: &LinkedModule) {
    sut.import(module).unwrap();
    sut.reconcile(module).unwrap();
}

#[test]
fn stub_for_is_idempotent() {
    let mut sut = Sut::new();

    let a = sut.stub_for(println_id());
    let b = sut.stub_for(println_id());

    assert_eq!(a, b);
    assert_eq!(1, sut.object_count());
    assert_eq!(1, sut.stub_count());
    assert_eq!(0, sut.declaration_count());
    assert_eq!(Some(&DeclObject::Stub(println_id())), sut.get(a));
}

#[test]
fn stub_for_resident_declaration_returns_it() {
    let mut sut = Sut::new();
    let kotlin = linked(builtins_ir());

    link(&mut sut, &kotlin);

    let stubs = sut.stub_count();
    let objref = sut.stub_for(any_id());

    assert_eq!(sut.lookup(any_id()), Some(objref));
    assert_eq!(stubs, sut.stub_count());
}

#[test]
fn forward_reference_is_stubbed_then_reconciled() {
    let mut sut = Sut::new();
    let kotlin = linked(builtins_ir());

    sut.import(&kotlin).unwrap();

    // `println` returns `Unit`,
    //   which is declared after it.
    assert_eq!(1, sut.stub_count());
    assert_eq!(vec![unit_id()], sut.live_stubs());

    let unit_before = sut.lookup(unit_id()).unwrap();

    assert_eq!(Ok(1), sut.reconcile(&kotlin));
    assert_eq!(Ok(()), sut.assert_fully_reconciled());

    // The same object now holds the declaration,
    //   and the edge from `println` was never rewritten.
    let println = sut.lookup(println_id()).unwrap();
    assert_eq!(Some(unit_before), sut.lookup(unit_id()));
    assert!(sut.has_dep(println, unit_before));
    assert_eq!(Some("kotlin"), sut.owner_of(unit_id()));
}

#[test]
fn reconcile_twice_is_noop() {
    let mut sut = Sut::new();
    let kotlin = linked(builtins_ir());

    link(&mut sut, &kotlin);

    assert_eq!(Ok(0), sut.reconcile(&kotlin));
}

#[test]
fn standard_modules_link_without_live_stubs() {
    let mut sut = Sut::new();

    for ir in [builtins_ir(), lib_ir(), app_ir()] {
        link(&mut sut, &linked(ir));
    }

    assert_eq!(Ok(()), sut.assert_fully_reconciled());
    assert!(sut.live_stubs().is_empty());

    // kotlin.println -> kotlin.Unit, app.main -> app.later
    assert_eq!(2, sut.stub_count());
    assert_eq!(8, sut.declaration_count());
    assert_eq!(sut.object_count(), sut.declaration_count());
}

#[test]
fn missing_dependency_leaves_sorted_live_stubs() {
    let mut sut = Sut::new();

    link(&mut sut, &linked(app_ir()));

    let mut expected = vec![helper_id(), println_id()];
    expected.sort();

    assert_eq!(expected, sut.live_stubs());
    assert_eq!(
        Err(LinkError::UnresolvedSymbols(expected)),
        sut.assert_fully_reconciled()
    );
}

#[test]
fn identical_declaration_from_second_path_is_kept() {
    let mut sut = Sut::new();
    let kotlin = linked(builtins_ir());

    link(&mut sut, &kotlin);

    let before = sut.resolve(any_id()).unwrap().clone();
    link(&mut sut, &kotlin);

    assert!(Rc::ptr_eq(&before, sut.resolve(any_id()).unwrap()));
    assert_eq!(3, sut.declaration_count());
}

#[test]
fn conflicting_declaration_is_rejected_and_graph_restored() {
    let mut sut = Sut::new();
    link(&mut sut, &linked(builtins_ir()));

    // Same identity as `kotlin.println`,
    //   different body.
    let mut impostor = ModuleIr::new("impostor");
    impostor.add_file(
        "impostor.kt",
        vec![
            Declaration::new(DeclKind::Function, "kotlin.println", "(kotlin.Any)")
                .with_body(vec![Expr::Const(Literal::Bool(true))]),
        ],
    );

    let result = sut.import(&linked(impostor));

    assert_eq!(
        Err(LinkError::DuplicateDeclaration {
            id: println_id(),
            existing: "kotlin".into(),
            given: "impostor".into(),
        }),
        result
    );

    assert_eq!(Some("kotlin"), sut.owner_of(println_id()));
    assert_eq!(
        &builtins_ir().declarations().nth(1).unwrap().body,
        &sut.resolve(println_id()).unwrap().body,
    );
}

#[test]
fn declaration_resolve_transitions() {
    let decl = Rc::new(Declaration::new(DeclKind::Class, "m.A", ""));
    let other = Rc::new(Declaration::new(DeclKind::Class, "m.B", ""));

    let resolved = DeclObject::Stub(decl.id)
        .resolve(decl.clone(), "m".into())
        .unwrap();

    assert_eq!(Some(&decl), resolved.decl());
    assert_eq!(Some("m"), resolved.owner());

    // Wrong identifier for the stub.
    let (orig, _) = DeclObject::Stub(decl.id)
        .resolve(other, "m".into())
        .unwrap_err();

    assert_eq!(DeclObject::Stub(decl.id), orig);
}

#[test]
fn program_orders_declarations_after_their_references() {
    let mut graph = Sut::new();
    let modules: Vec<_> = [builtins_ir(), lib_ir(), app_ir()]
        .into_iter()
        .map(linked)
        .collect();

    modules.iter().for_each(|m| link(&mut graph, m));

    let program = LinkedProgram { graph, modules };

    assert_eq!("app", &*program.main().unwrap().name);
    assert_eq!(
        vec![program.graph.lookup(main_id()).unwrap()],
        program.roots()
    );

    let order: Vec<_> = program
        .ordered_declarations()
        .into_iter()
        .map(|decl| decl.id)
        .collect();

    let pos = |id| order.iter().position(|&x| x == id).unwrap();

    // Every declaration is reachable from `app.main`.
    assert_eq!(8, order.len());
    assert_eq!(main_id(), *order.last().unwrap());
    assert!(pos(later_id()) < pos(main_id()));
    assert!(pos(helper_id()) < pos(later_id()));
    assert!(pos(greet_id()) < pos(helper_id()));
    assert!(pos(greeter_id()) < pos(greet_id()));
    assert!(pos(any_id()) < pos(greeter_id()));
    assert!(pos(unit_id()) < pos(println_id()));
}

#[test]
fn program_without_entry_points_roots_every_declaration() {
    let mut graph = Sut::new();
    let kotlin = linked(builtins_ir());

    link(&mut graph, &kotlin);

    let program = LinkedProgram {
        graph,
        modules: vec![kotlin],
    };

    assert_eq!(3, program.roots().len());
    assert_eq!(3, program.ordered_declarations().len());
}
