// Tests for module records and descriptors
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
use crate::klib::{IrRef, KlibError, KlibReader};
use crate::test::*;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

fn names(graph: &ModuleGraph, records: &[RecordRef]) -> Vec<String> {
    records
        .iter()
        .map(|&r| graph.get(r).unwrap().name.clone())
        .collect()
}

mod linearize {
    use super::*;

    #[test]
    fn builtins_first_then_dependencies_before_dependents() {
        let mut sut = ModuleGraph::new();

        let app = sut.add_record(CompiledModuleRecord::new("app", "app.klib"));
        let lib = sut.add_record(CompiledModuleRecord::new("lib", "lib.klib"));
        let util = sut.add_record(CompiledModuleRecord::new("util", "util.klib"));
        let kotlin =
            sut.add_record(CompiledModuleRecord::builtins("kotlin", "kotlin.klib"));

        sut.add_dependency(app, lib);
        sut.add_dependency(app, util);
        sut.add_dependency(lib, util);
        sut.add_dependency(lib, kotlin);
        sut.add_dependency(util, kotlin);

        let order = sut.linearize(&[app]).unwrap();

        assert_eq!(vec!["kotlin", "util", "lib", "app"], names(&sut, &order));
    }

    #[test]
    fn ties_broken_by_input_order() {
        let mut sut = ModuleGraph::new();

        let kotlin =
            sut.add_record(CompiledModuleRecord::builtins("kotlin", "kotlin.klib"));
        let a = sut.add_record(CompiledModuleRecord::new("a", "a.klib"));
        let b = sut.add_record(CompiledModuleRecord::new("b", "b.klib"));

        sut.add_dependency(a, kotlin);
        sut.add_dependency(b, kotlin);

        assert_eq!(
            vec!["kotlin", "b", "a"],
            names(&sut, &sut.linearize(&[b, a]).unwrap())
        );
        assert_eq!(
            vec!["kotlin", "a", "b"],
            names(&sut, &sut.linearize(&[a, b]).unwrap())
        );
    }

    #[test]
    fn shared_dependency_appears_once() {
        let mut sut = ModuleGraph::new();

        let kotlin =
            sut.add_record(CompiledModuleRecord::builtins("kotlin", "kotlin.klib"));
        let base = sut.add_record(CompiledModuleRecord::new("base", "base.klib"));
        let left = sut.add_record(CompiledModuleRecord::new("left", "left.klib"));
        let right = sut.add_record(CompiledModuleRecord::new("right", "right.klib"));

        sut.add_dependency(base, kotlin);
        sut.add_dependency(left, base);
        sut.add_dependency(right, base);

        // Duplicate edge.
        sut.add_dependency(right, base);

        assert_eq!(
            vec!["kotlin", "base", "left", "right"],
            names(&sut, &sut.linearize(&[left, right]).unwrap())
        );
    }

    #[test]
    fn no_builtins_is_error() {
        let mut sut = ModuleGraph::new();
        let lib = sut.add_record(CompiledModuleRecord::new("lib", "lib.klib"));

        assert_eq!(Err(ModuleGraphError::NoBuiltins), sut.linearize(&[lib]));
        assert_eq!(Err(ModuleGraphError::NoBuiltins), sut.linearize(&[]));
    }

    #[test]
    fn multiple_builtins_is_error() {
        let mut sut = ModuleGraph::new();

        let app = sut.add_record(CompiledModuleRecord::new("app", "app.klib"));
        let k1 = sut.add_record(CompiledModuleRecord::builtins("k1", "k1.klib"));
        let k2 = sut.add_record(CompiledModuleRecord::builtins("k2", "k2.klib"));

        sut.add_dependency(app, k1);
        sut.add_dependency(app, k2);

        assert_eq!(
            Err(ModuleGraphError::MultipleBuiltins(vec![
                "k1".into(),
                "k2".into()
            ])),
            sut.linearize(&[app])
        );
    }

    #[test]
    fn builtins_with_dependencies_is_error() {
        let mut sut = ModuleGraph::new();

        let kotlin =
            sut.add_record(CompiledModuleRecord::builtins("kotlin", "kotlin.klib"));
        let lib = sut.add_record(CompiledModuleRecord::new("lib", "lib.klib"));

        sut.add_dependency(kotlin, lib);

        assert_eq!(
            Err(ModuleGraphError::BuiltinsHasDependencies("kotlin".into())),
            sut.linearize(&[kotlin])
        );
    }

    #[test]
    fn cycle_is_error() {
        let mut sut = ModuleGraph::new();

        let kotlin =
            sut.add_record(CompiledModuleRecord::builtins("kotlin", "kotlin.klib"));
        let a = sut.add_record(CompiledModuleRecord::new("a", "a.klib"));
        let b = sut.add_record(CompiledModuleRecord::new("b", "b.klib"));

        sut.add_dependency(a, b);
        sut.add_dependency(a, kotlin);
        sut.add_dependency(b, a);
        sut.add_dependency(b, kotlin);

        let err = sut.linearize(&[a]).unwrap_err();

        assert_eq!(
            ModuleGraphError::Cycle(vec!["a".into(), "b".into(), "a".into()]),
            err
        );
        assert_eq!("cyclic module dependency: a -> b -> a", err.to_string());
    }

    #[test]
    fn dependencies_in_declaration_order() {
        let mut sut = ModuleGraph::new();

        let app = sut.add_record(CompiledModuleRecord::new("app", "app.klib"));
        let z = sut.add_record(CompiledModuleRecord::new("z", "z.klib"));
        let a = sut.add_record(CompiledModuleRecord::new("a", "a.klib"));

        sut.add_dependency(app, z);
        sut.add_dependency(app, a);

        assert_eq!(vec![z, a], sut.dependencies(app));
        assert_eq!(Some(a), sut.find("a"));
        assert_eq!(None, sut.find("missing"));
        assert_eq!(3, sut.len());
    }
}

mod descriptor {
    use super::*;

    #[test]
    fn resolve_is_memoized() {
        let set = KlibSet::standard();
        let request = set.request(&["app"]);
        let app = request.roots[0];

        let mut reader = KlibReader::new();
        let mut sut: DescriptorCache = DescriptorCache::new();

        let first = sut.resolve(&mut reader, &request.graph, app).unwrap();
        let second = sut.resolve(&mut reader, &request.graph, app).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(3, sut.len());
    }

    #[test]
    fn builtins_provider_is_shared() {
        let set = KlibSet::standard();
        let request = set.request(&["app"]);
        let app = request.roots[0];

        let mut reader = KlibReader::new();
        let mut sut: DescriptorCache = DescriptorCache::new();

        let desc = sut.resolve(&mut reader, &request.graph, app).unwrap();
        let builtins = sut.builtins().unwrap();

        assert_eq!("kotlin", builtins.name());
        assert!(builtins.is_builtins());
        assert!(builtins.builtins().is_none());
        assert!(Rc::ptr_eq(builtins, desc.builtins().unwrap()));

        // Builtins is reached through the provider only.
        assert_eq!(
            vec!["lib"],
            desc.dependencies()
                .iter()
                .map(|d| d.name())
                .collect::<Vec<_>>()
        );
        assert!(Rc::ptr_eq(
            builtins,
            desc.dependencies()[0].builtins().unwrap()
        ));
    }

    #[test]
    fn lookup_walks_self_dependencies_then_builtins() {
        let set = KlibSet::standard();
        let request = set.request(&["app"]);
        let app = request.roots[0];

        let mut reader = KlibReader::new();
        let mut sut: DescriptorCache = DescriptorCache::new();
        let desc = sut.resolve(&mut reader, &request.graph, app).unwrap();

        assert_eq!(Some(set.path("app").as_path()), desc.artifact_path());
        assert_eq!(2, desc.symbol_count());

        let local = desc.lookup("app.main").unwrap();
        assert_eq!(IrRef::Declaration(main_id()), local.ir);
        assert!(desc.local("app.main").is_some());

        assert_eq!(Some(helper_id()), desc.lookup("lib.helper").unwrap().declaration());
        assert!(desc.local("lib.helper").is_none());

        assert_eq!(
            Some(println_id()),
            desc.lookup("kotlin.println").unwrap().declaration()
        );

        assert_eq!(None, desc.lookup("kotlin.nothing"));
    }

    #[test]
    fn same_artifact_through_two_paths_shares_descriptor() {
        let set = KlibSet::standard();
        let mut graph = ModuleGraph::new();

        let kotlin = graph.add_record(CompiledModuleRecord::builtins(
            "kotlin",
            set.path("kotlin"),
        ));
        let direct = graph.add_record(CompiledModuleRecord::new("lib", set.path("lib")));
        let dotted = graph.add_record(CompiledModuleRecord::new(
            "lib",
            set.dir.path().join(".").join("lib.klib"),
        ));

        graph.add_dependency(direct, kotlin);
        graph.add_dependency(dotted, kotlin);

        let mut reader = KlibReader::new();
        let mut sut: DescriptorCache = DescriptorCache::new();

        let a = sut.resolve(&mut reader, &graph, direct).unwrap();
        let b = sut.resolve(&mut reader, &graph, dotted).unwrap();

        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(2, sut.len());
    }

    #[test]
    fn name_mismatch_is_error() {
        let set = KlibSet::standard();
        let mut graph = ModuleGraph::new();

        let kotlin = graph.add_record(CompiledModuleRecord::builtins(
            "kotlin",
            set.path("kotlin"),
        ));
        let wrong = graph.add_record(CompiledModuleRecord::new("wrong", set.path("lib")));
        graph.add_dependency(wrong, kotlin);

        let mut reader = KlibReader::new();
        let mut sut: DescriptorCache = DescriptorCache::new();

        match sut.resolve(&mut reader, &graph, wrong) {
            Err(DescriptorError::NameMismatch {
                expected, found, ..
            }) => {
                assert_eq!("wrong", expected);
                assert_eq!("lib", found);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_artifact_is_unresolved_dependency() {
        let set = KlibSet::new();
        let mut graph = ModuleGraph::new();

        let missing = graph.add_record(CompiledModuleRecord::builtins(
            "kotlin",
            set.path("kotlin"),
        ));

        let mut reader = KlibReader::new();
        let mut sut: DescriptorCache = DescriptorCache::new();

        match sut.resolve(&mut reader, &graph, missing) {
            Err(DescriptorError::Klib(KlibError::UnresolvedDependency {
                module,
                path,
            })) => {
                assert_eq!("kotlin", module);
                assert_eq!(set.path("kotlin"), path);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

mod discovery {
    use super::*;

    #[test]
    fn discovers_transitive_dependencies() {
        let set = KlibSet::standard();
        let mut reader = KlibReader::new();

        let (graph, root) =
            discover(&mut reader, &set.path("app"), &[]).unwrap();

        assert_eq!(3, graph.len());
        assert_eq!("app", graph.get(root).unwrap().name);
        assert_eq!(vec!["kotlin", "lib"], names(&graph, &graph.dependencies(root)));

        let kotlin = graph.find("kotlin").unwrap();
        assert!(graph.get(kotlin).unwrap().is_builtins);
        assert_eq!(set.path("kotlin"), graph.get(kotlin).unwrap().artifact_path);
    }

    #[test]
    fn falls_back_to_search_paths() {
        let set = KlibSet::standard();
        let libs = set.dir.path().join("libs");

        fs::create_dir(&libs).unwrap();
        fs::rename(set.path("lib"), libs.join("lib.klib")).unwrap();

        let mut reader = KlibReader::new();
        let (graph, _) =
            discover(&mut reader, &set.path("app"), &[libs.clone()])
                .unwrap();

        let lib = graph.find("lib").unwrap();
        assert_eq!(libs.join("lib.klib"), graph.get(lib).unwrap().artifact_path);
    }

    #[test]
    fn missing_dependency_is_error() {
        let set = KlibSet::standard();
        fs::remove_dir_all(set.path("lib")).unwrap();

        let mut reader = KlibReader::new();

        match discover(&mut reader, &set.path("app"), &[]) {
            Err(KlibError::UnresolvedDependency { module, path }) => {
                assert_eq!("lib", module);
                assert_eq!(PathBuf::from("lib.klib"), path);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
