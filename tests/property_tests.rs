//! Property-based tests using proptest
//!
//! Validate parser and registry invariants across randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use package_indexer::{Command, IndexerError, Package, PackageIndex, Registry, Request, Status};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9._+-]{0,15}"
}

// Property: parsing never panics, whatever the input
proptest! {
    #[test]
    fn prop_parse_never_panics(line in ".{0,64}\n?") {
        let _ = Request::parse(&line);
    }
}

// Property: an encoded request decodes to the same command, name and deps
proptest! {
    #[test]
    fn prop_request_line_decodes_back(
        command in prop_oneof![Just(Command::Index), Just(Command::Remove), Just(Command::Query)],
        pkg in name(),
        deps in prop::collection::vec(name(), 0..6),
    ) {
        let req = Request::new(command, Package::with_deps(pkg, deps));
        let decoded = Request::parse(&req.to_line()).expect("encoded line must parse");
        prop_assert_eq!(decoded, req);
    }
}

// Property: a line without terminator is always malformed
proptest! {
    #[test]
    fn prop_missing_terminator_is_malformed(pkg in name()) {
        let line = format!("INDEX|{pkg}|");
        prop_assert!(matches!(Request::parse(&line), Err(IndexerError::MalformedMessage)));
    }
}

#[derive(Debug, Clone)]
enum Op {
    Index(usize, Vec<usize>),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..8usize, prop::collection::vec(0..8usize, 0..3)).prop_map(|(p, d)| Op::Index(p, d)),
        (0..8usize).prop_map(Op::Remove),
    ]
}

fn pkg_name(i: usize) -> String {
    format!("p{i}")
}

// Property: after any sequence of operations every indexed package's
// dependencies are present
proptest! {
    #[test]
    fn prop_registry_keeps_dependency_closure(ops in prop::collection::vec(op(), 0..64)) {
        let registry = Registry::new();

        for op in ops {
            match op {
                Op::Index(p, deps) => {
                    let pkg = Package::with_deps(pkg_name(p), deps.into_iter().map(pkg_name));
                    let all_present = pkg.deps().iter().all(|d| registry.query(d) == Status::Ok);
                    let existed = registry.query(pkg.name()) == Status::Ok;
                    let status = registry.index(pkg);
                    prop_assert_eq!(status == Status::Ok, existed || all_present);
                }
                Op::Remove(p) => {
                    let name = pkg_name(p);
                    let required = !registry.dependents(&name).is_empty();
                    let status = registry.remove(&name);
                    prop_assert_eq!(status == Status::Fail, required);
                }
            }

            for i in 0..8 {
                if let Some(pkg) = registry.get(&pkg_name(i)) {
                    for dep in pkg.deps() {
                        prop_assert_eq!(registry.query(dep), Status::Ok);
                    }
                }
            }
        }
    }
}
