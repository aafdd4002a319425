// Tests for the klinkld binary
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

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn link_invalid_argument() -> TestResult {
    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("-q");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("Unrecognized option:"));

    Ok(())
}

#[test]
fn link_missing_input() -> TestResult {
    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--emit").arg("listing");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("INPUT"));

    Ok(())
}

#[test]
fn link_klib_requires_output() -> TestResult {
    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--emit").arg("klib").arg("app.klib");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("-o"));

    Ok(())
}

#[test]
fn link_help() -> TestResult {
    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--debug-index"));

    Ok(())
}

#[test]
fn link_input_does_not_exist() -> TestResult {
    let dir = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--emit").arg("listing");
    cmd.arg(dir.path().join("missing.klib"));
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("fatal: failed to link"));

    Ok(())
}

#[test]
fn link_emits_listing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let (_, app) = common::build(dir.path());

    let expected = format!(
        "; phases: default\n\
         module kotlin (builtins)\n\
         module app\n\
         {} kotlin: fun kotlin.println(kotlin.Any)\n\
         {} app: fun app.main()\n",
        common::println_id(),
        common::main_id(),
    );

    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--emit").arg("listing").arg(&app);
    cmd.assert().success().stdout(expected);

    Ok(())
}

#[test]
fn link_emits_klib() -> TestResult {
    let dir = tempfile::tempdir()?;
    let (_, app) = common::build(dir.path());
    let out = dir.path().join("out").join("app.klib");

    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--emit").arg("klib");
    cmd.arg("-o").arg(&out);
    cmd.arg("--strict").arg("--debug-index");
    cmd.arg(&app);
    cmd.assert().success();

    assert!(out.join("irHeader.kji").is_file());
    assert!(out.join("app.kjsm").is_file());
    assert!(fs::read_to_string(out.join("debugIndex.knd"))?
        .contains("fun app.main()"));

    Ok(())
}

#[test]
fn link_searches_library_paths() -> TestResult {
    let dir = tempfile::tempdir()?;
    let (kotlin, app) = common::build(dir.path());

    let libs = dir.path().join("libs");
    fs::create_dir(&libs)?;
    fs::rename(&kotlin, libs.join("kotlin.klib"))?;

    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--emit").arg("listing").arg(&app);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("dependency `kotlin`"));

    let mut cmd = Command::cargo_bin("klinkld")?;
    cmd.arg("--emit").arg("listing");
    cmd.arg("-L").arg(&libs);
    cmd.arg(&app);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("module kotlin (builtins)"));

    Ok(())
}
