// klink linker
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

//! This is the klink linker.
//!
//! `klinkld` relinks an existing klib against the already-compiled klibs
//!   it depends on,
//!     emitting either a fresh klib or a listing of the linked program.
//! Dependencies are located beside the input and then on each `-L` search
//!   path.
//!
//! For more information,
//!   see the [`klink::pipeline`] module.

extern crate klink;

use getopts::{Fail, Options};
use klink::{
    klib::{KlibError, KlibReader},
    module,
    pipeline::{
        KlibFrontend, LinkOptions, LinkOrchestrator, LinkRequest,
        ListingBackend, Outcome, PipelineError, TranslationResult,
    },
};
use std::{
    env,
    error::Error,
    fmt::{self, Display},
    fs, io,
    path::PathBuf,
};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Output type selected by `--emit`.
#[derive(Debug, PartialEq, Eq)]
enum Emit {
    Klib,
    Listing,
}

/// Types of commands
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Link(LinkCommand),
    Usage,
}

#[derive(Debug, PartialEq, Eq)]
struct LinkCommand {
    input: PathBuf,
    output: Option<PathBuf>,
    emit: Emit,
    search_paths: Vec<PathBuf>,
    strict: bool,
    debug_index: bool,
    verbosity: usize,
}

fn link(cmd: &LinkCommand) -> Result<(), KlinkldError> {
    let mut reader = KlibReader::new();
    let (graph, root) =
        module::discover(&mut reader, &cmd.input, &cmd.search_paths)?;

    let roots = graph.dependencies(root);

    tracing::info!(
        input = %cmd.input.display(),
        records = graph.len(),
        "discovered dependencies"
    );

    let base = match (&cmd.emit, &cmd.output) {
        (Emit::Klib, Some(dest)) => LinkOptions::klib(dest),
        (Emit::Klib, None) => return Err(KlinkldError::MissingOutput),
        (Emit::Listing, _) => LinkOptions::output(),
    };

    let options = LinkOptions {
        strict: cmd.strict,
        debug_index: cmd.debug_index,
        ..base
    };

    let outcome = LinkOrchestrator::new(options).run(
        &mut KlibFrontend::new(&cmd.input),
        &mut ListingBackend,
        LinkRequest { graph, roots },
    )?;

    match outcome {
        Outcome::Completed(TranslationResult::ArtifactWritten) => Ok(()),
        Outcome::Completed(TranslationResult::Output(text)) => {
            match &cmd.output {
                Some(dest) => fs::write(dest, text)?,
                None => print!("{text}"),
            }

            Ok(())
        }
        // Nothing holds the token,
        //   so this is only reachable if that changes.
        Outcome::Aborted(phase) => Err(KlinkldError::Aborted(phase.to_string())),
    }
}

fn init_logging(verbosity: usize) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));

    let format = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry().with(filter).with(format).init();
}

/// Entrypoint for the linker
pub fn main() {
    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage = opts.usage(&format!("Usage: {} [OPTIONS] INPUT", program));

    match parse_options(opts, args) {
        Ok(Command::Link(cmd)) => {
            init_logging(cmd.verbosity);

            if let Err(e) = link(&cmd) {
                eprintln!(
                    "fatal: failed to link `{}`: {e}",
                    cmd.input.display()
                );

                std::process::exit(1);
            }
        }
        Ok(Command::Usage) => {
            println!("{}", usage);
            std::process::exit(exitcode::OK);
        }
        Err(e) => {
            eprintln!("{}", e);
            println!("{}", usage);
            std::process::exit(exitcode::USAGE);
        }
    }
}

/// Get 'Options'
fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("o", "output", "set output path", "PATH");
    opts.optopt("", "emit", "set output type", "klib|listing");
    opts.optmulti("L", "", "add dependency search path", "DIR");
    opts.optflag("", "strict", "verify klib before making it visible");
    opts.optflag("", "debug-index", "write debug index into klib");
    opts.optflagmulti("v", "verbose", "increase log verbosity");
    opts.optflag("h", "help", "print this help menu");

    opts
}

/// Option parser
fn parse_options(opts: Options, args: Vec<String>) -> Result<Command, Fail> {
    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    let input = match matches.free.len() {
        0 => return Err(Fail::OptionMissing(String::from("INPUT"))),
        1 => PathBuf::from(&matches.free[0]),
        _ => return Err(Fail::UnrecognizedOption(matches.free[1].clone())),
    };

    let emit = match matches.opt_str("emit").as_deref() {
        Some("klib") => Emit::Klib,
        Some("listing") => Emit::Listing,
        Some(_) => {
            return Err(Fail::ArgumentMissing(String::from(
                "--emit klib|listing",
            )))
        }
        None => {
            return Err(Fail::OptionMissing(String::from("--emit klib|listing")))
        }
    };

    let output = matches.opt_str("o").map(PathBuf::from);

    if emit == Emit::Klib && output.is_none() {
        return Err(Fail::OptionMissing(String::from("-o")));
    }

    Ok(Command::Link(LinkCommand {
        input,
        output,
        emit,
        search_paths: matches.opt_strs("L").into_iter().map(PathBuf::from).collect(),
        strict: matches.opt_present("strict"),
        debug_index: matches.opt_present("debug-index"),
        verbosity: matches.opt_count("v"),
    }))
}

/// Linker (`klinkld`) error.
#[derive(Debug)]
pub enum KlinkldError {
    Io(io::Error),
    Klib(KlibError),
    Pipeline(PipelineError),
    MissingOutput,
    Aborted(String),
}

impl From<io::Error> for KlinkldError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<KlibError> for KlinkldError {
    fn from(e: KlibError) -> Self {
        Self::Klib(e)
    }
}

impl From<PipelineError> for KlinkldError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

impl Display for KlinkldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => Display::fmt(e, f),
            Self::Klib(e) => Display::fmt(e, f),
            Self::Pipeline(e) => Display::fmt(e, f),
            Self::MissingOutput => write!(f, "klib output requires -o"),
            Self::Aborted(phase) => write!(f, "aborted during {phase}"),
        }
    }
}

impl Error for KlinkldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Klib(e) => Some(e),
            Self::Pipeline(e) => Some(e),
            Self::MissingOutput | Self::Aborted(_) => None,
        }
    }
}
