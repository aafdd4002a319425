// Link orchestration
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

use fxhash::FxHashSet;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::rc::Rc;

use super::{
    AnalyzedModule, Backend, CachedDependencies, CancelToken, Checkpoint,
    DependencyCache, Frontend, MemoryDependencyCache, Phase, PhaseConfig,
    State,
};
use crate::ir::ModuleIr;
use crate::klib::{KlibError, KlibReader, KlibWriter, MetadataEntry};
use crate::link::{
    LinkError, LinkGraph, LinkedModule, LinkedProgram, StubResolver,
};
use crate::module::{
    DescriptorCache, DescriptorError, ModuleDescriptor, ModuleGraph,
    ModuleGraphError, RecordRef,
};

/// What a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Write a klib to `destination`.
    Klib { destination: PathBuf },

    /// Lower the linked program and emit text.
    Output,
}

/// Options of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    pub target: Target,

    /// Verify klib consistency before making it visible
    ///   (see [`KlibWriter::strict`]).
    pub strict: bool,
    pub debug_index: bool,
    pub phases: PhaseConfig,
}

impl LinkOptions {
    pub fn klib<P: Into<PathBuf>>(destination: P) -> Self {
        Self {
            target: Target::Klib {
                destination: destination.into(),
            },
            strict: false,
            debug_index: false,
            phases: Default::default(),
        }
    }

    pub fn output() -> Self {
        Self {
            target: Target::Output,
            ..Self::klib(PathBuf::new())
        }
    }
}

/// Already-compiled dependencies of the module being compiled.
///
/// `roots` are the direct dependencies of the module;
///   `graph` must contain every record reachable from them.
/// A builtins module has no roots.
#[derive(Debug, Default)]
pub struct LinkRequest {
    pub graph: ModuleGraph,
    pub roots: Vec<RecordRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationResult {
    Output(String),

    /// A klib was written to the destination of the request.
    ArtifactWritten,
}

/// Result of a run that did not fail.
///
/// Cancellation is not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(TranslationResult),

    /// The run was cancelled at a checkpoint within this phase.
    Aborted(Phase),
}

#[derive(Debug)]
pub enum PipelineErrorKind {
    Frontend(Box<dyn std::error::Error>),
    Graph(ModuleGraphError),
    Descriptor(DescriptorError),
    Klib(KlibError),
    Link(LinkError),
    Backend(Box<dyn std::error::Error>),
}

impl Display for PipelineErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Frontend(err) => Display::fmt(err, fmt),
            Self::Graph(err) => Display::fmt(err, fmt),
            Self::Descriptor(err) => Display::fmt(err, fmt),
            Self::Klib(err) => Display::fmt(err, fmt),
            Self::Link(err) => Display::fmt(err, fmt),
            Self::Backend(err) => Display::fmt(err, fmt),
        }
    }
}

impl From<ModuleGraphError> for PipelineErrorKind {
    fn from(err: ModuleGraphError) -> Self {
        Self::Graph(err)
    }
}

impl From<DescriptorError> for PipelineErrorKind {
    fn from(err: DescriptorError) -> Self {
        Self::Descriptor(err)
    }
}

impl From<KlibError> for PipelineErrorKind {
    fn from(err: KlibError) -> Self {
        Self::Klib(err)
    }
}

impl From<LinkError> for PipelineErrorKind {
    fn from(err: LinkError) -> Self {
        Self::Link(err)
    }
}

/// Failure of a pipeline run.
///
/// Carries enough context to reconstruct the cause without running the
///   pipeline again.
#[derive(Debug)]
pub struct PipelineError {
    pub phase: Phase,

    /// Module being compiled,
    ///   if analysis got far enough to name it.
    pub module: Option<String>,
    pub kind: PipelineErrorKind,
}

impl Display for PipelineError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &self.module {
            Some(module) => {
                write!(fmt, "{} of `{module}` failed: {}", self.phase, self.kind)
            }
            None => write!(fmt, "{} failed: {}", self.phase, self.kind),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            PipelineErrorKind::Frontend(err) => Some(err.as_ref()),
            PipelineErrorKind::Graph(err) => Some(err),
            PipelineErrorKind::Descriptor(err) => Some(err),
            PipelineErrorKind::Klib(err) => Some(err),
            PipelineErrorKind::Link(err) => Some(err),
            PipelineErrorKind::Backend(err) => Some(err.as_ref()),
        }
    }
}

/// Drives a module from analysis through either klib emission or output.
///
/// ```text
/// Analyzing -> Translating -> LinkingDependencies -+-> EmittingArtifact ----------+-> Done
///                                                  `-> LoweringAndEmittingOutput -'
/// ```
///
/// Any phase may fail,
///   leaving the orchestrator in [`State::Failed`].
/// The [`CancelToken`] is polled after analysis,
///   after translation,
///   after each dependency is linked,
///   and before a klib is emitted;
///     a cancelled run leaves the orchestrator in [`State::Aborted`] and
///     discards everything it linked.
///
/// Dependency linking proceeds as follows:
///
///   1. The record graph is linearized;
///   2. Descriptors are resolved for each record in link order;
///   3. Each dependency is deserialized and its stubs reconciled;
///   4. The freshly translated module is merged into the graph; and
///   5. The graph is asserted to contain no live stubs.
pub struct LinkOrchestrator {
    options: LinkOptions,
    cancel: CancelToken,
    state: State,
    dependency_cache: Box<dyn DependencyCache>,
}

impl LinkOrchestrator {
    pub fn new(options: LinkOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::new(),
            state: State::Idle,
            dependency_cache: Box::new(MemoryDependencyCache::new()),
        }
    }

    pub fn with_cancel_token(self, cancel: CancelToken) -> Self {
        Self { cancel, ..self }
    }

    pub fn with_dependency_cache(self, cache: Box<dyn DependencyCache>) -> Self {
        Self {
            dependency_cache: cache,
            ..self
        }
    }

    /// Token that cancels this orchestrator.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn dependency_cache(&self) -> &dyn DependencyCache {
        self.dependency_cache.as_ref()
    }

    pub fn run<F: Frontend, B: Backend>(
        &mut self,
        frontend: &mut F,
        backend: &mut B,
        request: LinkRequest,
    ) -> Result<Outcome, PipelineError> {
        let result = self.run_phases(frontend, backend, request);

        self.state = match &result {
            Ok(Outcome::Completed(_)) => State::Done,
            Ok(Outcome::Aborted(phase)) => {
                tracing::info!(%phase, "pipeline aborted");
                State::Aborted(*phase)
            }
            Err(err) => {
                tracing::debug!(error = %err, "pipeline failed");
                State::Failed(err.to_string())
            }
        };

        result
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(%phase, "entering phase");
        self.state = State::Running(phase);
    }

    fn run_phases<F: Frontend, B: Backend>(
        &mut self,
        frontend: &mut F,
        backend: &mut B,
        request: LinkRequest,
    ) -> Result<Outcome, PipelineError> {
        self.enter(Phase::Analyzing);

        let analyzed = frontend.analyze().map_err(|e| PipelineError {
            phase: Phase::Analyzing,
            module: None,
            kind: PipelineErrorKind::Frontend(Box::new(e)),
        })?;

        let name = analyzed.name().to_string();
        let fail = |phase: Phase| {
            let module = Some(name.clone());
            move |kind: PipelineErrorKind| PipelineError {
                phase,
                module,
                kind,
            }
        };

        if self.cancel.checkpoint() == Checkpoint::Abort {
            return Ok(Outcome::Aborted(Phase::Analyzing));
        }

        self.enter(Phase::Translating);

        let mut ir = frontend.translate(&analyzed).map_err(|e| {
            fail(Phase::Translating)(PipelineErrorKind::Frontend(Box::new(e)))
        })?;

        ir.descriptors = analyzed.namespace().to_vec();

        if self.cancel.checkpoint() == Checkpoint::Abort {
            return Ok(Outcome::Aborted(Phase::Translating));
        }

        self.enter(Phase::LinkingDependencies);

        let linked = match self.link(&request, ir) {
            Ok(Some(linked)) => linked,
            Ok(None) => return Ok(Outcome::Aborted(Phase::LinkingDependencies)),
            Err(kind) => return Err(fail(Phase::LinkingDependencies)(kind)),
        };

        match &self.options.target {
            Target::Klib { destination } => {
                let destination = destination.clone();
                self.enter(Phase::EmittingArtifact);

                if self.cancel.checkpoint() == Checkpoint::Abort {
                    return Ok(Outcome::Aborted(Phase::EmittingArtifact));
                }

                let Linked {
                    program,
                    dependency_names,
                } = linked;

                let main = program
                    .main()
                    .expect("internal error: linked program has no module");

                KlibWriter::new()
                    .strict(self.options.strict)
                    .with_debug_index(self.options.debug_index)
                    .write(&program.graph, main, &dependency_names, &destination)
                    .map_err(|e| fail(Phase::EmittingArtifact)(e.into()))?;

                Ok(Outcome::Completed(TranslationResult::ArtifactWritten))
            }

            Target::Output => {
                self.enter(Phase::LoweringAndEmittingOutput);

                let fail_backend = |e: B::Error| {
                    fail(Phase::LoweringAndEmittingOutput)(
                        PipelineErrorKind::Backend(Box::new(e)),
                    )
                };

                let lowered = backend
                    .lower(&linked.program, &self.options.phases)
                    .map_err(fail_backend)?;
                let text = backend.emit(&lowered).map_err(fail_backend)?;

                Ok(Outcome::Completed(TranslationResult::Output(text)))
            }
        }
    }

    /// Link the dependencies of `ir` and then `ir` itself.
    ///
    /// Returns [`None`] if cancelled.
    fn link(
        &mut self,
        request: &LinkRequest,
        ir: ModuleIr,
    ) -> Result<Option<Linked>, PipelineErrorKind> {
        let records = &request.graph;

        let order = if ir.is_builtins {
            if !request.roots.is_empty() {
                return Err(
                    ModuleGraphError::BuiltinsHasDependencies(ir.name.clone()).into()
                );
            }

            vec![]
        } else {
            records.linearize(&request.roots)?
        };

        let dependency_names: Vec<String> = order
            .iter()
            .filter_map(|&r| records.get(r))
            .map(|rec| rec.name.clone())
            .collect();

        self.dependency_cache.store(
            &ir.name,
            CachedDependencies {
                modules: order
                    .iter()
                    .filter_map(|&r| records.get(r))
                    .map(|rec| (rec.name.clone(), rec.artifact_path.clone()))
                    .collect(),
            },
        );

        let mut reader = KlibReader::new();
        let mut descriptors: DescriptorCache = DescriptorCache::new();
        let mut graph = LinkGraph::new();

        let resolved = order
            .iter()
            .map(|&r| descriptors.resolve(&mut reader, records, r).map(|d| (r, d)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut modules = Vec::with_capacity(resolved.len() + 1);

        for (record, descriptor) in resolved {
            let rec = records
                .get(record)
                .expect("internal error: linearized record not in graph");

            let dep_paths: Vec<_> = records
                .dependencies(record)
                .into_iter()
                .filter_map(|dep| records.get(dep))
                .map(|dep| dep.artifact_path.clone())
                .collect();

            let module = reader.deserialize_module(
                &mut graph,
                descriptor,
                &rec.artifact_path,
                &dep_paths,
                rec.is_builtins,
            )?;

            graph.reconcile(&module)?;
            modules.push(module);

            if self.cancel.checkpoint() == Checkpoint::Abort {
                return Ok(None);
            }
        }

        let direct = request
            .roots
            .iter()
            .filter(|r| records.get(**r).map_or(false, |rec| !rec.is_builtins))
            .map(|&r| descriptors.resolve(&mut reader, records, r))
            .collect::<Result<Vec<_>, _>>()?;

        let owned: FxHashSet<_> = ir.declarations().map(|d| d.id).collect();
        let entries: Vec<_> = ir
            .descriptors
            .iter()
            .map(|desc| MetadataEntry::for_descriptor(desc, owned.contains(&desc.id())))
            .collect();

        let descriptor = Rc::new(ModuleDescriptor::from_namespace(
            ir.name.clone(),
            ir.is_builtins,
            descriptors.builtins().cloned(),
            direct,
            entries,
        ));

        let main = LinkedModule::from_ir(ir, descriptor);

        graph.import(&main)?;
        graph.reconcile(&main)?;

        tracing::debug!(
            module = %main.name,
            dependencies = modules.len(),
            declarations = graph.declaration_count(),
            stubs = graph.stub_count(),
            live_stubs = graph.live_stubs().len(),
            "linked module"
        );

        graph.assert_fully_reconciled()?;
        modules.push(main);

        Ok(Some(Linked {
            program: LinkedProgram { graph, modules },
            dependency_names,
        }))
    }
}

struct Linked {
    program: LinkedProgram,
    dependency_names: Vec<String>,
}
