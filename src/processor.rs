//! Round driver: scan, filter, validate, classify, emit, write.
//!
//! A failure in one interface never stops the others. Deferred interfaces are
//! handed back so the host can retry them once more of the universe exists.

use crate::classifier::classify_interface;
use crate::config::GeneratorConfig;
use crate::diagnostics::Diagnostics;
use crate::emitter::Emitter;
use crate::errors::GenError;
use crate::resolver::UniverseResolver;
use crate::scanner::{scan, DeclaredInterface};
use crate::tracker::{StateTracker, ValidationResult};
use crate::universe::Universe;
use crate::writer::{CodeGenerator, WriteOutcome};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug_span;

/// Upper bound on rounds for [`Processor::run_to_fixpoint`]
const MAX_ROUNDS: usize = 16;

/// Input of one round
#[derive(Debug)]
pub struct ProcessingRound<'a> {
    pub universe: &'a Universe,
    /// Qualified names deferred by the previous round
    pub deferred: Vec<String>,
}

impl<'a> ProcessingRound<'a> {
    pub fn new(universe: &'a Universe) -> Self {
        Self {
            universe,
            deferred: Vec::new(),
        }
    }

    pub fn retrying(universe: &'a Universe, previous: &RoundOutput) -> Self {
        Self {
            universe,
            deferred: previous
                .deferred
                .iter()
                .map(|d| d.declaration.qualified_name.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedRecord {
    pub qualified_name: String,
    pub unit_name: String,
    pub path: PathBuf,
    /// False when the existing file already matched
    pub written: bool,
}

#[derive(Debug, Clone)]
pub struct DeferredInterface {
    pub declaration: DeclaredInterface,
    pub unresolved: Vec<String>,
}

/// What one round did with each marked interface
#[derive(Debug, Default)]
pub struct RoundOutput {
    pub generated: Vec<GeneratedRecord>,
    pub deferred: Vec<DeferredInterface>,
    /// Already processed in an earlier round
    pub skipped: Vec<String>,
    pub aborted: Vec<GenError>,
    pub write_failures: Vec<GenError>,
}

impl RoundOutput {
    /// Whether anything was newly admitted this round
    pub fn made_progress(&self) -> bool {
        !self.generated.is_empty() || !self.aborted.is_empty() || !self.write_failures.is_empty()
    }
}

/// Aggregate of every round in a run
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    pub rounds: usize,
    pub generated: Vec<GeneratedRecord>,
    /// Still unresolved after the last round: name and missing types
    pub deferred: Vec<(String, Vec<String>)>,
    pub aborted: Vec<String>,
    pub write_failures: Vec<String>,
    pub parse_failures: Vec<String>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_empty() && self.write_failures.is_empty()
    }

    pub fn written_count(&self) -> usize {
        self.generated.iter().filter(|g| g.written).count()
    }

    fn absorb(&mut self, output: RoundOutput) {
        self.rounds += 1;
        self.generated.extend(output.generated);
        self.aborted
            .extend(output.aborted.iter().map(|e| e.to_string()));
        self.write_failures
            .extend(output.write_failures.iter().map(|e| e.to_string()));
        self.deferred = output
            .deferred
            .into_iter()
            .map(|d| (d.declaration.qualified_name, d.unresolved))
            .collect();
    }
}

pub struct Processor<G: CodeGenerator, D: Diagnostics> {
    config: GeneratorConfig,
    tracker: StateTracker,
    generator: G,
    diagnostics: D,
}

impl<G: CodeGenerator, D: Diagnostics> Processor<G, D> {
    pub fn new(config: GeneratorConfig, generator: G, diagnostics: D) -> Self {
        Self {
            config,
            tracker: StateTracker::new(),
            generator,
            diagnostics,
        }
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn into_generator(self) -> G {
        self.generator
    }

    /// Run one round over `round.universe`
    pub fn process_round(&mut self, round: ProcessingRound<'_>) -> RoundOutput {
        let _span = debug_span!("round", retrying = round.deferred.len()).entered();
        let resolver = UniverseResolver::new(round.universe);
        let mut output = RoundOutput::default();

        for declaration in scan(round.universe, &self.config.generator.marker) {
            if self.tracker.is_processed(&declaration.qualified_name) {
                output.skipped.push(declaration.qualified_name);
                continue;
            }

            match self.tracker.validate(&declaration, &resolver, &self.config) {
                ValidationResult::Deferred { unresolved } => {
                    self.diagnostics.warn(&format!(
                        "{} deferred to a later round: unresolved {}",
                        declaration.qualified_name,
                        unresolved.join(", ")
                    ));
                    output.deferred.push(DeferredInterface {
                        declaration,
                        unresolved,
                    });
                }
                ValidationResult::Valid => {
                    if !self.tracker.admit(&declaration.qualified_name) {
                        output.skipped.push(declaration.qualified_name);
                        continue;
                    }
                    self.generate(&declaration, &resolver, &mut output);
                }
            }
        }

        if round.deferred.iter().any(|name| self.tracker.is_processed(name)) {
            self.diagnostics
                .debug("previously deferred interfaces were generated this round");
        }
        output
    }

    fn generate(
        &mut self,
        declaration: &DeclaredInterface,
        resolver: &UniverseResolver,
        output: &mut RoundOutput,
    ) {
        let _span = debug_span!("interface", name = %declaration.qualified_name).entered();

        let unit = classify_interface(declaration, resolver, &self.config)
            .and_then(|descriptor| Emitter::new(&self.config).emit(&descriptor));
        let unit = match unit {
            Ok(unit) => unit,
            Err(err) => {
                self.diagnostics.error(&err.to_string());
                output.aborted.push(err);
                return;
            }
        };

        match self.generator.write_unit(
            &unit.package_name,
            &unit.unit_name,
            &unit.source,
            &unit.origin,
        ) {
            Ok(outcome) => {
                let written = matches!(outcome, WriteOutcome::Written(_));
                self.diagnostics.info(&format!(
                    "{} {} for {}",
                    if written { "generated" } else { "unchanged" },
                    unit.unit_name,
                    unit.qualified_name
                ));
                output.generated.push(GeneratedRecord {
                    qualified_name: unit.qualified_name,
                    unit_name: unit.unit_name,
                    path: outcome.path().to_path_buf(),
                    written,
                });
            }
            Err(err) => {
                self.diagnostics.error(&err.to_string());
                output.write_failures.push(err);
            }
        }
    }

    /// Run rounds over a fixed universe until one makes no progress
    pub fn run_to_fixpoint(&mut self, universe: &Universe) -> BuildReport {
        let mut report = BuildReport {
            parse_failures: universe
                .parse_failures()
                .iter()
                .map(|e| e.to_string())
                .collect(),
            ..BuildReport::default()
        };
        for failure in &report.parse_failures {
            self.diagnostics.warn(failure);
        }

        let mut round = ProcessingRound::new(universe);
        for _ in 0..MAX_ROUNDS {
            let output = self.process_round(round);
            let progressed = output.made_progress();
            round = ProcessingRound::retrying(universe, &output);
            report.absorb(output);
            if !progressed {
                break;
            }
        }

        for (name, unresolved) in &report.deferred {
            self.diagnostics.warn(&format!(
                "{} was never generated: unresolved {}",
                name,
                unresolved.join(", ")
            ));
        }
        report
    }
}
