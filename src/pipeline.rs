//! One analysis run: Loading -> Resolving -> Analyzing -> Completed, or
//! Failed in whichever stage first reports errors.

use std::fmt;

use tracing::{debug, info};

use crate::analyzer::Analyzer;
use crate::config::AnalysisConfig;
use crate::error::{RunFailure, SchemaError, Stage};
use crate::loader::{CorpusSource, Loader};
use crate::model::NormalizedSchemaModel;
use crate::naming::{NamingPolicy, SnakeCasePolicy};
use crate::resolver::InheritanceResolver;
use crate::types::TypeMapper;

#[derive(Debug)]
pub enum RunState {
    Loading,
    Resolving,
    Analyzing,
    Completed,
    Failed { stage: Stage, errors: Vec<SchemaError> },
}

impl RunState {
    /// Move to the next stage. Terminal states stay where they are.
    pub fn advance(self) -> Self {
        match self {
            RunState::Loading => RunState::Resolving,
            RunState::Resolving => RunState::Analyzing,
            RunState::Analyzing => RunState::Completed,
            terminal => terminal,
        }
    }

    pub fn fail(self, errors: Vec<SchemaError>) -> Self {
        match self.stage() {
            Some(stage) => RunState::Failed { stage, errors },
            None => self,
        }
    }

    /// The stage being executed, if the run is still in progress.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunState::Loading => Some(Stage::Loading),
            RunState::Resolving => Some(Stage::Resolving),
            RunState::Analyzing => Some(Stage::Analyzing),
            RunState::Completed | RunState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage().is_none()
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Completed => write!(f, "completed"),
            RunState::Failed { stage, .. } => write!(f, "failed while {}", stage),
            running => match running.stage() {
                Some(stage) => write!(f, "{}", stage),
                None => Ok(()),
            },
        }
    }
}

/// Runs are independent: a `Pipeline` holds only configuration and can be
/// reused for any number of sources.
pub struct Pipeline {
    mapper: TypeMapper,
    naming: Box<dyn NamingPolicy>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(TypeMapper::new(), Box::new(SnakeCasePolicy::default()))
    }
}

impl Pipeline {
    pub fn new(mapper: TypeMapper, naming: Box<dyn NamingPolicy>) -> Self {
        Self { mapper, naming }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.type_mapper(), Box::new(config.naming.clone()))
    }

    pub fn naming(&self) -> &dyn NamingPolicy {
        self.naming.as_ref()
    }

    pub fn run(&self, source: &dyn CorpusSource) -> Result<NormalizedSchemaModel, RunFailure> {
        let mut state = RunState::Loading;
        debug!("analyzing {}: {}", source.describe(), state);

        let corpus = match Loader::load(source) {
            Ok(corpus) => corpus,
            Err(errors) => return Err(into_failure(state.fail(errors))),
        };
        state = state.advance();
        debug!("analyzing {}: {}", source.describe(), state);

        let resolved = match InheritanceResolver::resolve_corpus(corpus) {
            Ok(resolved) => resolved,
            Err(errors) => return Err(into_failure(state.fail(errors))),
        };
        state = state.advance();
        debug!("analyzing {}: {}", source.describe(), state);

        let model = match Analyzer::new(&self.mapper, self.naming.as_ref()).analyze(resolved) {
            Ok(model) => model,
            Err(errors) => return Err(into_failure(state.fail(errors))),
        };
        state = state.advance();

        info!(
            "{} {}: {} entities, {} association tables, {} warnings",
            source.describe(),
            state,
            model.entities().count(),
            model.associations().count(),
            model.warnings().len()
        );
        Ok(model)
    }
}

fn into_failure(state: RunState) -> RunFailure {
    match state {
        RunState::Failed { stage, errors } => RunFailure { stage, errors },
        // Only reachable from a non-failed state, which `fail` never returns
        // while a stage is running.
        other => RunFailure {
            stage: other.stage().unwrap_or(Stage::Analyzing),
            errors: Vec::new(),
        },
    }
}
