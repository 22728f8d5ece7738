//! Orchestrator for one user action: validate, depict, predict.

use std::sync::Arc;

use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::depict::{DepictError, Depicter, Depiction};
use crate::mol::Molecule;
use crate::route::{RouteError, RouteImage, RoutePredictor};
use crate::smiles::{parse_smiles, SmilesError};

/// Longest input accepted unless configured otherwise.
pub const DEFAULT_MAX_SMILES_LEN: usize = 500;

/// A validated and rendered input structure. Only obtainable through
/// [`SynthesisPlanner::prepare`], so a route request always follows a
/// successful depiction.
#[derive(Debug, Clone)]
pub struct PreparedStructure {
    smiles: String,
    molecule: Molecule,
    formula: String,
    depiction: Depiction,
}

impl PreparedStructure {
    /// The trimmed input, exactly as it is sent to the route service.
    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn depiction(&self) -> &Depiction {
        &self.depiction
    }

    pub fn into_png(self) -> Vec<u8> {
        self.depiction.png
    }
}

/// Failures that stop an action before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("invalid SMILES: {0}")]
    InvalidInput(#[from] SmilesError),

    #[error("structure rendering failed: {0}")]
    RenderFailed(#[from] DepictError),
}

/// Result of one user action.
#[derive(Debug)]
pub enum ActionOutcome {
    InvalidInput(SmilesError),
    RenderFailed(DepictError),
    Completed {
        structure: PreparedStructure,
        route: Result<RouteImage, RouteError>,
    },
}

impl ActionOutcome {
    pub fn structure(&self) -> Option<&PreparedStructure> {
        match self {
            ActionOutcome::Completed { structure, .. } => Some(structure),
            _ => None,
        }
    }

    pub fn route(&self) -> Option<&Result<RouteImage, RouteError>> {
        match self {
            ActionOutcome::Completed { route, .. } => Some(route),
            _ => None,
        }
    }
}

impl From<ActionError> for ActionOutcome {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::InvalidInput(e) => ActionOutcome::InvalidInput(e),
            ActionError::RenderFailed(e) => ActionOutcome::RenderFailed(e),
        }
    }
}

pub struct SynthesisPlanner {
    depicter: Depicter,
    predictor: Arc<dyn RoutePredictor>,
    max_smiles_len: usize,
}

impl SynthesisPlanner {
    pub fn new(depicter: Depicter, predictor: Arc<dyn RoutePredictor>) -> Self {
        Self { depicter, predictor, max_smiles_len: DEFAULT_MAX_SMILES_LEN }
    }

    pub fn with_max_smiles_len(mut self, max: usize) -> Self {
        self.max_smiles_len = max;
        self
    }

    pub fn depicter(&self) -> &Depicter {
        &self.depicter
    }

    /// Parse and draw the input. No network traffic, but CPU-bound: async
    /// callers should run it on the blocking pool.
    pub fn prepare(&self, smiles: &str) -> Result<PreparedStructure, ActionError> {
        let smiles = smiles.trim();
        let len = smiles.chars().count();
        if len > self.max_smiles_len {
            return Err(SmilesError::TooLong { len, max: self.max_smiles_len }.into());
        }
        let molecule = parse_smiles(smiles)?;
        let depiction = self.depicter.depict(&molecule)?;
        Ok(PreparedStructure {
            smiles: smiles.to_string(),
            formula: molecule.formula(),
            molecule,
            depiction,
        })
    }

    /// Ask the remote service for a route to an already prepared structure.
    /// The original notation string is what gets sent.
    pub async fn predict(&self, structure: &PreparedStructure) -> Result<RouteImage, RouteError> {
        self.predictor.predict(&structure.smiles).await
    }

    /// Finish an action from the result of [`prepare`](Self::prepare): stop on
    /// a preparation failure, otherwise request the route.
    pub async fn complete(&self, prepared: Result<PreparedStructure, ActionError>) -> ActionOutcome {
        let structure = match prepared {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "action stopped before route prediction");
                return e.into();
            }
        };
        info!(formula = %structure.formula, atoms = structure.molecule.atom_count(), "structure rendered");

        let route = self.predict(&structure).await;
        match &route {
            Ok(img) => info!(locator = %img.locator, "route prediction succeeded"),
            Err(e) => warn!(error = %e, "route prediction failed"),
        }
        ActionOutcome::Completed { structure, route }
    }

    /// Run one complete action on the current task.
    pub async fn run(&self, smiles: &str) -> ActionOutcome {
        let span = action_span();
        async move { self.complete(self.prepare(smiles)).await }
            .instrument(span)
            .await
    }
}

/// Span that groups the log lines of one action.
pub fn action_span() -> tracing::Span {
    tracing::info_span!("action", id = %Uuid::new_v4())
}
