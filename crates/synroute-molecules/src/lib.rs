//! SynRoute Molecules - structure handling and route prediction.
//!
//! This crate covers everything one user action touches:
//! 1. Parsing and validating SMILES input
//! 2. Generating 2-D coordinates
//! 3. Depicting the structure as a fixed-size image
//! 4. Requesting a synthesis route from the remote service
//! 5. Orchestrating the above into a single outcome

pub mod element;
pub mod mol;
pub mod rings;
pub mod valence;
pub mod kekulize;
pub mod smiles;
pub mod layout;
pub mod depict;
pub mod route;
pub mod pipeline;

pub use depict::{DepictError, Depicter, Depiction};
pub use mol::Molecule;
pub use pipeline::{action_span, ActionError, ActionOutcome, PreparedStructure, SynthesisPlanner};
pub use route::{ImageFormat, RouteError, RouteImage, RoutePredictor, RxnRouteClient};
pub use smiles::{parse_smiles, SmilesError};
