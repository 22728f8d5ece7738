//! Shared application state for the web server.

use std::sync::Arc;

use minijinja::Environment;
use synroute_config::{Config, PageConfig};
use synroute_molecules::{Depicter, RxnRouteClient, SynthesisPlanner};

const PAGE_TEMPLATE: &str = include_str!("../templates/page.html");

/// Shared state injected into every Axum handler. Nothing in here is
/// mutated after startup.
pub struct AppState {
    pub planner: Arc<SynthesisPlanner>,
    pub page: PageConfig,
    pub templates: Environment<'static>,
}

impl AppState {
    pub fn new(planner: SynthesisPlanner, page: PageConfig) -> Result<Self, minijinja::Error> {
        let mut templates = Environment::new();
        // `.html` names get HTML auto-escaping
        templates.add_template("page.html", PAGE_TEMPLATE)?;
        Ok(Self { planner: Arc::new(planner), page, templates })
    }

    /// Wire the live route client and depicter from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = RxnRouteClient::from_config(&config.route)?;
        let depicter = Depicter::new(config.depiction.size);
        let planner = SynthesisPlanner::new(depicter, Arc::new(client))
            .with_max_smiles_len(config.depiction.max_smiles_len);
        Ok(Self::new(planner, config.page.clone())?)
    }
}

pub type SharedState = Arc<AppState>;
