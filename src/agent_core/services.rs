//! Collaborators shared by the pipeline nodes, injected once at
//! orchestrator construction.

use std::sync::Arc;

use crate::inference::OracleAdapter;
use crate::schemes::{ApplicationRegistrar, SchemeDataset};
use crate::settings::AgentSettings;

#[derive(Clone)]
pub struct AgentServices {
    pub oracle: OracleAdapter,
    pub dataset: SchemeDataset,
    /// Process-wide; every orchestrator built from the same registrar shares
    /// duplicate protection.
    pub registrar: Arc<ApplicationRegistrar>,
    pub settings: AgentSettings,
}

impl AgentServices {
    pub fn new(
        oracle: OracleAdapter,
        dataset: SchemeDataset,
        registrar: Arc<ApplicationRegistrar>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            oracle,
            dataset,
            registrar,
            settings,
        }
    }

    /// Offline oracle, built-in dataset, default settings.
    pub fn offline() -> Self {
        let settings = AgentSettings::default();
        Self::new(
            OracleAdapter::offline(),
            SchemeDataset::built_in(),
            Arc::new(ApplicationRegistrar::new(settings.estimated_processing_days)),
            settings,
        )
    }
}
