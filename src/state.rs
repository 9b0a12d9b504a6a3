use std::sync::Arc;

use crate::agent::{AgentRuntime, Dispatcher, HostedAgentClient};
use crate::config::Config;
use crate::storage::Store;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<Store>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let runtime = Arc::new(HostedAgentClient::new(&config.agent_runtime));
        Self::with_runtime(config, runtime)
    }

    /// Build state around a caller-supplied runtime. Used by tests to
    /// substitute a stub for the hosted agent service.
    pub fn with_runtime(config: Config, runtime: Arc<dyn AgentRuntime>) -> Self {
        let store = Arc::new(Store::new(config.system_config.max_sessions));
        let dispatcher = Arc::new(Dispatcher::new(
            runtime,
            store.clone(),
            config.agent_runtime.model.clone(),
        ));
        Self {
            config,
            store,
            dispatcher,
        }
    }
}
