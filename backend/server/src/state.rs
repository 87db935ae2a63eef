use std::{sync::Arc, time::Instant};

use super::{analytics::AnalyticsRegistry, config::Config};

pub struct AppState {
    pub config: Config,
    pub registry: AnalyticsRegistry,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_registry(config, AnalyticsRegistry::new())
    }

    pub fn with_registry(config: Config, registry: AnalyticsRegistry) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            started_at: Instant::now(),
        })
    }
}
