// Application state module
// Shared by every connection task

use std::io;

use super::types::Config;
use crate::service::{DefaultLookup, ResourceService};

/// Application state
pub struct AppState {
    pub config: Config,
    pub service: ResourceService<DefaultLookup>,
}

impl AppState {
    /// Build the resource service described by `config`
    pub fn new(config: &Config) -> io::Result<Self> {
        Ok(Self {
            config: config.clone(),
            service: ResourceService::from_config(config)?,
        })
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
