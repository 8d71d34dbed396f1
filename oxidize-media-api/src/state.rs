use std::sync::Arc;

use oxidize_media::TempStore;

use crate::config::ServerConfig;

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    temp: Arc<TempStore>,
    api_key: Option<Arc<str>>,
    max_dimension: u32,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            temp: Arc::new(TempStore::new(config.temp.clone())),
            api_key: config.api_key.as_deref().map(Arc::from),
            max_dimension: config.max_dimension,
        }
    }

    pub fn temp(&self) -> &Arc<TempStore> {
        &self.temp
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}
