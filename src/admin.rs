//! Cache administration surface
//!
//! Callers are expected to have authenticated the administrator already.

use cache_system::{CacheService, CacheStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub message: String,
}

/// Stats and bulk clear over the whole cache prefix
#[derive(Debug, Clone)]
pub struct AdminSurface {
    cache: Arc<CacheService>,
}

impl AdminSurface {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear(&self) -> Result<ClearResponse, GatewayError> {
        if self.cache.clear_all().await {
            Ok(ClearResponse {
                message: "Cache cleared successfully".to_string(),
            })
        } else {
            Err(GatewayError::CacheClearFailed)
        }
    }
}
