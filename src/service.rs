//! Business logic services.

use std::sync::Arc;

use crate::repository::Repository;
use crate::service::subscription_service::SubscriptionService;

pub mod error;
pub mod subscription_service;

/// Container for all application services.
pub struct Services {
    pub subscription: Arc<SubscriptionService>,
}

impl Services {
    /// Creates and initializes all services.
    pub async fn new(db: Arc<Repository>) -> anyhow::Result<Self> {
        let subscription = Arc::new(SubscriptionService::new(db).await?);
        Ok(Self { subscription })
    }
}
