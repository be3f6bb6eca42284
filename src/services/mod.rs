//! Business logic services

pub mod auth;
pub mod identity;
pub mod occupancy;
pub mod redis;
pub mod roster;
pub mod scan;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

use self::{identity::IdentityProvider, redis::RevocationList};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub scan: scan::ScanService,
    pub roster: roster::RosterService,
    pub occupancy: occupancy::OccupancyService,
    pub repository: Repository,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        identity: Arc<dyn IdentityProvider>,
        revocations: Arc<dyn RevocationList>,
    ) -> Self {
        Self {
            auth: auth::AuthService::new(
                identity,
                revocations,
                config.auth.clone(),
                config.gate.clone(),
            ),
            scan: scan::ScanService::new(repository.clone(), config.scan.clone()),
            roster: roster::RosterService::new(repository.clone()),
            occupancy: occupancy::OccupancyService::new(repository.clone()),
            repository,
        }
    }
}
