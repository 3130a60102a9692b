//! Shared facade fixtures

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use vaultpair_adapter_memory::{
    InMemoryConnector, InMemoryIdentityStore, InMemoryRegion, StaticCredentialFactory,
};
use vaultpair_config::{
    AccessMethod, FacadeSettings, VaultAccessPolicy, VaultAccessType, VaultsConfig,
};
use vaultpair_core::{Backends, CancellationToken, VaultFacade};

pub const PRINCIPAL: &str = "deployer@contoso.com";

pub struct Harness {
    pub east: Arc<InMemoryRegion>,
    pub west: Arc<InMemoryRegion>,
    pub factory: Arc<StaticCredentialFactory>,
    pub connector: Arc<InMemoryConnector>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_factory(StaticCredentialFactory::new(PRINCIPAL))
    }

    pub fn with_factory(factory: StaticCredentialFactory) -> Self {
        let east = InMemoryRegion::new("contoso-east");
        let west = InMemoryRegion::new("contoso-west");
        let connector = InMemoryConnector::new()
            .with_region(Arc::clone(&east))
            .with_region(Arc::clone(&west));
        Self {
            east,
            west,
            factory: Arc::new(factory),
            connector: Arc::new(connector),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            connector: self.connector.clone(),
            credentials: self.factory.clone(),
            identities: Arc::new(InMemoryIdentityStore::new()),
        }
    }

    pub async fn connect(&self, names: &[&str]) -> VaultFacade {
        VaultFacade::connect(
            vaults(),
            &settings(names),
            self.backends(),
            &CancellationToken::new(),
        )
        .await
        .expect("facade should connect")
    }

    pub async fn both(&self) -> VaultFacade {
        self.connect(&["contoso-east", "contoso-west"]).await
    }
}

pub fn policy(app: &str) -> VaultAccessPolicy {
    VaultAccessPolicy {
        read_only: vec![AccessMethod::client_secret(
            1,
            "tenant",
            format!("{}-reader", app),
            "reader-secret",
        )],
        read_write: vec![
            AccessMethod::client_certificate(1, "tenant", format!("{}-cert", app), "ABCDEF"),
            AccessMethod::client_secret(2, "tenant", format!("{}-writer", app), "writer-secret"),
        ],
    }
}

pub fn vaults() -> VaultsConfig {
    VaultsConfig::new()
        .with_vault("contoso-east", policy("east"))
        .with_vault("contoso-west", policy("west"))
}

pub fn settings(names: &[&str]) -> FacadeSettings {
    FacadeSettings::new(names.iter().copied(), VaultAccessType::ReadWrite)
        .with_delete_poll_interval(Duration::from_millis(1))
}
