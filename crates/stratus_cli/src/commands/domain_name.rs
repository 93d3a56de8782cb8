//! Domain name simulate command implementation.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use stratus_provider::{
    DomainNameConfig, DomainNameResource, DomainNameState, InMemoryDomainNameApi, ProviderConfig,
};
use stratus_wait::CancelToken;

/// States observed during a simulated lifecycle.
#[derive(Debug, Serialize)]
pub struct LifecycleReport {
    /// State after create.
    pub created: DomainNameState,
    /// State after update, if one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DomainNameState>,
    /// Whether the domain was deleted at the end.
    pub deleted: bool,
    /// API calls made, in order.
    pub calls: Vec<String>,
}

/// Runs the domain name simulate command.
pub fn run(
    resource: &Path,
    update: Option<&Path>,
    config: Option<&Path>,
    updating_reads: u32,
    keep: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = match config {
        Some(path) => ProviderConfig::from_file(path)?,
        None => ProviderConfig::default(),
    };
    let desired = load_resource(resource)?;
    let replacement = update.map(load_resource).transpose()?;

    let report = simulate(provider, &desired, replacement.as_ref(), updating_reads, keep)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn load_resource(path: &Path) -> Result<DomainNameConfig, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("reading resource from {}: {e}", path.display()))?;
    let config: DomainNameConfig = serde_json::from_str(&json)
        .map_err(|e| format!("parsing resource in {}: {e}", path.display()))?;
    Ok(config)
}

/// Runs create, an optional update, and delete against an in-memory API.
pub fn simulate(
    provider: ProviderConfig,
    desired: &DomainNameConfig,
    replacement: Option<&DomainNameConfig>,
    updating_reads: u32,
    keep: bool,
) -> Result<LifecycleReport, Box<dyn std::error::Error>> {
    let api = Arc::new(
        InMemoryDomainNameApi::new()
            .with_updating_reads(updating_reads)
            .with_region(provider.region.clone()),
    );
    let handler = DomainNameResource::new(Arc::clone(&api), provider);
    let cancel = CancelToken::new();

    tracing::info!(domain_name = %desired.domain_name, "creating domain name");
    let created = handler.create(desired, &cancel)?;

    let updated = match replacement {
        Some(next) => {
            tracing::info!(domain_name = %next.domain_name, "updating domain name");
            Some(handler.update(&created, next, &cancel)?)
        }
        None => None,
    };

    if !keep {
        tracing::info!(domain_name = %created.id, "deleting domain name");
        handler.delete(&created.id)?;
    }

    Ok(LifecycleReport {
        created,
        updated,
        deleted: !keep,
        calls: api.calls(),
    })
}
