//! ID resolver module
//!
//! Resolves job ID prefixes against the owner's active jobs, so running jobs
//! can be named by a short prefix. Finished jobs need their full ID.

use anyhow::{Context, Result, anyhow};
use mealplan_client::OrchestratorClient;
use mealplan_core::dto::job::PendingQuery;
use uuid::Uuid;

use crate::types::IdOrPrefix;

pub async fn resolve_job_id(client: &OrchestratorClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    let prefix = match id_or_prefix {
        IdOrPrefix::Full(uuid) => return Ok(*uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let pending = client
        .list_pending(&PendingQuery::default())
        .await
        .context("Failed to fetch active jobs for ID resolution")?;

    let matches: Vec<Uuid> = pending
        .active
        .iter()
        .map(|job| job.id)
        .filter(|id| id.to_string().starts_with(prefix.as_str()))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No active job found with ID starting with '{}'",
            prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}
