use tracing::{debug, warn};

use fl_core::types::{Reference, UnitContext};
use fl_integrations::github::client::GitHubClient;
use fl_integrations::github::repos::{fetch_repository_index, RepositoryIndex};

use crate::features::GroupSettings;

/// Completes references written without an organisation using the group's
/// default organisation and that organisation's repository index.
#[derive(Debug, Clone)]
pub struct OrganisationResolver {
    client: GitHubClient,
}

impl OrganisationResolver {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    /// Qualified references pass through. Unqualified ones are completed or
    /// dropped; order is preserved.
    pub async fn resolve(
        &self,
        settings: &dyn GroupSettings,
        ctx: &UnitContext,
        references: Vec<Reference>,
    ) -> Vec<Reference> {
        if references.iter().all(Reference::is_qualified) {
            return references;
        }

        let Some(organisation) = settings.default_organisation(ctx).await else {
            debug!(unit_id = ctx.unit_id, "no default organisation, dropping unqualified references");
            return references.into_iter().filter(Reference::is_qualified).collect();
        };
        let index = self.index_for(&organisation).await;

        references
            .into_iter()
            .filter_map(|reference| {
                if reference.is_qualified() {
                    return Some(reference);
                }
                let canonical = index.as_ref()?.canonical(reference.repository());
                match canonical {
                    Some(name) => Some(reference.qualify(organisation.as_str(), name)),
                    None => {
                        debug!(%reference, %organisation, "repository not found for organisation");
                        None
                    }
                }
            })
            .collect()
    }

    async fn index_for(&self, organisation: &str) -> Option<RepositoryIndex> {
        match fetch_repository_index(&self.client, organisation).await {
            Ok(index) => Some(index),
            Err(err) => {
                warn!(organisation, error = %err, "could not fetch repository index");
                None
            }
        }
    }
}
