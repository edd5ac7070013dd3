use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};

use fl_core::config::Config;
use fl_core::types::{ActorId, DisplayHandle, FetchOutcome, Reference, ResolvedItem, UnitContext, UnitId};
use fl_integrations::github::cache::CacheStats;
use fl_integrations::github::client::GitHubClient;
use fl_integrations::github::items::ItemResolver;
use fl_integrations::github::transport::HttpTransport;
use fl_telemetry::tracing_setup::{create_child_span, create_operation_span, generate_trace_id};

use crate::error::LinkError;
use crate::extract::ReferenceExtractor;
use crate::features::{FeatureSet, GroupSettings};
use crate::organisation::OrganisationResolver;
use crate::reconcile::{DisplayReconciler, DisplayRecord, ReconcileAction};
use crate::render::{Control, Presentation, SummaryBuilder};
use crate::toggle::{decide, ToggleDecision, ToggleState, ToggleToken, COLLAPSE_REFUSED};

// ---------------------------------------------------------------------------
// Draft / ToggleOutcome
// ---------------------------------------------------------------------------

/// A first render, ready for the host to deliver. Hand it back through
/// [`Linker::present`] once delivered.
#[derive(Debug, Clone)]
pub struct Draft {
    /// Every reference found in the unit, resolved or not.
    pub references: Vec<Reference>,
    pub items: Vec<ResolvedItem>,
    pub toggle: Option<ToggleState>,
    pub presentation: Presentation,
}

#[derive(Debug, Clone)]
pub enum ToggleOutcome {
    /// The actor may not perform this toggle.
    Refused { message: &'static str },
    /// Show this to the actor alone; the shared display is unchanged.
    Ephemeral(Presentation),
    /// Replace the shared display.
    Update {
        presentation: Presentation,
        token: ToggleToken,
    },
}

// ---------------------------------------------------------------------------
// Linker
// ---------------------------------------------------------------------------

/// Entry point for hosts: turns unit text into summaries and keeps those
/// summaries in step with edits and toggle presses.
pub struct Linker {
    client: GitHubClient,
    settings: Arc<dyn GroupSettings>,
    extractor: ReferenceExtractor,
    organisations: OrganisationResolver,
    resolver: ItemResolver,
    summary: SummaryBuilder,
    reconciler: DisplayReconciler,
}

impl Linker {
    pub fn new(config: Arc<Config>, client: GitHubClient, settings: Arc<dyn GroupSettings>) -> Self {
        let resolver = ItemResolver::new(client.clone());
        let summary = SummaryBuilder::new(config.clone());
        Self {
            settings,
            extractor: ReferenceExtractor::new(config.linking.max_references),
            organisations: OrganisationResolver::new(client.clone()),
            reconciler: DisplayReconciler::new(
                resolver.clone(),
                summary.clone(),
                config.linking.max_references,
                config.linking.record_ttl(),
            ),
            resolver,
            summary,
            client,
        }
    }

    /// Build a linker whose client reads its token from the environment
    /// variable named in `config.github.token_env`.
    pub fn from_config(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        settings: Arc<dyn GroupSettings>,
    ) -> Result<Self, LinkError> {
        let client = GitHubClient::from_env(&config.github, &config.cache, transport)?;
        Ok(Self::new(Arc::new(config), client, settings))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.client.cache().stats()
    }

    pub fn reconciler(&self) -> &DisplayReconciler {
        &self.reconciler
    }

    pub fn summary(&self) -> &SummaryBuilder {
        &self.summary
    }

    /// Extract and complete the references in `text`.
    async fn references(
        &self,
        text: &str,
        ctx: &UnitContext,
        features: FeatureSet,
    ) -> Result<Vec<Reference>, LinkError> {
        let extracted = self.extractor.extract(text, features.full_url_links)?;
        if extracted.is_empty() {
            return Ok(extracted);
        }
        Ok(self
            .organisations
            .resolve(self.settings.as_ref(), ctx, extracted)
            .await)
    }

    async fn resolve_batch(
        &self,
        trace_id: &str,
        references: &[Reference],
        features: FeatureSet,
    ) -> Vec<FetchOutcome> {
        self.resolver
            .resolve_all(references, features.discussion_fallback)
            .instrument(create_child_span(trace_id, "resolve_batch"))
            .await
    }

    /// Resolve every reference in `text`, failures included.
    pub async fn extract_and_resolve(
        &self,
        text: &str,
        ctx: &UnitContext,
    ) -> Result<Vec<FetchOutcome>, LinkError> {
        let (span, trace_id) = create_operation_span("extract_and_resolve", ctx.unit_id);
        self.run_extract_and_resolve(text, ctx, &trace_id)
            .instrument(span)
            .await
    }

    async fn run_extract_and_resolve(
        &self,
        text: &str,
        ctx: &UnitContext,
        trace_id: &str,
    ) -> Result<Vec<FetchOutcome>, LinkError> {
        let features = FeatureSet::resolve(self.settings.as_ref(), ctx).await;
        let references = self.references(text, ctx, features).await?;
        Ok(self.resolve_batch(trace_id, &references, features).await)
    }

    /// Build the first render for a unit. `Ok(None)` when nothing in the
    /// text resolves.
    pub async fn prepare(&self, text: &str, ctx: &UnitContext) -> Result<Option<Draft>, LinkError> {
        let (span, trace_id) = create_operation_span("prepare", ctx.unit_id);
        self.run_prepare(text, ctx, &trace_id).instrument(span).await
    }

    async fn run_prepare(
        &self,
        text: &str,
        ctx: &UnitContext,
        trace_id: &str,
    ) -> Result<Option<Draft>, LinkError> {
        let features = FeatureSet::resolve(self.settings.as_ref(), ctx).await;
        let references = self.references(text, ctx, features).await?;
        if references.is_empty() {
            return Ok(None);
        }

        let outcomes = self.resolve_batch(trace_id, &references, features).await;
        let (hints, mut items): (Vec<bool>, Vec<ResolvedItem>) = references
            .iter()
            .filter(|r| r.is_qualified())
            .zip(outcomes)
            .filter_map(|(reference, outcome)| {
                outcome.resolved().map(|item| (reference.expand_hint(), item))
            })
            .unzip();
        if items.is_empty() {
            debug!("no reference resolved");
            return Ok(None);
        }

        // Only the reference that resolved can ask for expansion.
        let hinted = hints == [true];
        let expand = hinted || features.expand_single_item;
        let toggle = (expand && items.len() == 1).then_some(ToggleState {
            owner_id: ctx.author_id,
            expanded: true,
        });
        if items.len() > 1 {
            items = items.into_iter().map(ResolvedItem::without_payload).collect();
        }

        let presentation = self.summary.present(&items, expand, ctx.author_id, toggle);
        info!(items = items.len(), expand, "draft prepared");
        Ok(Some(Draft {
            references,
            items,
            toggle,
            presentation,
        }))
    }

    /// Record that `draft` was delivered as `handle`.
    pub fn present(&self, unit_id: UnitId, handle: DisplayHandle, draft: &Draft) -> DisplayRecord {
        self.reconciler
            .present(unit_id, handle, draft.references.clone(), draft.toggle)
    }

    /// Follow an edit of a unit that already has a display.
    pub async fn reconcile_on_edit(&self, ctx: &UnitContext, new_text: &str) -> ReconcileAction {
        let (span, _trace_id) = create_operation_span("reconcile", ctx.unit_id);
        self.run_reconcile(ctx, new_text).instrument(span).await
    }

    async fn run_reconcile(&self, ctx: &UnitContext, new_text: &str) -> ReconcileAction {
        if self.reconciler.get(ctx.unit_id).is_none() {
            return ReconcileAction::NoChange;
        }
        let features = FeatureSet::resolve(self.settings.as_ref(), ctx).await;
        match self.references(new_text, ctx, features).await {
            Ok(references) => self.reconciler.reconcile(ctx, references, features).await,
            Err(err) => {
                debug!(error = %err, "edit not reconciled");
                ReconcileAction::NoChange
            }
        }
    }

    /// Drop the display record of a deleted unit.
    pub fn forget(&self, unit_id: UnitId) -> bool {
        self.reconciler.forget(unit_id).is_some()
    }

    /// Handle a press on a toggle control of the display behind `handle`.
    pub async fn toggle(
        &self,
        actor_id: ActorId,
        token: &str,
        handle: &DisplayHandle,
    ) -> Result<ToggleOutcome, LinkError> {
        let span = create_child_span(&generate_trace_id(), "toggle");
        self.run_toggle(actor_id, token, handle)
            .instrument(span)
            .await
    }

    async fn run_toggle(
        &self,
        actor_id: ActorId,
        token: &str,
        handle: &DisplayHandle,
    ) -> Result<ToggleOutcome, LinkError> {
        let token = decode_toggle(token)?;
        let decision = decide(&token.state, actor_id);
        if decision == ToggleDecision::Refuse {
            debug!(actor_id, owner_id = token.state.owner_id, "collapse refused");
            return Ok(ToggleOutcome::Refused {
                message: COLLAPSE_REFUSED,
            });
        }

        let expand = !token.state.expanded;
        let content = match self.resolver.resolve(&token.reference, true).await {
            FetchOutcome::Resolved(item) => self.summary.content(&[item], expand),
            failed => {
                warn!(reference = %token.reference, "toggled item no longer resolves");
                self.summary.compact(&[failed], true)
            }
        };

        if decision == ToggleDecision::Ephemeral {
            return Ok(ToggleOutcome::Ephemeral(Presentation {
                content,
                controls: Vec::new(),
            }));
        }

        let next = token.flipped(actor_id);
        if !self.reconciler.set_toggle(handle, next.state) {
            debug!(%handle, "no live record for toggled display");
        }
        info!(actor_id, expanded = next.state.expanded, "toggle flipped");
        Ok(ToggleOutcome::Update {
            presentation: Presentation {
                content,
                controls: toggle_controls(&next),
            },
            token: next,
        })
    }

    pub fn decode_toggle(&self, token: &str) -> Result<ToggleToken, LinkError> {
        decode_toggle(token)
    }

    pub fn encode_toggle(&self, token: &ToggleToken) -> String {
        encode_toggle(token)
    }
}

pub fn decode_toggle(token: &str) -> Result<ToggleToken, LinkError> {
    ToggleToken::decode(token)
}

/// Controls after a flip: the flipping actor owns both.
fn toggle_controls(token: &ToggleToken) -> Vec<Control> {
    vec![
        Control::Delete {
            owner_id: token.state.owner_id,
        },
        Control::Toggle {
            label: token.state.label().to_string(),
            token: token.encode(),
        },
    ]
}

pub fn encode_toggle(token: &ToggleToken) -> String {
    token.encode()
}

impl std::fmt::Debug for Linker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linker")
            .field("client", &self.client)
            .field("extractor", &self.extractor)
            .field("records", &self.reconciler.len())
            .finish()
    }
}
