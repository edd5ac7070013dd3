use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

use fl_core::types::{same_reference_set, DisplayHandle, Reference, ResolvedItem, UnitContext, UnitId};
use fl_integrations::github::cache::SweepSchedule;
use fl_integrations::github::items::ItemResolver;

use crate::features::FeatureSet;
use crate::render::{Presentation, SummaryBuilder};
use crate::toggle::ToggleState;

/// What is currently shown for one text unit.
#[derive(Debug, Clone)]
pub struct DisplayRecord {
    pub display_handle: DisplayHandle,
    pub reference_set: Vec<Reference>,
    pub toggle_state: Option<ToggleState>,
    expires_at: Instant,
}

impl DisplayRecord {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum ReconcileAction {
    /// Leave the display alone.
    NoChange,
    /// Replace the display's content and controls.
    Replace {
        items: Vec<ResolvedItem>,
        toggle: Option<ToggleState>,
        presentation: Presentation,
    },
    /// Nothing left to show; the host may blank or delete the display.
    Clear,
}

/// Owns the unit → display table and decides how a display follows edits
/// to its unit.
#[derive(Debug)]
pub struct DisplayReconciler {
    records: DashMap<UnitId, DisplayRecord>,
    resolver: ItemResolver,
    summary: SummaryBuilder,
    max_references: usize,
    ttl: Duration,
    sweeps: SweepSchedule,
}

impl DisplayReconciler {
    pub fn new(
        resolver: ItemResolver,
        summary: SummaryBuilder,
        max_references: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            records: DashMap::new(),
            resolver,
            summary,
            max_references,
            ttl,
            sweeps: SweepSchedule::new(ttl),
        }
    }

    /// Record the first render for a unit, replacing any earlier record.
    pub fn present(
        &self,
        unit_id: UnitId,
        display_handle: DisplayHandle,
        reference_set: Vec<Reference>,
        toggle_state: Option<ToggleState>,
    ) -> DisplayRecord {
        let record = DisplayRecord {
            display_handle,
            reference_set,
            toggle_state,
            expires_at: Instant::now() + self.ttl,
        };
        info!(
            unit_id,
            handle = %record.display_handle,
            references = record.reference_set.len(),
            "display presented"
        );
        self.records.insert(unit_id, record.clone());
        self.sweep_expired();
        record
    }

    /// Live record for `unit_id`. Expired records are removed on sight.
    pub fn get(&self, unit_id: UnitId) -> Option<DisplayRecord> {
        let record = self.records.get(&unit_id).map(|r| r.clone())?;
        if record.is_live() {
            Some(record)
        } else {
            if self.records.remove_if(&unit_id, |_, r| !r.is_live()).is_some() {
                debug!(unit_id, "display record expired");
            }
            None
        }
    }

    pub fn forget(&self, unit_id: UnitId) -> Option<DisplayRecord> {
        self.records.remove(&unit_id).map(|(_, record)| record)
    }

    /// Store the toggle state of the display behind `handle`. Returns whether
    /// a live record was found.
    pub fn set_toggle(&self, handle: &DisplayHandle, state: ToggleState) -> bool {
        let Some(mut record) = self
            .records
            .iter_mut()
            .find(|r| &r.display_handle == handle && r.is_live())
        else {
            return false;
        };
        record.toggle_state = Some(state);
        record.expires_at = Instant::now() + self.ttl;
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decide how the display of `ctx.unit_id` follows an edit whose text
    /// now yields `new_references`.
    pub async fn reconcile(
        &self,
        ctx: &UnitContext,
        new_references: Vec<Reference>,
        features: FeatureSet,
    ) -> ReconcileAction {
        let unit_id = ctx.unit_id;
        let Some(record) = self.get(unit_id) else {
            return ReconcileAction::NoChange;
        };

        if new_references.len() > self.max_references {
            debug!(unit_id, count = new_references.len(), "edit over the reference cap ignored");
            return ReconcileAction::NoChange;
        }
        if same_reference_set(&record.reference_set, &new_references) {
            return ReconcileAction::NoChange;
        }
        if new_references.is_empty() {
            info!(unit_id, "all references removed, clearing display");
            let toggle = record.toggle_state;
            self.store(unit_id, record, Vec::new(), toggle);
            return ReconcileAction::Clear;
        }

        let mut items: Vec<ResolvedItem> = self
            .resolver
            .resolve_all(&new_references, features.discussion_fallback)
            .await
            .into_iter()
            .filter_map(|outcome| outcome.resolved())
            .collect();
        if items.is_empty() {
            info!(unit_id, "no reference resolved, clearing display");
            let toggle = record.toggle_state;
            self.store(unit_id, record, new_references, toggle);
            return ReconcileAction::Clear;
        }

        let toggle = match (record.toggle_state, items.len()) {
            (Some(previous), 1) => Some(ToggleState {
                owner_id: ctx.author_id,
                expanded: previous.expanded,
            }),
            (None, 1) if features.expand_single_item => Some(ToggleState {
                owner_id: ctx.author_id,
                expanded: false,
            }),
            _ => None,
        };
        if items.len() > 1 {
            items = items.into_iter().map(ResolvedItem::without_payload).collect();
        }

        let expand = toggle.is_some_and(|t| t.expanded);
        let presentation = self.summary.present(&items, expand, ctx.author_id, toggle);
        info!(unit_id, items = items.len(), expand, "display replaced");
        self.store(unit_id, record, new_references, toggle);

        ReconcileAction::Replace {
            items,
            toggle,
            presentation,
        }
    }

    fn store(
        &self,
        unit_id: UnitId,
        previous: DisplayRecord,
        reference_set: Vec<Reference>,
        toggle_state: Option<ToggleState>,
    ) {
        self.records.insert(
            unit_id,
            DisplayRecord {
                display_handle: previous.display_handle,
                reference_set,
                toggle_state,
                expires_at: Instant::now() + self.ttl,
            },
        );
        self.sweep_expired();
    }

    /// Drop every expired record, at most once per sweep interval.
    fn sweep_expired(&self) {
        if !self.sweeps.due() {
            return;
        }
        let before = self.records.len();
        self.records.retain(|_, record| record.is_live());
        let swept = before.saturating_sub(self.records.len());
        if swept > 0 {
            debug!(swept, "expired display records swept");
        }
    }
}
