use std::collections::HashSet;

use async_trait::async_trait;

use fl_core::types::{Feature, UnitContext};

/// Per-group settings the linker consults. Backed by whatever store the host
/// keeps group configuration in.
#[async_trait]
pub trait GroupSettings: Send + Sync {
    /// Organisation assumed for references written without one.
    async fn default_organisation(&self, ctx: &UnitContext) -> Option<String>;

    async fn has_feature(&self, ctx: &UnitContext, feature: Feature) -> bool;
}

// ---------------------------------------------------------------------------
// FeatureSet
// ---------------------------------------------------------------------------

/// Feature switches resolved once at the start of an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub discussion_fallback: bool,
    pub full_url_links: bool,
    pub expand_single_item: bool,
}

impl FeatureSet {
    pub async fn resolve(settings: &dyn GroupSettings, ctx: &UnitContext) -> Self {
        let mut set = Self::default();
        for feature in Feature::ALL {
            if settings.has_feature(ctx, feature).await {
                set = set.with(feature);
            }
        }
        set
    }

    pub fn with(mut self, feature: Feature) -> Self {
        match feature {
            Feature::DiscussionFallback => self.discussion_fallback = true,
            Feature::FullUrlLinks => self.full_url_links = true,
            Feature::ExpandSingleItem => self.expand_single_item = true,
        }
        self
    }

    pub fn contains(&self, feature: Feature) -> bool {
        match feature {
            Feature::DiscussionFallback => self.discussion_fallback,
            Feature::FullUrlLinks => self.full_url_links,
            Feature::ExpandSingleItem => self.expand_single_item,
        }
    }
}

// ---------------------------------------------------------------------------
// StaticSettings
// ---------------------------------------------------------------------------

/// Same answer for every unit. Used by the CLI, where there is no group.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    default_organisation: Option<String>,
    features: HashSet<Feature>,
}

impl StaticSettings {
    pub fn new(default_organisation: Option<String>) -> Self {
        Self {
            default_organisation,
            features: HashSet::new(),
        }
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }
}

#[async_trait]
impl GroupSettings for StaticSettings {
    async fn default_organisation(&self, _ctx: &UnitContext) -> Option<String> {
        self.default_organisation.clone()
    }

    async fn has_feature(&self, _ctx: &UnitContext, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}
