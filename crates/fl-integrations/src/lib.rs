//! Forge-facing half of forgelink: the HTTP transport seam, the conditional
//! fetch cache that sits in front of it, and the item/repository lookups
//! built on top.

pub mod github;
