//! Service layer: the cache and the analytics verbs exposed to the
//! conversational tool-calling layer.

pub mod cache;
pub mod analytics;
