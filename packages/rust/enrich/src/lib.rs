//! Enrichment modules and the API clients they use.
//!
//! This crate provides:
//! - [`EnrichmentModule`]: the contract every provider implements
//! - [`build_modules`]: the ordered, toggle-aware module chain, each module
//!   built from a shared [`ModuleContext`]
//! - [`providers`]: concrete modules (website scrapers, search, AI, heuristics)
//! - [`SearchClient`] / [`AiClient`]: Serper and chat-completions clients

pub mod ai;
pub mod http;
pub mod module;
pub mod providers;
pub mod search;

pub use ai::AiClient;
pub use http::PageFetcher;
pub use module::{EnrichmentModule, FromContext, ModuleContext, build_modules, register_chain};
pub use search::{NewsItem, SearchClient, SearchHit};
