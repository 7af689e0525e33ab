//! Autoscribe: Scheduled Content Generation
//!
//! Generates content items through a pair of model providers with a single fallback
//! hop, persists them, and spreads follow-up comments over a configurable window.
//! A scheduler drives both on independent cadences.

pub mod cli;
pub mod comments;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod media;
pub mod notify;
pub mod provider;
pub mod runtime;
pub mod scheduler;
pub mod status;
pub mod store;
