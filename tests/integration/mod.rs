//! Integration tests for the content automation engine

mod support;

mod config_integration;
mod content_pipeline;
mod provider_clients;
mod scheduler;
