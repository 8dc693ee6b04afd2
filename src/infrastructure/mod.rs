// Infrastructure layer - External dependencies and adapters
pub mod cache_store;
pub mod cloudnet_repository;
pub mod config;
pub mod grafana_repository;
pub mod http;
pub mod influx_repository;
