// Application layer - Use cases and repository ports
pub mod catalog_repository;
pub mod dashboard_repository;
pub mod dashboard_service;
pub mod instruments_service;
pub mod stats_service;
pub mod telemetry_repository;
