// Domain layer - Pure models and rules, no I/O
pub mod dashboard;
pub mod instrument;
pub mod instrument_cache;
pub mod statistics;
