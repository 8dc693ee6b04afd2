// Presentation layer - Command line surface
pub mod cli;
pub mod commands;
pub mod logging;
