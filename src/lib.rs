pub mod audit;
pub mod cli;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod execution;
pub mod logging;
pub mod manager;
pub mod profile;
pub mod resources;
