pub mod annotation;
pub mod cli;
pub mod config;
pub mod doctors;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod session;
pub mod symptoms;
pub mod transport;
