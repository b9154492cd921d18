pub mod archive;
pub mod cache;
pub mod config;
pub mod loader;
pub mod package;
pub mod pipeline;
pub mod problem;
pub mod registry;
pub mod resolver;
pub mod runtime;
