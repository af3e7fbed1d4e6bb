pub mod cache;
pub mod cli;
pub mod errors;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod settings;
