pub mod assemble;
pub mod classify;
pub mod config;
pub mod fallback;
pub mod ingest;
pub mod justification;
pub mod matcher;
pub mod models;
pub mod ollama;
pub mod pipeline;
pub mod section;
pub mod server;
pub mod similarity;
pub mod table;
pub mod text;

pub use config::AppConfig;
pub use pipeline::PolicyAnalyzer;
pub use server::run_server;
