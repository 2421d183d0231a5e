pub mod config;
pub mod error;
pub mod job;
pub mod llm;
pub mod pipeline;
pub mod rewrite;
pub mod table;
pub mod tui;
