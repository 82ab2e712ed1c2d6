pub mod cli;
pub mod code_to_pdf;
pub mod complexity;
pub mod config;
pub mod contract;
pub mod discover;
pub mod explain;
pub mod llm;
pub mod load_config;
pub mod markdown_pdf;
pub mod quiz;
pub mod report;
pub mod report_pdf;
pub mod sanitize;

pub use cli::{run, Cli, Commands};
