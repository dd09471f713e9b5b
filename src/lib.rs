// src/lib.rs
// Library interface for ct-tail
pub mod cert_parser;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod error;
pub mod output;
