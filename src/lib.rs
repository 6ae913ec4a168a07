pub mod banner;
pub mod cli;
pub mod clients;
pub mod compose;
pub mod config;
pub mod consts;
pub mod error;
pub mod prompts;
pub mod retry;
pub mod runner;
