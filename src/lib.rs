pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod exit;
pub mod logs;
pub mod progress;
pub mod rules;
pub mod session;
pub mod target;
pub mod tui;
pub mod ui;
