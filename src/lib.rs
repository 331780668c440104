// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod cards;
pub mod catalog;
pub mod challenge;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod history;
pub mod item;
pub mod mistakes;
pub mod options;
pub mod report;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod ui;
pub mod util;
