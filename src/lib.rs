// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod auth;
pub mod config;
pub mod exam;
pub mod history;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod texts;
pub mod ui;
