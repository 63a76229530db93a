pub mod ads;
pub mod app;
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod controller;
pub mod navigation;
pub mod results;
pub mod runtime;
pub mod session;
pub mod store;
pub mod timers;
pub mod ui;
