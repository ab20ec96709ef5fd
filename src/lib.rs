pub mod app;
pub mod backend;
pub mod components;
pub mod config;
pub mod event;
pub mod types;
pub mod utils;
