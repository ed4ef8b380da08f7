pub mod adapter;
pub mod config;
pub mod handler;
pub mod models;
pub mod settings;
