pub mod config;
pub mod modules;
