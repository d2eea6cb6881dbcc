pub mod action;
pub mod arguments;
pub mod batch;
pub mod cli;
pub mod config;
pub mod connection;
pub mod database;
pub mod package;
pub mod state;
pub mod tables;
pub mod utils;
