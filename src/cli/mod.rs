//! Command-line interface for training and watching the predator

pub mod commands;
pub mod config;
pub mod output;
