pub mod args;
pub mod config;
pub mod generator;
pub mod media;
pub mod processor;
pub mod record;
