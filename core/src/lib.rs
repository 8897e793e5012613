//! LIA Core Library
//! Inference proxy client, configuration and chat HTTP API for the LIA voice assistant

pub mod config;
pub mod prompt;
pub mod proxy;
