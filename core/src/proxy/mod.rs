//! Proxy module - chat API in front of the LM Studio inference endpoint

pub mod config;
pub mod errors;
pub mod server;
pub mod handlers;
pub mod mappers;
pub mod upstream;

pub use config::ProxyConfig;
pub use errors::InferenceError;
pub use mappers::history::ConversationTurn;
pub use server::ProxyServer;
pub use upstream::InferenceClient;
