// Mappers module
pub mod history;
pub mod response;
