pub mod mirror;
pub mod models;
pub mod settings;
