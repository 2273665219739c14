pub mod cli;
pub mod config;
pub mod error;
pub mod init;
pub mod models;
pub mod repository;
pub mod services;
pub mod session;
pub mod utils;

pub use error::ScrivoError;
