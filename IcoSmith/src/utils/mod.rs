pub mod budget;
pub mod error;
pub mod settings;
