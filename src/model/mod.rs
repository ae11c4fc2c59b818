pub mod apperror;
pub mod config;
pub mod dashboard;
pub mod documents;
pub mod enums;
pub mod fleet;
pub mod models;
pub mod operations;
pub mod personnel;
pub mod registry;
pub mod validation;
