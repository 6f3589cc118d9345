pub mod access;
pub mod credentials;
pub mod data;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod session;
pub mod tools;
