pub mod auth;
pub mod contractors;
pub mod orders;
