pub mod auth_service;
pub mod contractor_service;
pub mod invoice;
pub mod notifier;
pub mod order_service;
pub mod order_validation;
pub mod token_service;
