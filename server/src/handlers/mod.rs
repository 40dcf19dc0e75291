//! HTTP request handlers.

pub mod checkout;
pub mod events;
pub mod health;
