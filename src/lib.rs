//! push-relay: validates incoming push notification requests and relays
//! them to Firebase Cloud Messaging, returning the per-token outcome.

pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod requests;
pub mod services;
pub mod startup;
