//! CTFd and Chall-Manager REST API client

pub mod challenges;
mod client;
pub mod common;
mod error;
pub mod instances;
pub mod tags;
pub mod topics;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, ClientConfig};
pub use error::ApiError;
