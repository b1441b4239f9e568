//! C3: file-backed service registry with HTTP health probing.

pub mod client;
pub mod error;

pub use client::RegistryClient;
pub use error::{RegistryError, RegistryResult};
