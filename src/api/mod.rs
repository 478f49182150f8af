//! HTTP access to the blog API.
//!
//! - [`client`] - typed `GET` requests against the configured API root
//! - [`operators`] - retry and fallback combinators layered on top of a request
//!
//! A request is described by a closure that builds a fresh future on every
//! call, so [`operators::retry`] can re-run it without the caller keeping any
//! state between attempts.
//!
//! # Example
//!
//! ```ignore
//! use blogfeed::api::{or_fallback, retry, ApiClient};
//!
//! let client = ApiClient::new("http://127.0.0.1:8999")?;
//! let result = retry(3, "categories", || client.get::<Vec<Category>>("categories", "/category", &[])).await;
//! let categories = or_fallback("categories", result, Vec::new());
//! ```

mod client;
mod operators;

pub use client::{ApiClient, ApiError};
pub use operators::{or_fallback, retry};
