//! Client for a blog API's article feed, search, and categories.
//!
//! [`blog::BlogService`] keeps a growing browse window and a search result
//! set, switches between them based on the active [`blog::SearchCriteria`],
//! and publishes the result through [`observable::Observable`] channels. The
//! category list is fetched once and handed from a server-side render to the
//! client process through a [`transfer::TransferState`] payload.

pub mod api;
pub mod blog;
pub mod config;
pub mod observable;
pub mod present;
pub mod transfer;
