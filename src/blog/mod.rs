//! Blog article feed and search.
//!
//! [`BlogService`] owns the browse feed, the search results, and the category
//! list, and publishes them as [`crate::observable::Observable`] channels:
//!
//! - [`pagination`] - the growing browse window and its exhaustion check
//! - [`criteria`] - search filters and the browse/search mode they select
//! - [`service`] - the service itself
//!
//! # Example
//!
//! ```ignore
//! let service = BlogService::new(client, transfer, ServiceOptions::default());
//! service.request_list(None).await; // first browse page
//!
//! service.update_criteria(SearchCriteria::title("rust"));
//! service.request_list(Some(SearchCriteria::title("rust"))).await; // search
//! ```

mod criteria;
mod pagination;
mod service;
mod types;

pub use criteria::{Mode, SearchCriteria};
pub use pagination::PaginationCursor;
pub use service::{BlogService, ServiceOptions, CATEGORIES_KEY};
pub use types::{Article, Category, TitleSuggestion};
