//! HTTP fetching for feed bodies.
//!
//! The rest of the crate treats HTTP as a black box: hand in a URL plus the
//! feed's stored credentials and cache validators, get back the effective
//! post-redirect URL, status, body, and fresh validators. TLS, proxying and
//! redirects all live behind this boundary.

mod client;

pub use client::{FeedFetcher, FetchError, FetchRequest, FetchedBody};
