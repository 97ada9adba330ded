//! **Web Tools**: `fetch_url`
//!
//! Gated behind the `web-tools` Cargo feature flag:
//!
//! ```toml
//! # cli/Cargo.toml (enabled by default for end users)
//! [features]
//! default = ["web-tools"]
//! web-tools = ["toolflow-infrastructure/web-tools"]
//! ```
//!
//! Only `http` and `https` URLs are fetched, and the response body is capped.

mod fetch;

pub use fetch::{DEFAULT_MAX_BODY_SIZE, FETCH_URL, FetchUrl, fetch_url_definition};
