//! # styleweld - CSS inliner for HTML documents
//!
//! Moves the rules of `<style>` and `<link rel="stylesheet">` elements into
//! the `style` attributes of the elements they match, producing markup that
//! renders the same in clients that ignore stylesheets (e.g. email).
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - **dom**: html5ever-backed arena DOM, parsing and serialization
//! - **css**: cssparser-based stylesheet parsing and selector matching
//! - **network**: stylesheet fetchers, URL resolution and the shared cache
//! - **cascade**: ordering and merging of matched declarations
//! - **engine**: `CssInliner`, options, configuration and status codes
//! - **utils**: error types
//!
//! ```no_run
//! let html = r#"<html><head><style>h1 { color: blue }</style></head>
//! <body><h1>Big Text</h1></body></html>"#;
//! let inlined = styleweld::inline(html)?;
//! # Ok::<(), styleweld::InlineError>(())
//! ```

pub mod cascade;
pub mod css;
pub mod dom;
pub mod engine;
pub mod network;
pub mod utils;

// Re-export main types for convenience
pub use engine::{
    CssInliner, InlineConfig, InlineOptions, InlineStatus, StylesheetOrder, inline,
    inline_fragment,
};
pub use network::{FileFetcher, Fetcher, HttpFetcher, StylesheetCache};
pub use utils::error::{FetchError, InlineError, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "styleweld";
