//! The library code for the `oven` static blog baker. The architecture can be
//! generally broken down into three distinct steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`],
//!    [`crate::post`])
//! 2. Ordering the posts chronologically and linking each one to its
//!    neighbors ([`crate::collection`])
//! 3. Rendering the linked pages through the theme templates and writing
//!    them to disk ([`crate::write`], [`crate::feed`])
//!
//! The first step carries most of the logic. A post file optionally begins
//! with a header block of `key: value` lines between two separator lines
//! (`---` or `***`), and its title comes from the `title` header or else from
//! the first Markdown heading. The parser only records where the body begins;
//! the body itself is read again when the page is rendered. The `created`
//! header is resolved against a list of common date layouts
//! ([`crate::date`]), falling back to the file's modification time.
//!
//! Each post page is named after its slugified title ([`crate::slug`]) and
//! carries links to the previous and next post; an index page lists every
//! post, and an Atom feed is written alongside.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collection;
pub mod config;
pub mod date;
pub mod feed;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod slug;
pub mod theme;
pub mod write;
