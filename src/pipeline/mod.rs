//! Pipeline stages for archive-to-MDX conversion.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the orchestrator in [`crate::convert`] only wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! transform ──▶ fetch (per image) ──▶ assemble
//!  (HTML→MD)     (HTTP, redirects)     (metadata + body)
//! ```
//!
//! 1. [`transform`] — pure HTML → Markdown rules; delegates image URL
//!    handling to [`images`]
//! 2. [`images`]    — unwrap CDN proxy URLs, pick extensions, name files
//! 3. [`fetch`]     — the only stage with network I/O
//! 4. [`assemble`]  — render the final `page.mdx` text

pub mod assemble;
pub mod fetch;
pub mod images;
pub mod transform;
