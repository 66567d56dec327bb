//! # Simple Shrink
//!
//! A small image service: upload a photo, get back a lossy copy sized for the
//! web; later, ask for an upscaled copy restored to the original's exact
//! dimensions.
//!
//! # Architecture
//!
//! Everything lives in a date-bucketed tree on the local filesystem:
//!
//! ```text
//! storage/
//! └── 2024-05-01/
//!     ├── originals/beach.jpg            # as uploaded (rotated in place if asked)
//!     ├── shrunk/beach.webp              # area-averaged, lossy
//!     └── upscaled/upscaled_beach.jpg    # same size as the original
//! ```
//!
//! An image is addressed by its original filename (the *key*). Derivatives
//! are written into the bucket of the day they are produced, so an upscale
//! may land in a later bucket than its original; lookups search every bucket.
//!
//! Two operations drive everything:
//!
//! ```text
//! shrink   bytes ─▶ originals/<key> ─▶ shrunk/<stem>.webp
//! upscale  key   ─▶ originals/<key> (any day) ─▶ upscaled/upscaled_<key>
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Shrink, upscale and lookup orchestration |
//! | [`server`] | axum HTTP API and read-only static mount over the storage root |
//! | [`storage`] | Date buckets, subfolders, cross-bucket search |
//! | [`catalog`] | Advisory JSON record of written artifacts, used to break lookup ties |
//! | [`upscaler`] | [`Upscaler`](upscaler::Upscaler) trait: external AI tool, cubic fallback |
//! | [`imaging`] | Decode, rotate, resize and encode through the `image` and `webp` crates |
//! | [`naming`] | Key validation and derivative filenames |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Validate Before Writing
//!
//! Uploads are fully decoded in memory before the original is persisted, so a
//! request carrying something that is not an image leaves no file behind.
//!
//! ## Rotation Is Destructive
//!
//! A rotated shrink overwrites the stored original with the rotated pixels,
//! and upscales of that key see the rotated image. The rotation lasts until
//! the original is uploaded again: every shrink first stores the uploaded
//! bytes as they arrived.
//!
//! ## Upscaled Output Matches the Original
//!
//! AI upscalers typically produce 4x the input. Whatever the tool produced,
//! the result is resized back (Lanczos) to exactly the original's dimensions,
//! trading resolution for the tool's detail reconstruction. When the tool is
//! not installed the cubic fallback answers instead, so the endpoint always
//! works.

pub mod catalog;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod upscaler;
