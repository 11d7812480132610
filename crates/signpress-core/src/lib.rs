//! Signature finalization engine
//!
//! Takes the signature marks placed on a document (percentage-based
//! positions, arbitrary page targets, base64 raster payloads) and burns
//! them into the page content of a fresh output PDF, leaving the source
//! untouched. Two pieces do the work:
//!
//! - [`coords`]: resolves a mark's page-relative percentages into an
//!   absolute placement rectangle for the target page's native size.
//! - [`compositor`]: opens the source, decodes each payload, draws the
//!   image plus its underline and signer caption, and serializes a
//!   compacted output file.
//!
//! [`finalize`] wraps the engine in the caller-level guards and audit
//! emission; [`paths`] holds the on-disk layout helpers. Each call is
//! self-contained: no shared state exists between compositions, and a
//! failed call never leaves a partial output file.

pub mod compositor;
pub mod coords;
pub mod document;
pub mod error;
pub mod finalize;
pub mod paths;
pub mod payload;

pub use compositor::{compose, Composition};
pub use coords::{resolve, PageSize, PlacementRect};
pub use document::SourceDocument;
pub use error::{ComposeError, FinalizeError};
pub use finalize::{FinalizeOutcome, FinalizeRequest};
