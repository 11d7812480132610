//! Error types for the finalization engine

use thiserror::Error;

/// Failures the compositor can report.
///
/// The compositor never panics and never leaves a partial output file:
/// every fault in the open/iterate/save pipeline is mapped onto one of
/// these variants. Skipped marks (empty payload, out-of-range page) are
/// not errors and are only counted.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// Source PDF missing, unreadable, or not a valid PDF.
    #[error("Failed to open source PDF: {0}")]
    SourceOpen(String),

    /// A mark's payload is not valid base64, or not a decodable raster
    /// image at draw time. Treated as corruption: aborts the whole call.
    #[error("Failed to decode signature payload: {0}")]
    PayloadDecode(String),

    /// Writing or compacting the output file failed.
    #[error("Failed to write output PDF: {0}")]
    Serialization(String),

    /// Any other fault during the pipeline.
    #[error("Composition failed: {0}")]
    Unclassified(String),
}

/// Failures of the caller-level finalize flow.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FinalizeError {
    #[error("Document is already finalized")]
    AlreadyFinalized,

    #[error("No signatures found to embed")]
    NoSignatures,

    /// Client-safe wrapper for any compositor failure. The underlying
    /// reason is logged for operators, never surfaced to callers.
    #[error("PDF generation failed")]
    Pdf,
}
