//! Caller-level finalize flow
//!
//! Finalizing is the action that turns a document's accumulated marks
//! into the signed output file and moves the document to its terminal
//! state. This module owns the guards and the audit emission; persisting
//! the returned outcome (path + status) is the storage layer's job.

use std::path::PathBuf;

use serde::Serialize;
use tracing::error;

use signpress_types::{
    AuditAction, AuditEvent, DocumentRecord, DocumentStatus, EventSink, SignatureMark,
};

use crate::compositor;
use crate::error::FinalizeError;
use crate::paths;

/// Everything the finalize flow needs from its caller.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub document: DocumentRecord,
    /// Marks in placement order, as read back from storage.
    pub marks: Vec<SignatureMark>,
    pub actor_email: Option<String>,
    /// Base directory for signed output, usually [`paths::upload_dir`].
    pub output_base: PathBuf,
}

/// What the caller persists after a successful finalize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizeOutcome {
    pub signed_file_path: PathBuf,
    /// Always [`DocumentStatus::Signed`]; carried so the caller persists
    /// the transition it was handed rather than assuming one.
    pub status: DocumentStatus,
    pub signatures_embedded: usize,
}

/// Embed all marks for a document and report the terminal state.
///
/// The compositor's diagnostic detail is logged for operators only;
/// callers see the generic [`FinalizeError::Pdf`], which is what the
/// request layer forwards to clients.
pub fn run(
    request: &FinalizeRequest,
    sink: &mut dyn EventSink,
) -> Result<FinalizeOutcome, FinalizeError> {
    let document = &request.document;

    if document.status == DocumentStatus::Signed {
        return Err(FinalizeError::AlreadyFinalized);
    }
    if request.marks.is_empty() {
        return Err(FinalizeError::NoSignatures);
    }

    let output_path = paths::signed_output_path(&request.output_base, &document.id, &document.filename);

    let composition = compositor::compose(&document.file_path, &output_path, &request.marks)
        .map_err(|e| {
            error!(document = %document.id, error = %e, "PDF embedding error");
            FinalizeError::Pdf
        })?;

    sink.append(AuditEvent::new(
        &document.id,
        AuditAction::Finalized {
            signatures: request.marks.len(),
        },
        request.actor_email.as_deref(),
        Some(format!(
            "Document finalized with {} signature(s)",
            request.marks.len()
        )),
    ));

    Ok(FinalizeOutcome {
        signed_file_path: composition.output_path,
        status: DocumentStatus::Signed,
        signatures_embedded: composition.applied,
    })
}
