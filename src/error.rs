//! Error types shared by every stage of label generation.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LabelError>;

/// Failures raised while turning orders into label documents.
///
/// Per-order variants (`InvalidOrder`, `Render`, `Cancelled`,
/// `BudgetExceeded`) are isolated by batch generation and reported in the
/// batch failure list. Sink-level variants abort the call immediately.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The order lacks a field required to print a label.
    #[error("order {order_id} cannot be labelled: {reason}")]
    InvalidOrder { order_id: String, reason: String },

    /// Template population or rasterization failed.
    #[error("label rendering failed: {0}")]
    Render(String),

    /// Batch generation was called without any orders.
    #[error("batch label generation requires at least one order")]
    EmptyBatch,

    /// Every order of a batch failed, so no document could be produced.
    #[error("none of the {} batch orders produced a label", .failures.len())]
    NothingRendered { failures: Vec<LabelFailure> },

    /// The caller cancelled the batch before this order was reached.
    #[error("batch cancelled before this order was rendered")]
    Cancelled,

    /// The batch wall-clock budget ran out before this order was reached.
    #[error("batch time budget exhausted before this order was rendered")]
    BudgetExceeded,

    /// The print surface could not be opened.
    #[error("print surface could not be opened: {0}")]
    PopupBlocked(String),

    /// The download or print destination rejected the document.
    #[error("output sink failed: {0}")]
    OutputSink(String),

    /// The PDF writer failed to serialize the assembled document.
    #[error("PDF serialization failed: {0}")]
    Pdf(String),

    /// The vector print document could not be built, usually for lack of fonts.
    #[error("print document failed: {0}")]
    Fonts(#[from] genpdf::error::Error),

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LabelError {
    pub(crate) fn invalid_order(order_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOrder {
            order_id: order_id.to_owned(),
            reason: reason.into(),
        }
    }

    /// Returns whether the error only concerns a single order and may be
    /// skipped by batch generation.
    pub fn is_per_order(&self) -> bool {
        matches!(
            self,
            Self::InvalidOrder { .. } | Self::Render(_) | Self::Cancelled | Self::BudgetExceeded
        )
    }
}

/// A batch order that did not make it into the assembled document.
#[derive(Debug)]
pub struct LabelFailure {
    /// Identifier of the source order.
    pub order_id: String,
    /// Why the order was skipped.
    pub reason: LabelError,
}

impl LabelFailure {
    pub(crate) fn new(order_id: impl Into<String>, reason: LabelError) -> Self {
        Self {
            order_id: order_id.into(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_order_errors_are_distinguished_from_sink_errors() {
        assert!(LabelError::invalid_order("a", "no items").is_per_order());
        assert!(LabelError::Render("detached".into()).is_per_order());
        assert!(LabelError::BudgetExceeded.is_per_order());
        assert!(!LabelError::EmptyBatch.is_per_order());
        assert!(!LabelError::OutputSink("disk full".into()).is_per_order());
        assert!(!LabelError::PopupBlocked("no lp".into()).is_per_order());
    }

    #[test]
    fn nothing_rendered_reports_failure_count() {
        let err = LabelError::NothingRendered {
            failures: vec![
                LabelFailure::new("a", LabelError::Cancelled),
                LabelFailure::new("b", LabelError::Cancelled),
            ],
        };
        assert_eq!(err.to_string(), "none of the 2 batch orders produced a label");
    }
}
