//! Signature mark records
//!
//! A mark is one signature placement request: which page, where on the
//! page (as percentages of the page dimensions), and the captured image
//! payload. The storage layer builds these from its rows before handing
//! them to the compositor.

use serde::{Deserialize, Serialize};

/// How a signature was captured by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureKind {
    Drawn,
    Typed,
    Image,
}

/// Default mark size, as percentages of the page dimensions.
///
/// These magnitudes read like pixel sizes carried over from a fixed-page
/// design, and a mark using them extends past any page edge. The stored
/// semantics are percentages and are preserved as such; correcting the
/// magnitudes is a product decision, not a rendering one.
pub const DEFAULT_WIDTH_PERCENT: f64 = 200.0;
pub const DEFAULT_HEIGHT_PERCENT: f64 = 80.0;

/// A single signature placement request for one page of a document.
///
/// Position and size are relative: percentages of the target page's
/// width and height, measured from the top-left corner. The same mark
/// therefore lands at the same relative spot on any page size.
/// `image_data` holds the base64 payload as captured, optionally still
/// carrying its `data:image/png;base64,` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureMark {
    /// 1-indexed target page.
    pub page_number: u32,
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
    pub kind: SignatureKind,
    pub image_data: Option<String>,
    pub signer_name: Option<String>,
    pub signer_email: Option<String>,
}

impl SignatureMark {
    /// Create a mark at the given position with the default size.
    pub fn new(page_number: u32, x_percent: f64, y_percent: f64) -> Self {
        Self {
            page_number,
            x_percent,
            y_percent,
            width_percent: DEFAULT_WIDTH_PERCENT,
            height_percent: DEFAULT_HEIGHT_PERCENT,
            kind: SignatureKind::Drawn,
            image_data: None,
            signer_name: None,
            signer_email: None,
        }
    }

    pub fn with_size(mut self, width_percent: f64, height_percent: f64) -> Self {
        self.width_percent = width_percent;
        self.height_percent = height_percent;
        self
    }

    pub fn with_kind(mut self, kind: SignatureKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_image_data(mut self, image_data: impl Into<String>) -> Self {
        self.image_data = Some(image_data.into());
        self
    }

    pub fn with_signer_name(mut self, signer_name: impl Into<String>) -> Self {
        self.signer_name = Some(signer_name.into());
        self
    }

    /// Whether this mark carries a payload the compositor can embed.
    pub fn has_payload(&self) -> bool {
        self.image_data.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Validate a mark's position and size.
///
/// Position must be a percentage in `[0, 100]`; size only has to be
/// positive and finite, since the documented defaults exceed 100.
pub fn validate_geometry(mark: &SignatureMark) -> Result<(), &'static str> {
    if !mark.x_percent.is_finite() || !mark.y_percent.is_finite() {
        return Err("Mark position must be finite");
    }
    if !(0.0..=100.0).contains(&mark.x_percent) {
        return Err("Mark X position must be a percentage in [0, 100]");
    }
    if !(0.0..=100.0).contains(&mark.y_percent) {
        return Err("Mark Y position must be a percentage in [0, 100]");
    }
    if !mark.width_percent.is_finite() || !mark.height_percent.is_finite() {
        return Err("Mark size must be finite");
    }
    if mark.width_percent <= 0.0 || mark.height_percent <= 0.0 {
        return Err("Mark size must be positive");
    }
    Ok(())
}

/// Validate a 1-indexed page number against a document's page count.
pub fn validate_page_number(page_number: u32, page_count: usize) -> Result<(), &'static str> {
    if page_number == 0 {
        return Err("Page numbers are 1-indexed");
    }
    if page_number as usize > page_count {
        return Err("Page number beyond end of document");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_size() {
        let mark = SignatureMark::new(1, 25.0, 75.0);
        assert_eq!(mark.page_number, 1);
        assert_eq!(mark.width_percent, DEFAULT_WIDTH_PERCENT);
        assert_eq!(mark.height_percent, DEFAULT_HEIGHT_PERCENT);
        assert_eq!(mark.kind, SignatureKind::Drawn);
        assert!(mark.image_data.is_none());
    }

    #[test]
    fn test_has_payload() {
        let mark = SignatureMark::new(1, 0.0, 0.0);
        assert!(!mark.has_payload());

        let mark = mark.with_image_data("");
        assert!(!mark.has_payload());

        let mark = mark.with_image_data("aGVsbG8=");
        assert!(mark.has_payload());
    }

    #[test]
    fn test_validate_geometry_accepts_defaults() {
        // The default 200/80 size is documented as percentages and must
        // pass validation even though it overflows the page.
        let mark = SignatureMark::new(1, 10.0, 10.0);
        assert!(validate_geometry(&mark).is_ok());
    }

    #[test]
    fn test_validate_geometry_rejects_out_of_range_position() {
        let mark = SignatureMark::new(1, 101.0, 10.0);
        assert!(validate_geometry(&mark).is_err());

        let mark = SignatureMark::new(1, 10.0, -0.5);
        assert!(validate_geometry(&mark).is_err());
    }

    #[test]
    fn test_validate_geometry_rejects_non_positive_size() {
        let mark = SignatureMark::new(1, 10.0, 10.0).with_size(0.0, 10.0);
        assert!(validate_geometry(&mark).is_err());

        let mark = SignatureMark::new(1, 10.0, 10.0).with_size(10.0, -4.0);
        assert!(validate_geometry(&mark).is_err());
    }

    #[test]
    fn test_validate_page_number() {
        assert!(validate_page_number(1, 5).is_ok());
        assert!(validate_page_number(5, 5).is_ok());
        assert_eq!(
            validate_page_number(0, 5),
            Err("Page numbers are 1-indexed")
        );
        assert_eq!(
            validate_page_number(6, 5),
            Err("Page number beyond end of document")
        );
    }

    #[test]
    fn test_serde_snake_case_kind() {
        let json = serde_json::to_string(&SignatureKind::Drawn).unwrap();
        assert_eq!(json, "\"drawn\"");
        let kind: SignatureKind = serde_json::from_str("\"typed\"").unwrap();
        assert_eq!(kind, SignatureKind::Typed);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: marks positioned anywhere in [0, 100] with positive
        /// finite size pass validation
        #[test]
        fn in_range_marks_are_valid(
            x in 0.0f64..=100.0,
            y in 0.0f64..=100.0,
            w in 0.01f64..500.0,
            h in 0.01f64..500.0,
        ) {
            let mark = SignatureMark::new(1, x, y).with_size(w, h);
            prop_assert!(validate_geometry(&mark).is_ok());
        }

        /// Property: positions outside [0, 100] are rejected
        #[test]
        fn out_of_range_positions_rejected(
            x in prop_oneof![-1000.0f64..-0.001, 100.001f64..1000.0],
            y in 0.0f64..=100.0,
        ) {
            let mark = SignatureMark::new(1, x, y);
            prop_assert!(validate_geometry(&mark).is_err());
        }

        /// Property: page numbers in [1, count] validate, everything else fails
        #[test]
        fn page_number_validation(page in 0u32..200, count in 1usize..100) {
            let result = validate_page_number(page, count);
            if page >= 1 && page as usize <= count {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }

        /// Property: JSON roundtrip preserves mark geometry
        #[test]
        fn mark_json_roundtrip(
            page in 1u32..100,
            x in 0.0f64..100.0,
            y in 0.0f64..100.0,
            w in 0.1f64..300.0,
            h in 0.1f64..300.0,
        ) {
            let mark = SignatureMark::new(page, x, y).with_size(w, h);
            let json = serde_json::to_string(&mark).unwrap();
            let back: SignatureMark = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back.page_number, page);
            prop_assert!((back.x_percent - x).abs() < f64::EPSILON);
            prop_assert!((back.y_percent - y).abs() < f64::EPSILON);
            prop_assert!((back.width_percent - w).abs() < f64::EPSILON);
            prop_assert!((back.height_percent - h).abs() < f64::EPSILON);
        }
    }
}
