//! Mapping page-relative percentage geometry to absolute page units
//!
//! Marks are captured against a rendered preview and stored as
//! percentages of the page dimensions, top-left origin. The mapper turns
//! those percentages into absolute page units for the page they target.
//! It is the only place percentage semantics are interpreted.

use signpress_types::SignatureMark;

/// Gap between a mark's bottom edge and its underline, in page units.
pub const UNDERLINE_GAP: f64 = 2.0;

/// Gap between the underline and the caption baseline, in page units.
pub const CAPTION_GAP: f64 = 10.0;

/// Native dimensions of a single page, in PDF user-space units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
        }
    }
}

/// A mark's resolved placement: absolute rectangle in page units with a
/// top-left origin (matching how marks are captured), plus the derived
/// anchors for the underline and caption drawn beneath it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PlacementRect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Distance from the page top to the "signed here" underline.
    pub fn underline_y(&self) -> f64 {
        self.y1 + UNDERLINE_GAP
    }

    /// Anchor for the signer caption, just below the underline.
    pub fn caption_anchor(&self) -> (f64, f64) {
        (self.x0, self.underline_y() + CAPTION_GAP)
    }
}

/// Resolve a mark's percentage position and size against a page size.
///
/// Purely linear, no clamping: a rect that extends past the page edge is
/// returned as-is. Coordinates are always relative to the page, never
/// absolute pixels, which is what makes the same mark land at the same
/// relative spot on any page size.
pub fn resolve(page: PageSize, mark: &SignatureMark) -> PlacementRect {
    let x = mark.x_percent / 100.0 * page.width;
    let y = mark.y_percent / 100.0 * page.height;
    let w = mark.width_percent / 100.0 * page.width;
    let h = mark.height_percent / 100.0 * page.height;

    PlacementRect {
        x0: x,
        y0: y,
        x1: x + w,
        y1: y + h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(x: f64, y: f64, w: f64, h: f64) -> SignatureMark {
        SignatureMark::new(1, x, y).with_size(w, h)
    }

    #[test]
    fn test_resolve_center_of_letter() {
        let rect = resolve(PageSize::letter(), &mark(50.0, 50.0, 10.0, 10.0));
        assert!((rect.x0 - 306.0).abs() < 0.001);
        assert!((rect.y0 - 396.0).abs() < 0.001);
        assert!((rect.x1 - 367.2).abs() < 0.001);
        assert!((rect.y1 - 475.2).abs() < 0.001);
    }

    #[test]
    fn test_resolve_origin() {
        let rect = resolve(PageSize::a4(), &mark(0.0, 0.0, 25.0, 10.0));
        assert_eq!(rect.x0, 0.0);
        assert_eq!(rect.y0, 0.0);
        assert!((rect.width() - 148.75).abs() < 0.001);
        assert!((rect.height() - 84.2).abs() < 0.001);
    }

    #[test]
    fn test_no_clamping_on_overflow() {
        // The documented default size is 200% x 80%; the rect must be
        // returned as-is, extending past the right edge.
        let page = PageSize::letter();
        let rect = resolve(page, &SignatureMark::new(1, 10.0, 10.0));
        assert!(rect.x1 > page.width);
        assert!((rect.width() - 2.0 * page.width).abs() < 0.001);
    }

    #[test]
    fn test_underline_and_caption_anchors() {
        let rect = resolve(PageSize::letter(), &mark(0.0, 0.0, 50.0, 10.0));
        assert!((rect.underline_y() - (rect.y1 + UNDERLINE_GAP)).abs() < f64::EPSILON);
        let (cx, cy) = rect.caption_anchor();
        assert_eq!(cx, rect.x0);
        assert!((cy - (rect.y1 + UNDERLINE_GAP + CAPTION_GAP)).abs() < f64::EPSILON);
    }
}
