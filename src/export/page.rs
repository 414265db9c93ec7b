//! Page geometry: paper formats, units, and the width-fitting rule.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Document unit. `Px` is a CSS pixel (1/96 in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Unit {
    Pt,
    #[default]
    Px,
    Mm,
}

impl Unit {
    pub fn points_per_unit(self) -> f64 {
        match self {
            Unit::Pt => 1.0,
            Unit::Px => 72.0 / 96.0,
            Unit::Mm => 72.0 / 25.4,
        }
    }

    pub fn to_points(self, value: f64) -> f64 {
        value * self.points_per_unit()
    }

    pub fn from_points(self, points: f64) -> f64 {
        points / self.points_per_unit()
    }

    pub fn to_mm(self, value: f64) -> f64 {
        Unit::Mm.from_points(self.to_points(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageFormat {
    /// Portrait size in points.
    pub fn size_points(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (595.28, 841.89),
            PageFormat::Letter => (612.0, 792.0),
            PageFormat::Legal => (612.0, 1008.0),
        }
    }

    /// Size in `unit` for the given orientation.
    pub fn size(self, orientation: Orientation, unit: Unit) -> (f64, f64) {
        let (w, h) = self.size_points();
        let (w, h) = match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };
        (unit.from_points(w), unit.from_points(h))
    }
}

/// Placement of the bitmap on the page, in document units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
}

/// Scale a `bitmap_width × bitmap_height` bitmap to exactly `target_width`,
/// keeping its aspect ratio. The result is never split across pages.
pub fn compose_page(bitmap_width: u32, bitmap_height: u32, target_width: f64) -> Result<PageLayout> {
    if bitmap_width == 0 {
        return Err(Error::RenderError("bitmap has zero width".into()));
    }
    if !(target_width.is_finite() && target_width > 0.0) {
        return Err(Error::DocumentError(format!("invalid page width {}", target_width)));
    }
    Ok(PageLayout {
        width: target_width,
        height: bitmap_height as f64 * (target_width / bitmap_width as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn compose_preserves_aspect_ratio() {
        let page = compose_page(2000, 1000, 500.0).unwrap();
        assert_eq!(page.width, 500.0);
        assert_eq!(page.height, 250.0);
    }

    #[test]
    fn compose_does_not_clamp_to_page_height() {
        let (w, h) = PageFormat::A4.size(Orientation::Portrait, Unit::Px);
        let page = compose_page(1588, 6000, w).unwrap();
        assert!(page.height > h);
    }

    #[test]
    fn compose_rejects_degenerate_input() {
        assert!(compose_page(0, 10, 100.0).is_err());
        assert!(compose_page(10, 10, 0.0).is_err());
        assert!(compose_page(10, 10, f64::NAN).is_err());
    }

    #[test]
    fn a4_in_css_pixels() {
        let (w, h) = PageFormat::A4.size(Orientation::Portrait, Unit::Px);
        assert!(close(w, 793.706_666_666_666_7));
        assert!(close(h, 1122.52));
        let (lw, lh) = PageFormat::A4.size(Orientation::Landscape, Unit::Px);
        assert!(close(lw, h) && close(lh, w));
    }

    #[test]
    fn unit_conversion_to_mm() {
        assert!(close(Unit::Px.to_mm(96.0), 25.4));
        assert!(close(Unit::Mm.to_mm(210.0), 210.0));
        assert!(close(Unit::Pt.to_mm(72.0), 25.4));
    }
}
