//! Mapping authored [`Location`]s onto backend page coordinates.
//!
//! Locations are authored at 100 px/inch on an 11-inch-tall page with a
//! top-left origin. Backends use points with a bottom-left origin, so the
//! scale is derived from the real page height and y is flipped.

use docket_core::Location;

pub const AUTHORED_DPI: f32 = 100.0;
pub const AUTHORED_PAGE_INCHES: f32 = 11.0;

/// Text drawn for a truthy fixed-location check.
pub const CHECK_MARK: &str = "X";

pub fn scale_for(page_height: f32) -> f32 {
    (page_height / AUTHORED_PAGE_INCHES) / AUTHORED_DPI
}

/// Where to draw, in backend coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

pub fn place(loc: &Location, page_height: f32) -> Placement {
    let scale = scale_for(page_height);
    Placement {
        x: loc.x * scale,
        y: page_height - loc.y * scale - loc.font_size,
        scale,
    }
}
