//! Quadrant split and merge for the tiled pipeline
//!
//! An image of width `w` and height `h` is cut at `w / 2` and `h / 2`
//! (floor division). For odd sizes the right column and bottom row of tiles
//! are one pixel larger than the left/top ones.

use crate::{
    config::TilingMode,
    error::{BgRemovalError, Result},
};
use image::{imageops, DynamicImage, GenericImageView};
use std::fmt;

/// Position of a tile, in the fixed processing and merge order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Slot index of this quadrant
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BottomLeft => 2,
            Self::BottomRight => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One quadrant cut out of a source image
#[derive(Debug, Clone)]
pub struct Tile {
    pub quadrant: Quadrant,
    /// Offset of the tile inside the source image
    pub x: u32,
    pub y: u32,
    pub image: DynamicImage,
}

/// Cut `image` into its four quadrants, in `Quadrant::ALL` order
///
/// # Errors
/// `Input` when either dimension is below 2 pixels; a zero-sized tile
/// cannot be segmented.
pub fn split_quadrants(image: &DynamicImage) -> Result<[Tile; 4]> {
    let (width, height) = image.dimensions();
    if width < 2 || height < 2 {
        return Err(BgRemovalError::input(format!(
            "Image of {width}x{height} pixels is too small to split into quadrants"
        )));
    }

    let (mid_x, mid_y) = (width / 2, height / 2);
    let tile = |quadrant, x, y, w, h| Tile {
        quadrant,
        x,
        y,
        image: image.crop_imm(x, y, w, h),
    };

    Ok([
        tile(Quadrant::TopLeft, 0, 0, mid_x, mid_y),
        tile(Quadrant::TopRight, mid_x, 0, width - mid_x, mid_y),
        tile(Quadrant::BottomLeft, 0, mid_y, mid_x, height - mid_y),
        tile(Quadrant::BottomRight, mid_x, mid_y, width - mid_x, height - mid_y),
    ])
}

/// Reassemble four processed quadrants, given in `Quadrant::ALL` order
///
/// Tiles are placed at TL `(0, 0)`, TR `(w_TL, 0)`, BL `(0, h_TL)` and
/// BR `(w_TL, h_TL)` in both modes. The canvas takes the color type of the
/// top-left tile; pixels no tile covers stay zero.
#[must_use]
pub fn merge_quadrants(tiles: &[DynamicImage; 4], mode: TilingMode) -> DynamicImage {
    let [top_left, top_right, bottom_left, bottom_right] = tiles;

    let (canvas_width, canvas_height) = match mode {
        TilingMode::Legacy => {
            let max_width = tiles.iter().map(DynamicImage::width).max().unwrap_or(0);
            let max_height = tiles.iter().map(DynamicImage::height).max().unwrap_or(0);
            (2 * max_width, 2 * max_height)
        },
        TilingMode::Exact => (
            top_left.width() + top_right.width(),
            top_left.height() + bottom_left.height(),
        ),
    };

    let mut canvas = DynamicImage::new(canvas_width, canvas_height, top_left.color());
    let (offset_x, offset_y) = (i64::from(top_left.width()), i64::from(top_left.height()));

    imageops::replace(&mut canvas, top_left, 0, 0);
    imageops::replace(&mut canvas, top_right, offset_x, 0);
    imageops::replace(&mut canvas, bottom_left, 0, offset_y);
    imageops::replace(&mut canvas, bottom_right, offset_x, offset_y);

    canvas
}
