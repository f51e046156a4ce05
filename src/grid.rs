//! Geometry of the scanned tutorial sheets: every page holds a 3×3 grid of equally sized steps.

use std::collections::HashSet;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Number of rows and of columns in the grid of a tutorial sheet.
pub const GRID_SIDE: usize = 3;

/// The fixed geometry of a tutorial sheet, in PDF points. It is not derived from the page size,
/// the sheets are all exported from the same template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    /// Left coordinate of the first column.
    pub start_x: f32,
    /// Top coordinate of the first row.
    pub start_y: f32,
    /// Horizontal gap between two columns.
    pub buffer_x: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Resolution the cells are rasterized at.
    pub dpi: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout {
            start_x: 24.0,
            start_y: 693.0,
            buffer_x: 24.0,
            cell_width: 191.0 - 24.0 - 0.5,
            cell_height: 693.0 - 488.0 + 1.5,
            dpi: 300,
        }
    }
}

/// A rectangle in PDF user space, the origin being the bottom left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellRegion {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl CellRegion {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

impl GridLayout {
    /// Bounding box of the cell at the given row (top first) and column (left first).
    pub fn cell_region(&self, row: usize, column: usize) -> CellRegion {
        let x0 = self.start_x + column as f32 * (self.cell_width + self.buffer_x);
        let y1 = self.start_y - row as f32 * self.cell_height;

        CellRegion {
            x0,
            y0: y1 - self.cell_height,
            x1: x0 + self.cell_width,
            y1,
        }
    }
}

/// A cell is blank when every one of its pixels has the same value.
pub fn is_blank(image: &DynamicImage) -> bool {
    let mut distinct_pixels = HashSet::new();
    for pixel in image.to_rgba8().pixels() {
        distinct_pixels.insert(pixel.0);
        if distinct_pixels.len() > 1 {
            return false;
        }
    }

    distinct_pixels.len() == 1
}

/// Name under which a step image is stored, e.g. `giselles_step03.png`.
///
/// Numbers above 99 grow a third digit and no longer sort lexicographically after `99`.
pub fn step_file_name(carry_name: &str, step_number: usize) -> String {
    format!("{carry_name}_step{step_number:02}.png")
}

/// Prefix shared by every step image of a carry in the bucket.
pub fn step_prefix(carry_name: &str) -> String {
    format!("{carry_name}_step")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn production_constants() {
        let layout = GridLayout::default();

        assert_eq!(layout.cell_width, 166.5);
        assert_eq!(layout.cell_height, 206.5);
        assert_eq!(layout.dpi, 300);
    }

    #[test]
    fn cells_are_laid_out_row_major_from_the_top_left() {
        let layout = GridLayout::default();

        let first = layout.cell_region(0, 0);
        assert_eq!(first, CellRegion { x0: 24.0, y0: 486.5, x1: 190.5, y1: 693.0 });

        let middle = layout.cell_region(1, 1);
        assert_eq!(middle.x0, 24.0 + 166.5 + 24.0);
        assert_eq!(middle.y1, 693.0 - 206.5);
        assert_eq!(middle.y0, 693.0 - 2.0 * 206.5);

        let last = layout.cell_region(2, 2);
        assert_eq!(last.x0, 24.0 + 2.0 * (166.5 + 24.0));
        assert_eq!(last.x1, last.x0 + 166.5);
        assert_eq!(last.y0, 693.0 - 3.0 * 206.5);
    }

    #[test]
    fn every_cell_has_the_configured_size() {
        let layout = GridLayout::default();
        for row in 0..GRID_SIDE {
            for column in 0..GRID_SIDE {
                let region = layout.cell_region(row, column);
                assert!((region.width() - layout.cell_width).abs() < 1e-4);
                assert!((region.height() - layout.cell_height).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn uniform_bitmap_is_blank() {
        let white = RgbImage::from_pixel(40, 30, Rgb([255, 255, 255]));
        assert!(is_blank(&DynamicImage::ImageRgb8(white)));

        let grey = RgbImage::from_pixel(40, 30, Rgb([128, 128, 128]));
        assert!(is_blank(&DynamicImage::ImageRgb8(grey)));
    }

    #[test]
    fn solid_colour_cell_is_blank() {
        // Whole pixels are compared, the three different channel values do not count as content.
        let red = RgbImage::from_pixel(40, 30, Rgb([255, 0, 0]));
        assert!(is_blank(&DynamicImage::ImageRgb8(red)));

        let mut two_colours = RgbImage::from_pixel(40, 30, Rgb([255, 0, 0]));
        two_colours.put_pixel(0, 0, Rgb([0, 0, 255]));
        assert!(!is_blank(&DynamicImage::ImageRgb8(two_colours)));
    }

    #[test]
    fn single_different_pixel_is_content() {
        let mut image = RgbImage::from_pixel(40, 30, Rgb([255, 255, 255]));
        image.put_pixel(39, 29, Rgb([254, 255, 255]));

        assert!(!is_blank(&DynamicImage::ImageRgb8(image)));
    }

    #[test]
    fn empty_bitmap_is_not_blank() {
        assert!(!is_blank(&DynamicImage::ImageRgb8(RgbImage::new(0, 0))));
    }

    #[test]
    fn step_names_are_zero_padded() {
        assert_eq!(step_file_name("giselles", 1), "giselles_step01.png");
        assert_eq!(step_file_name("giselles", 10), "giselles_step10.png");
        assert_eq!(step_file_name("giselles", 99), "giselles_step99.png");
    }

    #[test]
    fn hundredth_step_breaks_the_lexicographic_order() {
        let ninety_ninth = step_file_name("giselles", 99);
        let hundredth = step_file_name("giselles", 100);

        assert_eq!(hundredth, "giselles_step100.png");
        assert!(hundredth < ninety_ninth);
        assert!(hundredth.starts_with(&step_prefix("giselles")));
    }
}
