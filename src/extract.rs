//! Slicing of the tutorial sheets into numbered step images.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::{ContextError, ErrorKind};
use crate::grid::{self, GridLayout, GRID_SIDE};
use crate::source::SourceDocument;

/// One non-blank cell of a tutorial sheet, saved as a PNG file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepImage {
    /// 1-based position within the tutorial, blank cells do not consume a number.
    pub number: usize,
    /// Zero-based page the cell was cropped from.
    pub page_index: usize,
    pub row: usize,
    pub column: usize,
    /// Where the PNG was written.
    pub path: PathBuf,
}

impl StepImage {
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// Crops every cell of every page and keeps the cells that are not blank.
#[derive(Debug, Clone, Default)]
pub struct StepExtractor {
    layout: GridLayout,
}

impl StepExtractor {
    pub fn new(layout: GridLayout) -> Self {
        StepExtractor { layout }
    }

    /// Saves the steps of the tutorial as `<carry_name>_stepNN.png` files in `output_directory`
    /// and returns them in production order.
    ///
    /// The columns are scanned left to right and the first blank cell ends its row: the steps
    /// of a tutorial run out mid-row. The following rows of the page are still scanned.
    pub fn extract<D: SourceDocument + ?Sized>(
        &self,
        document: &mut D,
        carry_name: &str,
        output_directory: &Path,
    ) -> Result<Vec<StepImage>, ContextError> {
        let mut step_images = Vec::new();
        let mut step_number = 1;

        for page_index in 0..document.page_count() {
            log::debug!("Scanning page {} of {}", page_index + 1, carry_name);

            for row in 0..GRID_SIDE {
                for column in 0..GRID_SIDE {
                    let region = self.layout.cell_region(row, column);
                    let image = document.rasterize_region(page_index, region, self.layout.dpi)?;

                    if grid::is_blank(&image) {
                        log::debug!(
                            "Blank cell at page {}, row {}, column {}, skipping the rest of the row",
                            page_index + 1,
                            row,
                            column
                        );
                        break;
                    }

                    let path = output_directory.join(grid::step_file_name(carry_name, step_number));
                    let mut png_bytes = Vec::new();
                    image
                        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
                        .map_err(|error| {
                            ContextError::with_error(
                                ErrorKind::Io,
                                format!("Unable to encode step {}", step_number),
                                &error,
                            )
                        })?;
                    std::fs::write(&path, png_bytes).map_err(|error| {
                        ContextError::with_error(
                            ErrorKind::Io,
                            format!("Unable to save the step image {:?}", path),
                            &error,
                        )
                    })?;
                    log::info!("Saved step {} to {:?}", step_number, path);

                    step_images.push(StepImage {
                        number: step_number,
                        page_index,
                        row,
                        column,
                        path,
                    });
                    step_number += 1;
                }
            }
        }

        Ok(step_images)
    }
}
