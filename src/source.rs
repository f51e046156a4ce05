//! Access to the scanned tutorial sheets. Cropping is done with `lopdf` by rewriting the page boxes,
//! rasterization is delegated to the `pdftoppm` executable shipped with poppler.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{ContextError, ErrorKind};
use crate::grid::CellRegion;

/// A multi-page document whose pages can be rasterized region by region.
pub trait SourceDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Renders the given region of the page (zero-based) at the given resolution.
    fn rasterize_region(
        &mut self,
        page_index: usize,
        region: CellRegion,
        dpi: u32,
    ) -> Result<DynamicImage, ContextError>;
}

/// A PDF file on disk rendered through poppler.
pub struct PopplerDocument {
    path: PathBuf,
    inner_document: lopdf::Document,
    scratch_directory: tempfile::TempDir,
}

impl PopplerDocument {
    /// Loads the PDF document, failing if it is unreadable or malformed.
    pub fn open(path: &Path) -> Result<Self, ContextError> {
        let inner_document = lopdf::Document::load(path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to read the source document {:?}", path),
                &error,
            )
        })?;
        let scratch_directory = tempfile::tempdir().map_err(|error| {
            ContextError::with_error(ErrorKind::Io, "Unable to create a scratch directory", &error)
        })?;

        Ok(PopplerDocument {
            path: path.to_path_buf(),
            inner_document,
            scratch_directory,
        })
    }

    /// Builds a copy of the document holding only the given page, with its boxes set to the region.
    fn cropped_page(
        &self,
        page_index: usize,
        region: CellRegion,
    ) -> Result<lopdf::Document, ContextError> {
        let pages = self.inner_document.get_pages();
        let page_number = page_index as u32 + 1;
        let page_id = *pages.get(&page_number).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Io,
                format!("Page {} does not exist in {:?}", page_number, self.path),
            )
        })?;

        let mut cropped_document = self.inner_document.clone();
        let other_pages: Vec<u32> = pages
            .keys()
            .copied()
            .filter(|number| *number != page_number)
            .collect();
        cropped_document.delete_pages(&other_pages);

        let bounding_box: Vec<lopdf::Object> = vec![
            region.x0.into(),
            region.y0.into(),
            region.x1.into(),
            region.y1.into(),
        ];
        let page_dictionary = cropped_document
            .get_object_mut(page_id)
            .and_then(lopdf::Object::as_dict_mut)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Io,
                    format!("Malformed page {} in {:?}", page_number, self.path),
                    &error,
                )
            })?;
        page_dictionary.set("MediaBox", bounding_box.clone());
        page_dictionary.set("CropBox", bounding_box);

        Ok(cropped_document)
    }
}

impl SourceDocument for PopplerDocument {
    fn page_count(&self) -> usize {
        self.inner_document.get_pages().len()
    }

    fn rasterize_region(
        &mut self,
        page_index: usize,
        region: CellRegion,
        dpi: u32,
    ) -> Result<DynamicImage, ContextError> {
        let mut cropped_document = self.cropped_page(page_index, region)?;
        let cropped_path = self
            .scratch_directory
            .path()
            .join(format!("page{:03}_cell.pdf", page_index + 1));
        cropped_document.save(&cropped_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to write the cropped page {:?}", cropped_path),
                &error,
            )
        })?;

        let output_prefix = self.scratch_directory.path().join("cell");
        run_pdftoppm(&cropped_path, &output_prefix, dpi, None)?;
        let image_path = output_prefix.with_extension("png");
        let image = image::open(&image_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to decode the rasterized cell {:?}", image_path),
                &error,
            )
        })?;

        std::fs::remove_file(&cropped_path).map_err(|error| {
            ContextError::with_error(ErrorKind::Io, "Unable to remove the cropped page", &error)
        })?;
        std::fs::remove_file(&image_path).map_err(|error| {
            ContextError::with_error(ErrorKind::Io, "Unable to remove the rasterized cell", &error)
        })?;

        Ok(image)
    }
}

/// Rasterizes every page of a PDF file to `<stem>-<page number>.png` files in the output directory.
/// Returns the produced paths in page order.
pub fn rasterize_pages(
    pdf_path: &Path,
    output_directory: &Path,
    stem: &str,
    dpi: u32,
) -> Result<Vec<PathBuf>, ContextError> {
    let page_count = lopdf::Document::load(pdf_path)
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to read the document {:?}", pdf_path),
                &error,
            )
        })?
        .get_pages()
        .len();

    let mut image_paths = Vec::with_capacity(page_count);
    for page_number in 1..=page_count {
        let output_prefix = output_directory.join(format!("{stem}-{page_number}"));
        run_pdftoppm(pdf_path, &output_prefix, dpi, Some(page_number))?;
        image_paths.push(output_prefix.with_extension("png"));
    }

    Ok(image_paths)
}

/// Runs `pdftoppm` so that it writes exactly one PNG file at `<output_prefix>.png`.
fn run_pdftoppm(
    pdf_path: &Path,
    output_prefix: &Path,
    dpi: u32,
    page_number: Option<usize>,
) -> Result<(), ContextError> {
    let mut command = std::process::Command::new("pdftoppm");
    command
        .arg("-png")
        .arg("-singlefile")
        .arg("-cropbox")
        .arg("-r")
        .arg(dpi.to_string());
    if let Some(page_number) = page_number {
        command
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string());
    }
    command.arg(pdf_path).arg(output_prefix);

    let status = command.status().map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            "Unable to run the pdftoppm command, is poppler installed?",
            &error,
        )
    })?;
    if !status.success() {
        return Err(ContextError::with_context(
            ErrorKind::Io,
            format!("pdftoppm failed on {:?} with status {:?}", pdf_path, status),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridLayout;
    use crate::pdf::PdfDocument;

    /// Writes an empty letter-sized document with the given number of pages.
    fn blank_document(directory: &Path, page_count: usize) -> PathBuf {
        let mut pdf_document = PdfDocument::new("source-test".into());
        for _ in 0..page_count {
            pdf_document.add_page(612.0, 792.0);
        }
        pdf_document.write_all().unwrap();
        let path = directory.join("sheet.pdf");
        pdf_document.save_to_file(&path).unwrap();

        path
    }

    fn page_box(document: &lopdf::Document, page_id: lopdf::ObjectId, key: &[u8]) -> Vec<f32> {
        document
            .get_dictionary(page_id)
            .unwrap()
            .get(key)
            .and_then(lopdf::Object::as_array)
            .unwrap()
            .iter()
            .map(|value| value.as_float().unwrap())
            .collect()
    }

    fn pdftoppm_is_installed() -> bool {
        std::process::Command::new("pdftoppm")
            .arg("-v")
            .output()
            .is_ok()
    }

    #[test]
    fn pages_are_counted() {
        let directory = tempfile::tempdir().unwrap();
        let source = PopplerDocument::open(&blank_document(directory.path(), 2)).unwrap();

        assert_eq!(source.page_count(), 2);
    }

    #[test]
    fn cropped_page_keeps_only_the_requested_page() {
        let directory = tempfile::tempdir().unwrap();
        let source = PopplerDocument::open(&blank_document(directory.path(), 2)).unwrap();
        let second_page_id = source.inner_document.get_pages()[&2];

        let region = GridLayout::default().cell_region(0, 0);
        let mut cropped_document = source.cropped_page(1, region).unwrap();

        let pages = cropped_document.get_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[&1], second_page_id);
        let expected_box = vec![24.0, 486.5, 190.5, 693.0];
        assert_eq!(page_box(&cropped_document, second_page_id, b"MediaBox"), expected_box);
        assert_eq!(page_box(&cropped_document, second_page_id, b"CropBox"), expected_box);

        // The source itself is left untouched.
        assert_eq!(source.page_count(), 2);

        let mut bytes = Vec::new();
        cropped_document.save_to(&mut bytes).unwrap();
        let reloaded = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 1);
    }

    #[test]
    fn cropping_a_missing_page_fails() {
        let directory = tempfile::tempdir().unwrap();
        let source = PopplerDocument::open(&blank_document(directory.path(), 2)).unwrap();

        let error = source
            .cropped_page(5, GridLayout::default().cell_region(0, 0))
            .err()
            .unwrap();

        assert_eq!(error.kind, ErrorKind::Io);
        assert!(error.context.contains("Page 6"));
    }

    #[test]
    fn malformed_file_cannot_be_opened() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("garbage.pdf");
        std::fs::write(&path, b"this is not a PDF document").unwrap();

        let error = PopplerDocument::open(&path).err().unwrap();
        assert_eq!(error.kind, ErrorKind::Io);

        let error = PopplerDocument::open(&directory.path().join("missing.pdf"))
            .err()
            .unwrap();
        assert_eq!(error.kind, ErrorKind::Io);
    }

    #[test]
    fn cell_is_rasterized_at_the_requested_resolution() {
        if !pdftoppm_is_installed() {
            eprintln!("pdftoppm is not installed, skipping");
            return;
        }
        let directory = tempfile::tempdir().unwrap();
        let mut source = PopplerDocument::open(&blank_document(directory.path(), 1)).unwrap();

        let region = GridLayout::default().cell_region(1, 2);
        let image = source.rasterize_region(0, region, 72).unwrap();

        // One pixel per point at 72 DPI, give or take the rounding of poppler.
        assert!((image.width() as f32 - region.width()).abs() <= 1.0);
        assert!((image.height() as f32 - region.height()).abs() <= 1.0);
        assert!(std::fs::read_dir(source.scratch_directory.path())
            .unwrap()
            .next()
            .is_none());
    }

    #[test]
    fn every_page_is_rasterized_in_order() {
        if !pdftoppm_is_installed() {
            eprintln!("pdftoppm is not installed, skipping");
            return;
        }
        let directory = tempfile::tempdir().unwrap();
        let pdf_path = blank_document(directory.path(), 3);

        let image_paths = rasterize_pages(&pdf_path, directory.path(), "post", 36).unwrap();

        let names: Vec<_> = image_paths
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["post-1.png", "post-2.png", "post-3.png"]);
        assert!(image_paths.iter().all(|path| path.exists()));
    }
}
