#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use carrybook::{
    carry::RawCarry,
    error::{ContextError, ErrorKind},
    grid::{CellRegion, GridLayout, GRID_SIDE},
    source::SourceDocument,
    storage::{ObjectStorage, RecordStore, StepImageUrl},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::Rng as _;

/// A bucket kept in memory, signed URLs being the object names themselves.
#[derive(Default)]
pub struct MemoryBucket {
    pub objects: BTreeMap<String, Vec<u8>>,
    pub upload_calls: usize,
    /// Uploads of this name fail.
    pub failing_name: Option<String>,
}

impl ObjectStorage for MemoryBucket {
    fn list_existing_names(&self) -> Result<HashSet<String>, ContextError> {
        Ok(self.objects.keys().cloned().collect())
    }

    fn upload(
        &mut self,
        name: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), ContextError> {
        self.upload_calls += 1;
        if self.failing_name.as_deref() == Some(name) {
            return Err(ContextError::with_context(
                ErrorKind::Io,
                format!("Unable to upload {name}: the server answered 500"),
            ));
        }
        self.objects.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ContextError> {
        self.objects
            .get(url)
            .cloned()
            .ok_or_else(|| ContextError::with_context(ErrorKind::Io, format!("{url} is missing")))
    }
}

/// A carries table kept in memory, reading the step images of `bucket` when listing them.
#[derive(Default)]
pub struct MemoryTable {
    pub rows: Vec<(RawCarry, bool)>,
    pub step_names: BTreeMap<String, Vec<String>>,
    pub marked: Vec<String>,
}

impl MemoryTable {
    pub fn with_rows(rows: Vec<(RawCarry, bool)>) -> Self {
        MemoryTable {
            rows,
            ..MemoryTable::default()
        }
    }
}

impl RecordStore for MemoryTable {
    fn fetch_carries_with_tutorial_flag(
        &self,
        tutorial: bool,
    ) -> Result<Vec<RawCarry>, ContextError> {
        Ok(self
            .rows
            .iter()
            .filter(|(_, flag)| *flag == tutorial)
            .map(|(row, _)| row.clone())
            .collect())
    }

    fn fetch_carry_by_name(&self, name: &str) -> Result<Option<RawCarry>, ContextError> {
        Ok(self
            .rows
            .iter()
            .find(|(row, flag)| *flag && row.name == name)
            .map(|(row, _)| row.clone()))
    }

    fn mark_tutorial_available(&mut self, name: &str) -> Result<(), ContextError> {
        let mut updated_rows = 0;
        for (row, flag) in self.rows.iter_mut() {
            if row.name == name {
                *flag = true;
                updated_rows += 1;
            }
        }
        if updated_rows == 0 {
            return Err(ContextError::with_context(
                ErrorKind::NotFound,
                format!("Carry with name {} not found in the database", name),
            ));
        }
        self.marked.push(name.to_string());
        Ok(())
    }

    fn list_step_image_urls(&self, name: &str) -> Result<Vec<StepImageUrl>, ContextError> {
        let mut names = self.step_names.get(name).cloned().unwrap_or_default();
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| StepImageUrl {
                signed_url: name.clone(),
                name,
            })
            .collect())
    }
}

/// A scanned sheet whose content cells, listed as `(page, row, column)`, are random noise and
/// whose other cells are plain white.
pub struct NoisySheet {
    pub pages: usize,
    pub content: HashSet<(usize, usize, usize)>,
    layout: GridLayout,
}

impl NoisySheet {
    pub fn new(pages: usize, content: impl IntoIterator<Item = (usize, usize, usize)>) -> Self {
        NoisySheet {
            pages,
            content: content.into_iter().collect(),
            layout: GridLayout::default(),
        }
    }

    pub fn full_pages(pages: usize) -> Self {
        Self::new(
            pages,
            (0..pages).flat_map(|page| {
                (0..GRID_SIDE).flat_map(move |row| (0..GRID_SIDE).map(move |column| (page, row, column)))
            }),
        )
    }
}

impl SourceDocument for NoisySheet {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn rasterize_region(
        &mut self,
        page_index: usize,
        region: CellRegion,
        _dpi: u32,
    ) -> Result<DynamicImage, ContextError> {
        let (row, column) = (0..GRID_SIDE)
            .flat_map(|row| (0..GRID_SIDE).map(move |column| (row, column)))
            .find(|(row, column)| self.layout.cell_region(*row, *column) == region)
            .ok_or_else(|| ContextError::with_context(ErrorKind::Io, "Region outside of the grid"))?;

        if !self.content.contains(&(page_index, row, column)) {
            return Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                16,
                20,
                Rgb([255, 255, 255]),
            )));
        }
        Ok(noise_image(16, 20))
    }
}

/// Random pixels, with two fixed ones so that the image can never be uniform.
pub fn noise_image(width: u32, height: u32) -> DynamicImage {
    let mut rng = rand::thread_rng();
    let mut image = RgbImage::from_fn(width, height, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
    image.put_pixel(0, 0, Rgb([0, 0, 0]));
    image.put_pixel(1, 0, Rgb([255, 255, 255]));
    DynamicImage::ImageRgb8(image)
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn raw_carry(name: &str, long_title: &str, position: &str) -> RawCarry {
    RawCarry {
        name: name.to_string(),
        long_title: long_title.to_string(),
        drop_height_offset: 0,
        position: position.to_string(),
        size: -1,
        difficulty: 2.5,
    }
}

/// Entries of the system temporary directory starting with the prefix.
pub fn staging_directories(prefix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect()
}

/// A TrueType font of the system, the rendering tests are skipped on systems without one.
pub fn system_font() -> Option<&'static Path> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial Unicode.ttf",
    ]
    .into_iter()
    .map(Path::new)
    .find(|path| path.exists())
}
