//! The three end to end jobs: publishing the steps of a scanned tutorial, rendering the post of
//! one carry and rendering the book of every carry.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;

use crate::carry::Carry;
use crate::configuration::RenderConfiguration;
use crate::error::{ContextError, ErrorKind};
use crate::extract::StepExtractor;
use crate::pdf::PdfDocument;
use crate::render::{PageTemplate, Renderer};
use crate::source::{self, SourceDocument};
use crate::storage::{self, ObjectStorage, RecordStore, UploadOutcome};

/// Resolution the post pages are rasterized at, twice the resolution of the PDF user space.
pub const POST_DPI: u32 = 144;

/// What a publication did, for the logs and the command line summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublicationReport {
    pub produced: usize,
    pub uploaded: usize,
    pub skipped: usize,
}

/// Extracts the steps of the tutorial into a staging directory, uploads them in order without
/// overwriting the stored ones and marks the tutorial of the carry as available.
///
/// The staging directory is removed whatever the outcome; a failure at any stage aborts the
/// publication and the carry is not marked.
pub fn publish_tutorial_steps<D, S, R>(
    source: &mut D,
    carry_name: &str,
    extractor: &StepExtractor,
    storage: &mut S,
    records: &mut R,
) -> Result<PublicationReport, ContextError>
where
    D: SourceDocument + ?Sized,
    S: ObjectStorage + ?Sized,
    R: RecordStore + ?Sized,
{
    let staging_directory = tempfile::Builder::new()
        .prefix(&format!("{carry_name}-steps-"))
        .tempdir()
        .map_err(|error| {
            ContextError::with_error(ErrorKind::Io, "Unable to create the staging directory", &error)
        })?;

    let step_images = extractor.extract(source, carry_name, staging_directory.path())?;
    let step_paths: Vec<&Path> = step_images.iter().map(|step| step.path.as_path()).collect();
    let outcomes = storage::upload_files(storage, step_paths.as_slice(), "image/png")?;
    records.mark_tutorial_available(carry_name)?;

    let report = PublicationReport {
        produced: step_images.len(),
        uploaded: outcomes
            .iter()
            .filter(|outcome| **outcome == UploadOutcome::Uploaded)
            .count(),
        skipped: outcomes
            .iter()
            .filter(|outcome| **outcome == UploadOutcome::Skipped)
            .count(),
    };
    log::info!(
        "Published {} steps of {}: {} uploaded, {} already stored",
        report.produced,
        carry_name,
        report.uploaded,
        report.skipped
    );

    staging_directory.close().map_err(|error| {
        ContextError::with_error(ErrorKind::Io, "Unable to remove the staging directory", &error)
    })?;

    Ok(report)
}

/// Renders the cover and the tutorial pages of the named carry, which must have a tutorial.
pub fn render_post<S, R>(
    carry_name: &str,
    configuration: &RenderConfiguration,
    storage: &S,
    records: &R,
) -> Result<(Carry, PdfDocument), ContextError>
where
    S: ObjectStorage + ?Sized,
    R: RecordStore + ?Sized,
{
    let raw_carry = records.fetch_carry_by_name(carry_name)?.ok_or_else(|| {
        ContextError::with_context(
            ErrorKind::NotFound,
            format!(
                "Carry with a tutorial and name {} not found in the database",
                carry_name
            ),
        )
    })?;
    let carry = Carry::from_raw(&raw_carry)?;
    let cover_image = load_cover_image(configuration, &carry.name)?;
    let step_images = download_step_images(&carry.name, storage, records)?;

    let mut renderer = Renderer::new(PageTemplate::post(&carry), configuration, &carry.name)?;
    renderer.render_cover_page(&carry, Some(&cover_image))?;
    renderer.render_tutorial_pages(&carry, &step_images)?;

    Ok((carry, renderer.finish()?))
}

/// Renders the post of the named carry as `<carry_name>-<page>.png` images in the output directory.
/// The intermediate PDF is removed once rasterized.
pub fn generate_post<S, R>(
    output_directory: &Path,
    carry_name: &str,
    configuration: &RenderConfiguration,
    storage: &S,
    records: &R,
) -> Result<Vec<PathBuf>, ContextError>
where
    S: ObjectStorage + ?Sized,
    R: RecordStore + ?Sized,
{
    let (carry, mut pdf_document) = render_post(carry_name, configuration, storage, records)?;

    create_output_directory(output_directory)?;
    let pdf_path = output_directory.join(format!("{}.pdf", carry.name));
    pdf_document.save_to_file(&pdf_path)?;
    log::info!("Post PDF successfully created: {:?}", pdf_path);

    let image_paths = source::rasterize_pages(&pdf_path, output_directory, &carry.name, POST_DPI)?;
    std::fs::remove_file(&pdf_path).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            format!("Unable to remove the intermediate PDF {:?}", pdf_path),
            &error,
        )
    })?;
    for image_path in &image_paths {
        log::info!("Post image created: {:?}", image_path);
    }

    Ok(image_paths)
}

/// Renders the cover and the tutorial of every carry having a tutorial, in store order.
pub fn render_book<S, R>(
    configuration: &RenderConfiguration,
    storage: &S,
    records: &R,
) -> Result<PdfDocument, ContextError>
where
    S: ObjectStorage + ?Sized,
    R: RecordStore + ?Sized,
{
    let carries = records
        .fetch_carries_with_tutorial_flag(true)?
        .iter()
        .map(Carry::from_raw)
        .collect::<Result<Vec<Carry>, ContextError>>()?;
    if carries.is_empty() {
        return Err(ContextError::with_context(
            ErrorKind::NotFound,
            "No carry with a tutorial was found in the database",
        ));
    }

    let mut renderer = Renderer::new(PageTemplate::book(), configuration, "book")?;
    for carry in &carries {
        log::info!("Generating {}", carry.name);
        let cover_image = load_cover_image(configuration, &carry.name)?;
        let step_images = download_step_images(&carry.name, storage, records)?;
        renderer.render_cover_page(carry, Some(&cover_image))?;
        renderer.render_tutorial_pages(carry, &step_images)?;
    }

    renderer.finish()
}

/// Renders the book to `<output_directory>/<output_file>` and returns its path.
pub fn generate_book<S, R>(
    output_directory: &Path,
    output_file: &str,
    configuration: &RenderConfiguration,
    storage: &S,
    records: &R,
) -> Result<PathBuf, ContextError>
where
    S: ObjectStorage + ?Sized,
    R: RecordStore + ?Sized,
{
    let mut pdf_document = render_book(configuration, storage, records)?;

    create_output_directory(output_directory)?;
    let pdf_path = output_directory.join(output_file);
    pdf_document.save_to_file(&pdf_path)?;
    log::info!("Combined PDF successfully created: {:?}", pdf_path);

    Ok(pdf_path)
}

fn load_cover_image(
    configuration: &RenderConfiguration,
    carry_name: &str,
) -> Result<DynamicImage, ContextError> {
    let cover_path = configuration.cover_image_path(carry_name);
    image::open(&cover_path).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            format!("Unable to load the cover image {:?}", cover_path),
            &error,
        )
    })
}

fn download_step_images<S, R>(
    carry_name: &str,
    storage: &S,
    records: &R,
) -> Result<Vec<DynamicImage>, ContextError>
where
    S: ObjectStorage + ?Sized,
    R: RecordStore + ?Sized,
{
    let step_urls = records.list_step_image_urls(carry_name)?;
    log::debug!("Downloading {} step images of {}", step_urls.len(), carry_name);

    step_urls
        .iter()
        .map(|step_url| {
            let bytes = storage.download(&step_url.signed_url)?;
            image::load_from_memory(&bytes).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Io,
                    format!("Unable to decode the step image {}", step_url.name),
                    &error,
                )
            })
        })
        .collect()
}

fn create_output_directory(output_directory: &Path) -> Result<(), ContextError> {
    std::fs::create_dir_all(output_directory).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            format!("Unable to create the output directory {:?}", output_directory),
            &error,
        )
    })
}
