//! The remote collaborators: the bucket holding the step images and the table holding the carries.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::carry::RawCarry;
use crate::error::{ContextError, ErrorKind};

/// A signed, time-limited link to one step image in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepImageUrl {
    pub name: String,
    pub signed_url: String,
}

/// Object storage that never overwrites what it already holds.
pub trait ObjectStorage {
    /// Names of every object currently stored.
    fn list_existing_names(&self) -> Result<HashSet<String>, ContextError>;

    /// Stores the bytes under the given name.
    fn upload(&mut self, name: &str, bytes: &[u8], content_type: &str)
        -> Result<(), ContextError>;

    /// Fetches the bytes behind a signed URL.
    fn download(&self, url: &str) -> Result<Vec<u8>, ContextError>;
}

/// The table of carries.
pub trait RecordStore {
    fn fetch_carries_with_tutorial_flag(
        &self,
        tutorial: bool,
    ) -> Result<Vec<RawCarry>, ContextError>;

    fn fetch_carry_by_name(&self, name: &str) -> Result<Option<RawCarry>, ContextError>;

    /// Sets the tutorial flag of the carry, `NotFound` if no row has this name.
    fn mark_tutorial_available(&mut self, name: &str) -> Result<(), ContextError>;

    /// Step images of the carry, i.e. image objects named `<name>_step*`, sorted by name.
    fn list_step_image_urls(&self, name: &str) -> Result<Vec<StepImageUrl>, ContextError>;
}

/// What happened to a file handed to `upload_files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// A file with the same name was already stored, nothing was sent.
    Skipped,
}

/// Uploads the files in the given order under their file names, skipping the names already stored.
pub fn upload_files<S: ObjectStorage + ?Sized>(
    storage: &mut S,
    paths: &[impl AsRef<Path>],
    content_type: &str,
) -> Result<Vec<UploadOutcome>, ContextError> {
    let mut existing_names = storage.list_existing_names()?;
    let mut outcomes = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ContextError::with_context(
                    ErrorKind::Io,
                    format!("The path {:?} has no usable file name", path),
                )
            })?
            .to_string();

        if existing_names.contains(&name) {
            log::info!("{} already exists in the bucket, skipping it", name);
            outcomes.push(UploadOutcome::Skipped);
            continue;
        }

        let bytes = std::fs::read(path).map_err(|error| {
            ContextError::with_error(ErrorKind::Io, format!("Unable to read {:?}", path), &error)
        })?;
        storage.upload(&name, &bytes, content_type)?;
        log::info!("Uploaded {}", name);
        existing_names.insert(name);
        outcomes.push(UploadOutcome::Uploaded);
    }

    Ok(outcomes)
}
