//! Blocking client for the hosted database (PostgREST, `/rest/v1`) and its bucket (`/storage/v1`).

use std::collections::HashSet;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::carry::RawCarry;
use crate::configuration::Settings;
use crate::error::{ContextError, ErrorKind};
use crate::grid;
use crate::storage::{ObjectStorage, RecordStore, StepImageUrl};

/// Columns selected for every carry row.
const CARRY_COLUMNS: &str = "name,longtitle,position,size,mmposition,difficulty";

/// Validity of the signed step image links, in seconds.
const SIGNED_URL_EXPIRATION: u64 = 3600;

/// Number of objects listed per request, the listing is paged until a shorter page comes back.
const LIST_LIMIT: usize = 1000;

pub struct SupabaseClient {
    http_client: Client,
    settings: Settings,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    /// Folder being listed, the step images sit at the root of the bucket.
    prefix: &'a str,
    /// Server-side filter on the object names.
    search: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct StoredObject {
    name: String,
    #[serde(default)]
    metadata: Option<ObjectMetadata>,
}

#[derive(Debug, Deserialize)]
struct ObjectMetadata {
    #[serde(default)]
    mimetype: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
    paths: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SignedObject {
    path: Option<String>,
    #[serde(rename = "signedURL")]
    signed_url: Option<String>,
    error: Option<String>,
}

impl SupabaseClient {
    pub fn new(settings: Settings) -> Self {
        SupabaseClient {
            http_client: Client::new(),
            settings,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.settings.service_role_key)
            .bearer_auth(&self.settings.service_role_key)
    }

    fn rest_url(&self, query: &str) -> String {
        format!(
            "{}/rest/v1/{}?{}",
            self.settings.supabase_url, self.settings.table, query
        )
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.settings.supabase_url, path)
    }

    fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, ContextError> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|error| ContextError::with_error(ErrorKind::Io, context, &error))?;
        check_status(response, context)
    }

    /// Every object whose name starts with `prefix`, all pages included.
    fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>, ContextError> {
        let context = format!("Unable to list the bucket {}", self.settings.bucket);
        let objects = collect_listing(|offset| {
            let request = self
                .http_client
                .post(self.storage_url(&format!("object/list/{}", self.settings.bucket)))
                .json(&list_request(prefix, offset));
            self.send(request, &context)?
                .json::<Vec<StoredObject>>()
                .map_err(|error| ContextError::with_error(ErrorKind::Io, context.clone(), &error))
        })?;

        // The search matches anywhere in the name.
        Ok(objects
            .into_iter()
            .filter(|object| object.name.starts_with(prefix))
            .collect())
    }

    fn fetch_rows(&self, query: &str) -> Result<Vec<RawCarry>, ContextError> {
        let context = format!("Unable to query the table {}", self.settings.table);
        let request = self.http_client.get(self.rest_url(query));
        self.send(request, &context)?
            .json()
            .map_err(|error| ContextError::with_error(ErrorKind::Io, context, &error))
    }
}

impl ObjectStorage for SupabaseClient {
    fn list_existing_names(&self) -> Result<HashSet<String>, ContextError> {
        Ok(self
            .list_objects("")?
            .into_iter()
            .map(|object| object.name)
            .collect())
    }

    fn upload(
        &mut self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ContextError> {
        let request = self
            .http_client
            .post(self.storage_url(&format!(
                "object/{}/{}",
                self.settings.bucket,
                urlencoding::encode(name)
            )))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes.to_vec());
        self.send(request, &format!("Unable to upload {}", name))?;

        Ok(())
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ContextError> {
        let context = format!("Unable to download {}", url);
        let response = self
            .http_client
            .get(url)
            .send()
            .map_err(|error| ContextError::with_error(ErrorKind::Io, context.clone(), &error))?;
        let bytes = check_status(response, &context)?
            .bytes()
            .map_err(|error| ContextError::with_error(ErrorKind::Io, context, &error))?;

        Ok(bytes.to_vec())
    }
}

impl RecordStore for SupabaseClient {
    fn fetch_carries_with_tutorial_flag(
        &self,
        tutorial: bool,
    ) -> Result<Vec<RawCarry>, ContextError> {
        self.fetch_rows(&carries_query(tutorial))
    }

    fn fetch_carry_by_name(&self, name: &str) -> Result<Option<RawCarry>, ContextError> {
        Ok(self.fetch_rows(&carry_by_name_query(name))?.into_iter().next())
    }

    fn mark_tutorial_available(&mut self, name: &str) -> Result<(), ContextError> {
        let context = format!("Unable to mark the tutorial of {} as available", name);
        let request = self
            .http_client
            .patch(self.rest_url(&format!("name=eq.{}", urlencoding::encode(name))))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "tutorial": true }));
        let updated_rows: Vec<serde_json::Value> = self
            .send(request, &context)?
            .json()
            .map_err(|error| ContextError::with_error(ErrorKind::Io, context, &error))?;
        check_rows_updated(name, &updated_rows)?;
        log::info!("Marked the tutorial of {} as available", name);

        Ok(())
    }

    fn list_step_image_urls(&self, name: &str) -> Result<Vec<StepImageUrl>, ContextError> {
        let mut paths: Vec<String> = self
            .list_objects(&grid::step_prefix(name))?
            .into_iter()
            .filter(|object| {
                object
                    .metadata
                    .as_ref()
                    .and_then(|metadata| metadata.mimetype.as_deref())
                    .is_some_and(|mimetype| mimetype.starts_with("image/"))
            })
            .map(|object| object.name)
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let context = format!("Unable to sign the step images of {}", name);
        let request = self
            .http_client
            .post(self.storage_url(&format!("object/sign/{}", self.settings.bucket)))
            .json(&SignRequest {
                expires_in: SIGNED_URL_EXPIRATION,
                paths: &paths,
            });
        let signed_objects: Vec<SignedObject> = self
            .send(request, &context)?
            .json()
            .map_err(|error| ContextError::with_error(ErrorKind::Io, context.clone(), &error))?;

        paths
            .into_iter()
            .zip(signed_objects)
            .map(|(path, signed_object)| {
                match (signed_object.signed_url, signed_object.error) {
                    (Some(signed_url), None) => Ok(StepImageUrl {
                        name: signed_object.path.unwrap_or(path),
                        signed_url: format!("{}/storage/v1{}", self.settings.supabase_url, signed_url),
                    }),
                    (_, error) => Err(ContextError::with_context(
                        ErrorKind::Io,
                        format!("{}: {} ({})", context, path, error.unwrap_or_default()),
                    )),
                }
            })
            .collect()
    }
}

fn list_request(search: &str, offset: usize) -> ListRequest<'_> {
    ListRequest {
        prefix: "",
        search,
        limit: LIST_LIMIT,
        offset,
        sort_by: SortBy {
            column: "name",
            order: "asc",
        },
    }
}

/// Requests pages at increasing offsets until one comes back shorter than `LIST_LIMIT`.
fn collect_listing<T, F>(mut fetch_page: F) -> Result<Vec<T>, ContextError>
where
    F: FnMut(usize) -> Result<Vec<T>, ContextError>,
{
    let mut objects = Vec::new();
    loop {
        let page = fetch_page(objects.len())?;
        let page_length = page.len();
        objects.extend(page);
        if page_length < LIST_LIMIT {
            return Ok(objects);
        }
    }
}

/// A PATCH matching no row still succeeds, the returned representation tells them apart.
fn check_rows_updated(name: &str, updated_rows: &[serde_json::Value]) -> Result<(), ContextError> {
    if updated_rows.is_empty() {
        return Err(ContextError::with_context(
            ErrorKind::NotFound,
            format!("Carry with name {} not found in the database", name),
        ));
    }

    Ok(())
}

fn carries_query(tutorial: bool) -> String {
    format!("select={CARRY_COLUMNS}&tutorial=eq.{tutorial}")
}

fn carry_by_name_query(name: &str) -> String {
    format!(
        "select={CARRY_COLUMNS}&tutorial=eq.true&name=eq.{}&limit=1",
        urlencoding::encode(name)
    )
}

fn check_status(response: Response, context: &str) -> Result<Response, ContextError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();

    Err(ContextError::with_context(
        ErrorKind::Io,
        format!("{}: the server answered {} {}", context, status, body.trim()),
    ))
}
