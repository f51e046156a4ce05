use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};

/// Bucket used when `SUPABASE_BUCKET` is not set.
pub const DEFAULT_BUCKET: &str = "tutorials";

/// Endpoint and credentials of the hosted database, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub supabase_url: String,
    pub service_role_key: String,
    pub table: String,
    pub bucket: String,
}

impl Settings {
    /// Reads the settings from the environment, after loading the `.env` file if there is one.
    pub fn from_environment() -> Result<Self, ContextError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded the environment from {:?}", path),
            Err(error) if error.not_found() => {}
            Err(error) => {
                return Err(ContextError::with_error(
                    ErrorKind::Configuration,
                    "Failed to parse the .env file",
                    &error,
                ))
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the settings from any key-value source.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ContextError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    ContextError::with_context(
                        ErrorKind::Configuration,
                        format!("The environment variable {} is not set", key),
                    )
                })
        };

        Ok(Settings {
            supabase_url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
            service_role_key: required("SERVICE_ROLE_KEY")?,
            table: required("SUPABASE_TABLE")?,
            bucket: lookup("SUPABASE_BUCKET")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        })
    }
}

/// Resources needed to render posts and books, read from a JSON file.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfiguration {
    pub font_associations: Vec<FontAssociation>,
    /// Directory holding the `<carry name>.png` cover images.
    pub covers_directory: PathBuf,
    pub signature: String,
    /// The QR codes point to `<carry_url_base>/<carry name>`.
    pub carry_url_base: String,
    #[serde(default)]
    pub fonts: FontRoles,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FontAssociation {
    pub font_family: String,
    pub font_file_path: PathBuf,
}

/// Which font family is used for which piece of text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FontRoles {
    pub title: String,
    pub finish: String,
    pub body: String,
    pub light: String,
    pub page_number: String,
}

impl Default for FontRoles {
    fn default() -> Self {
        FontRoles {
            title: "PlayfairDisplay".into(),
            finish: "NotoSerifDisplay-Italic".into(),
            body: "Poppins-Regular".into(),
            light: "Poppins-Light".into(),
            page_number: "AndaleMono".into(),
        }
    }
}

impl RenderConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        Self::from_json(&configuration_file_contents)
    }

    pub fn from_json(configuration_file_contents: &str) -> Result<Self, ContextError> {
        serde_json::from_str(configuration_file_contents).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Configuration,
                "Failed to parse the configuration file",
                &error,
            )
        })
    }

    pub fn get_font_path(&self, font_family: &str) -> Option<PathBuf> {
        self.font_associations
            .iter()
            .find(|font_association| font_association.font_family == font_family)
            .map(|font_association| font_association.font_file_path.clone())
    }

    pub fn cover_image_path(&self, carry_name: &str) -> PathBuf {
        self.covers_directory.join(format!("{carry_name}.png"))
    }

    pub fn carry_url(&self, carry_name: &str) -> String {
        format!("{}/{}", self.carry_url_base.trim_end_matches('/'), carry_name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const CONFIGURATION: &str = r#"{
        "fontAssociations": [
            { "fontFamily": "PlayfairDisplay", "fontFilePath": "fonts/PlayfairDisplay-Regular.ttf" },
            { "fontFamily": "Poppins-Light", "fontFilePath": "fonts/Poppins-Light.ttf" }
        ],
        "coversDirectory": "covers",
        "signature": "@PAULAFERMINCUETO",
        "carryUrlBase": "https://thewrappinggallery.com/carry/"
    }"#;

    #[test]
    fn configuration_is_parsed_with_default_font_roles() {
        let configuration = RenderConfiguration::from_json(CONFIGURATION).unwrap();

        assert_eq!(
            configuration.get_font_path("Poppins-Light"),
            Some(PathBuf::from("fonts/Poppins-Light.ttf"))
        );
        assert_eq!(configuration.get_font_path("Missing"), None);
        assert_eq!(configuration.fonts, FontRoles::default());
        assert_eq!(
            configuration.cover_image_path("giselles"),
            PathBuf::from("covers/giselles.png")
        );
        assert_eq!(
            configuration.carry_url("giselles"),
            "https://thewrappinggallery.com/carry/giselles"
        );
    }

    #[test]
    fn malformed_configuration_is_a_configuration_error() {
        let error = RenderConfiguration::from_json("{ \"fontAssociations\": 3 }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
    }

    #[test]
    fn settings_require_the_credentials() {
        let variables: HashMap<&str, &str> = [
            ("SUPABASE_URL", "https://example.supabase.co/"),
            ("SERVICE_ROLE_KEY", "secret"),
            ("SUPABASE_TABLE", "carries"),
        ]
        .into_iter()
        .collect();

        let settings =
            Settings::from_lookup(|key| variables.get(key).map(|value| value.to_string())).unwrap();
        assert_eq!(settings.supabase_url, "https://example.supabase.co");
        assert_eq!(settings.bucket, DEFAULT_BUCKET);

        let error = Settings::from_lookup(|key| {
            (key != "SERVICE_ROLE_KEY")
                .then(|| variables.get(key).map(|value| value.to_string()))
                .flatten()
        })
        .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
        assert!(error.context.contains("SERVICE_ROLE_KEY"));
    }
}
