//! # Datasets
//!
//! Helpers around the local data directory:
//! - a small catalog of well-known NBA datasets on Kaggle
//! - a thin client that downloads a dataset archive and unpacks it into the
//!   data directory
//! - a listing of what is already there

use crate::error::{Error, ErrorKind, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Kaggle REST API root
pub const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1";

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const CATALOG: [DatasetEntry; 5] = [
    DatasetEntry {
        key: "1",
        name: "nathanlauga/nba-games",
        description: "NBA Games Data (games, teams, players stats)",
    },
    DatasetEntry {
        key: "2",
        name: "wyattowalsh/basketball",
        description: "Basketball Dataset (comprehensive NBA data)",
    },
    DatasetEntry {
        key: "3",
        name: "justinas/nba-players-data",
        description: "NBA Players Data (1996-2021)",
    },
    DatasetEntry {
        key: "4",
        name: "drgilermo/nba-players-stats",
        description: "NBA Players Stats (seasons data)",
    },
    DatasetEntry {
        key: "5",
        name: "schmadam97/nba-regular-season-stats-20182019",
        description: "NBA Regular Season Stats 2018-2019",
    },
];

/// The built-in catalog, in display order
pub fn catalog() -> &'static [DatasetEntry] {
    &CATALOG
}

/// Turn a user choice into a dataset name.
///
/// A catalog key picks that entry; anything shaped like `owner/slug` is taken
/// as given.
pub fn resolve(choice: &str) -> Result<String> {
    let choice = choice.trim();
    if let Some(entry) = CATALOG.iter().find(|e| e.key == choice) {
        return Ok(entry.name.to_string());
    }
    split_name(choice)?;
    Ok(choice.to_string())
}

/// Split `owner/slug`, rejecting anything else
fn split_name(name: &str) -> Result<(&str, &str)> {
    match name.split_once('/') {
        Some((owner, slug)) if !owner.is_empty() && !slug.is_empty() && !slug.contains('/') => {
            Ok((owner, slug))
        }
        _ => Err(Error::invalid_argument(format!(
            "expected a catalog number or 'owner/dataset', got '{}'",
            name
        ))
        .with_operation("dataset::resolve")),
    }
}

// ============================================================================
// Local files
// ============================================================================

/// A regular file in the data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataFile {
    pub name: String,
    pub size_bytes: u64,
}

/// Regular files directly inside `dir`, sorted by name.
///
/// One pass over the directory; sizes come from each entry's metadata.
pub fn list_data_files(dir: &Path) -> Result<Vec<DataFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::from(e)
            .with_operation("dataset::list_data_files")
            .with_context("dir", dir.display().to_string())
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push(DataFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            size_bytes: metadata.len(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Names of the `.csv` files in `dir`
pub fn csv_files(dir: &Path) -> Result<Vec<String>> {
    Ok(list_data_files(dir)?
        .into_iter()
        .map(|f| f.name)
        .filter(|name| name.to_ascii_lowercase().ends_with(".csv"))
        .collect())
}

// ============================================================================
// Kaggle
// ============================================================================

/// API credentials, in the shape of `~/.kaggle/kaggle.json`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl std::fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl KaggleCredentials {
    /// `$KAGGLE_CONFIG_DIR/kaggle.json`, else `~/.kaggle/kaggle.json`
    pub fn default_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("KAGGLE_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("kaggle.json"));
        }
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".kaggle").join("kaggle.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("KaggleCredentials::load")
                .with_context("path", path.display().to_string())
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::parse_failed(format!("invalid credentials file: {}", e))
                .with_operation("KaggleCredentials::load")
                .with_context("path", path.display().to_string())
                .set_source(e)
        })
    }

    /// `KAGGLE_USERNAME` + `KAGGLE_KEY` if both are set, else the credentials file
    pub fn discover() -> Result<Self> {
        if let (Ok(username), Ok(key)) = (std::env::var("KAGGLE_USERNAME"), std::env::var("KAGGLE_KEY")) {
            return Ok(Self { username, key });
        }
        let path = Self::default_path().ok_or_else(|| {
            Error::config_invalid("cannot locate home directory for kaggle.json")
                .with_operation("KaggleCredentials::discover")
        })?;
        Self::load(&path)
    }
}

/// Downloads dataset archives from the Kaggle API
pub struct KaggleClient {
    client: reqwest::Client,
    base_url: String,
    credentials: KaggleCredentials,
}

impl KaggleClient {
    pub fn new(credentials: KaggleCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: KAGGLE_API_BASE.to_string(),
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn download_url(&self, name: &str) -> Result<String> {
        let (owner, slug) = split_name(name)?;
        Ok(format!(
            "{}/datasets/download/{}/{}",
            self.base_url.trim_end_matches('/'),
            owner,
            slug
        ))
    }

    /// Download `name` into `dir` and unpack it there.
    ///
    /// The archive is streamed to `dir/<slug>.zip`, extracted next to it and
    /// then removed, whether extraction worked or not. `dir` is created if
    /// needed. Returns the paths of the extracted files.
    pub async fn download(&self, name: &str, dir: &Path) -> Result<Vec<PathBuf>> {
        let url = self.download_url(name)?;
        let (_, slug) = split_name(name)?;

        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            Error::from(e)
                .with_operation("KaggleClient::download")
                .with_context("dir", dir.display().to_string())
        })?;

        debug!(%url, "downloading dataset");
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.key))
            .send()
            .await
            .map_err(|e| {
                Error::new(ErrorKind::NetworkFailed, e.to_string())
                    .with_operation("KaggleClient::download")
                    .set_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let kind = match status.as_u16() {
                401 | 403 => ErrorKind::AuthenticationFailed,
                404 => ErrorKind::FileNotFound,
                429 => ErrorKind::RateLimited,
                _ => ErrorKind::NetworkFailed,
            };
            return Err(Error::new(kind, format!("dataset download failed: {}", status))
                .with_operation("KaggleClient::download")
                .with_context("dataset", name)
                .with_context("http_status", status.as_u16().to_string()));
        }

        let archive = dir.join(format!("{}.zip", slug));
        let written = match save_body(response, &archive).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&archive).await;
                return Err(e.with_operation("KaggleClient::download").with_context("dataset", name));
            }
        };
        info!(dataset = name, bytes = written, path = %archive.display(), "archive downloaded");

        let extracted = {
            let archive = archive.clone();
            let dir = dir.to_path_buf();
            tokio::task::spawn_blocking(move || extract_archive(&archive, &dir))
                .await
                .map_err(|e| {
                    Error::unexpected("archive extraction did not finish")
                        .with_operation("KaggleClient::download")
                        .set_source(e)
                })
                .and_then(|r| r)
        };
        tokio::fs::remove_file(&archive).await.map_err(|e| {
            Error::from(e)
                .with_operation("KaggleClient::download")
                .with_context("path", archive.display().to_string())
        })?;

        let files = extracted.map_err(|e| e.with_operation("KaggleClient::download"))?;
        info!(dataset = name, files = files.len(), dir = %dir.display(), "dataset extracted");
        Ok(files)
    }
}

/// Stream a response body into `path` chunk by chunk
async fn save_body(response: reqwest::Response, path: &Path) -> Result<u64> {
    let io_error = |e: std::io::Error| {
        Error::from(e)
            .with_operation("dataset::save_body")
            .with_context("path", path.display().to_string())
    };

    let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            Error::new(ErrorKind::NetworkFailed, e.to_string())
                .with_operation("dataset::save_body")
                .set_source(e)
        })?;
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;
    Ok(written)
}

/// Unpack a zip archive into `dir`. Entries that would land outside `dir`
/// are refused by the zip reader.
fn extract_archive(archive: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
    let zip_error = |e: zip::result::ZipError| {
        Error::parse_failed(format!("invalid dataset archive: {}", e))
            .with_operation("dataset::extract_archive")
            .with_context("path", archive.display().to_string())
            .set_source(e)
    };

    let file = std::fs::File::open(archive).map_err(|e| {
        Error::from(e)
            .with_operation("dataset::extract_archive")
            .with_context("path", archive.display().to_string())
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(zip_error)?;

    let mut files: Vec<PathBuf> = zip
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(|name| dir.join(name))
        .collect();
    files.sort();

    zip.extract(dir).map_err(zip_error)?;
    Ok(files)
}
