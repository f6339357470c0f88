use std::fmt;
use std::path::{Component, Path, PathBuf};

use image::RgbImage;
use reqwest::Client as HttpClient;
use reqwest::header::AUTHORIZATION;
use url::Url;

/// Path prefixes Label Studio serves itself.
const HOST_RELATIVE_PREFIXES: [&str; 2] = ["/data/", "/storage-data/"];
const LOCAL_FILES_PREFIX: &str = "/data/local-files/";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Image download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' is served by Label Studio but LABEL_STUDIO_HOST is not set")]
    MissingHost(String),
    #[error("'{0}' escapes the local files document root")]
    OutsideRoot(String),
    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Where Label Studio keeps the files it serves.
#[derive(Clone, Default)]
pub struct LabelStudioFiles {
    pub host: Option<Url>,
    pub access_token: Option<String>,
    pub document_root: Option<PathBuf>,
}

impl fmt::Debug for LabelStudioFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelStudioFiles")
            .field("host", &self.host.as_ref().map(Url::as_str))
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("document_root", &self.document_root)
            .finish()
    }
}

#[derive(Clone)]
pub struct ImageLoader {
    http_client: HttpClient,
    files: LabelStudioFiles,
}

/// True for locations any HTTP client can fetch without Label Studio credentials.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn is_host_relative(location: &str) -> bool {
    HOST_RELATIVE_PREFIXES.iter().any(|p| location.starts_with(p))
}

/// Relative path carried by a `/data/local-files/?d=<path>` URL.
fn local_files_path(location: &str) -> Option<String> {
    let query = location.strip_prefix(LOCAL_FILES_PREFIX)?;
    let (_, encoded) = query.split_once("d=")?;
    let encoded = encoded.split('&').next().unwrap_or_default();
    urlencoding::decode(encoded).ok().map(|p| p.into_owned())
}

impl ImageLoader {
    pub fn new(files: LabelStudioFiles) -> Self {
        Self {
            http_client: HttpClient::new(),
            files,
        }
    }

    pub async fn load(&self, location: &str) -> Result<RgbImage, LoadError> {
        let bytes = self.fetch(location).await?;
        Ok(image::load_from_memory(&bytes)?.to_rgb8())
    }

    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError> {
        if is_remote(location) {
            return self.download(location, None).await;
        }
        if !is_host_relative(location) {
            return read_file(Path::new(location)).await;
        }

        if let (Some(root), Some(relative)) =
            (self.files.document_root.as_deref(), local_files_path(location))
        {
            let relative = Path::new(&relative);
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
            {
                return Err(LoadError::OutsideRoot(location.to_string()));
            }
            return read_file(&root.join(relative)).await;
        }

        let host = self
            .files
            .host
            .as_ref()
            .ok_or_else(|| LoadError::MissingHost(location.to_string()))?;
        let url = format!("{}{}", host.as_str().trim_end_matches('/'), location);
        self.download(&url, self.files.access_token.as_deref()).await
    }

    async fn download(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, LoadError> {
        log::debug!("Downloading image from {}", url);
        let mut request = self.http_client.get(url);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Token {}", token));
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}
