use std::fs;
use std::io;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tempfile::Builder;

use crate::domain::Identifier;
use crate::error::MinerError;

pub trait ResultsClient {
    /// Fetches the result archive for `id` and writes it to `destination`.
    /// The file only appears once the whole body has been received.
    fn download(&self, id: &Identifier, destination: &Utf8Path) -> Result<(), MinerError>;
}

#[derive(Clone)]
pub struct ItasserHttpClient {
    client: Client,
    base_url: String,
}

impl ItasserHttpClient {
    pub fn new(base_url: &str) -> Result<Self, MinerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("itasser-miner/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MinerError::ItasserHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| MinerError::ItasserHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn archive_url(&self, id: &Identifier) -> String {
        format!("{}/{id}/{id}_results.tar.bz2", self.base_url)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, MinerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(MinerError::ItasserStatus {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}

impl ResultsClient for ItasserHttpClient {
    fn download(&self, id: &Identifier, destination: &Utf8Path) -> Result<(), MinerError> {
        let url = self.archive_url(id);
        tracing::debug!(%url, "fetching result archive");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| MinerError::ItasserHttp(err.to_string()))?;
        let mut response = Self::handle_status(response)?;

        let parent = destination
            .parent()
            .ok_or_else(|| MinerError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(&format!(".{id}"))
            .suffix(".part")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| MinerError::ItasserHttp(err.to_string()))?;
        temp.persist(destination.as_std_path())
            .map_err(|err| MinerError::Filesystem(format!("persist {destination}: {err}")))?;
        Ok(())
    }
}
