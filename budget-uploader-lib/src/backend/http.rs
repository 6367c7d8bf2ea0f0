use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    Backend, CategoriesResponse, CategoryMap, Envelope, Error, SaveRequest, SaveResponse,
    StatementFile, UploadResponse,
};
use crate::transaction::Transaction;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

/// Backend reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend client for the given base url
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn decode<T: DeserializeOwned + Envelope>(response: Response) -> Result<T, Error> {
        let status = response.status();
        let body = response.bytes().await?;
        decode_body(status, &body)
    }
}

/// Decode a response envelope
///
/// A failure envelope wins over the HTTP status, a backend reporting failure with a 4xx still gets
/// its message surfaced. A non-2xx status is never a success, even under a success envelope.
pub(super) fn decode_body<T: DeserializeOwned + Envelope>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, Error> {
    match serde_json::from_slice::<T>(body) {
        Ok(envelope) if status.is_success() => envelope.into_result(),
        Ok(envelope) => envelope
            .into_result()
            .and_then(|_| Err(Error::Backend(format!("HTTP {status}")))),
        Err(_) if !status.is_success() => Err(Error::Backend(format!("HTTP {status}"))),
        Err(e) => Err(Error::Backend(format!("malformed response: {e}"))),
    }
}

#[async_trait(?Send)]
impl Backend for HttpBackend {
    async fn get_categories(&self) -> Result<CategoryMap, Error> {
        let response = self.client.get(self.url("get-categories")).send().await?;
        let categories = Self::decode::<CategoriesResponse>(response).await?;
        debug!("Loaded {} remembered categories", categories.memory.len());
        Ok(categories.memory)
    }

    async fn upload_pdf(&self, file: &StatementFile) -> Result<Vec<Transaction>, Error> {
        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = Form::new().part("file", part);
        let response = self
            .client
            .post(self.url("upload-pdf"))
            .multipart(form)
            .send()
            .await?;
        let upload = Self::decode::<UploadResponse>(response).await?;
        Ok(upload.into_transactions())
    }

    async fn save_category(&self, description: &str, category: &str) -> Result<(), Error> {
        let request = SaveRequest {
            description: description.into(),
            category: category.into(),
        };
        let response = self
            .client
            .post(self.url("save-category"))
            .json(&request)
            .send()
            .await?;
        Self::decode::<SaveResponse>(response).await?;
        Ok(())
    }
}
