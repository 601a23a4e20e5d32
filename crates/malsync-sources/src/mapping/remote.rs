use async_trait::async_trait;
use malsync_models::MappingKind;
use reqwest::Client;
use tracing::debug;
use crate::error::SourceError;
use crate::traits::MappingSource;

/// Community-maintained mapping tables served over HTTP
pub struct RemoteMappingSource {
    client: Client,
    tv_url: String,
    movie_url: String,
}

impl RemoteMappingSource {
    pub fn new(client: Client, tv_url: String, movie_url: String) -> Self {
        Self {
            client,
            tv_url,
            movie_url,
        }
    }

    fn url_for(&self, kind: MappingKind) -> &str {
        match kind {
            MappingKind::Tv => &self.tv_url,
            MappingKind::Movie => &self.movie_url,
        }
    }
}

#[async_trait]
impl MappingSource for RemoteMappingSource {
    fn source_name(&self) -> &str {
        "community"
    }

    async fn fetch(&self, kind: MappingKind) -> Result<Option<Vec<u8>>, SourceError> {
        let url = self.url_for(kind);
        debug!("Fetching community {} mapping table from {}", kind.as_str(), url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                context: format!("GET {}", url),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}
