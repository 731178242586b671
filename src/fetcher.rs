// Product page download
use crate::model::{FetchError, PageDocument};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageDocument, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<PageDocument, FetchError> {
        info!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept-Language", "en-IN,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            warn!("❌ Page responded [{}]: {}", status, final_url);
            return Err(FetchError::InvalidResponse {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let html = response.text().await?;
        info!("Fetched {} bytes from {}", html.len(), final_url);
        Ok(PageDocument {
            url: final_url,
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_page_with_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dp/ABC"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/dp/ABC", server.uri());
        let page = HttpFetcher::new("product-lens-test/0.1")
            .unwrap()
            .fetch(&url)
            .await
            .unwrap();

        assert_eq!(page.url, url);
        assert_eq!(page.html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = HttpFetcher::new("product-lens-test/0.1")
            .unwrap()
            .fetch(&format!("{}/dp/ABC", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse { status: 503, .. }), "got: {err:?}");
    }
}
