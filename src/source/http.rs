use super::{AnalysisRequest, AnalysisSource};
use crate::core::config::SourceConfig;
use crate::core::plot::Plot;
use crate::data::response::AnalysisResponse;
use crate::{FieldError, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;

/// [`AnalysisSource`] over the analysis service's HTTP API.
///
/// The client is built on first use and reused for every request so TLS and
/// connection pool setup happen once.
pub struct HttpAnalysisSource {
    config: SourceConfig,
    client: OnceCell<reqwest::Client>,
}

impl HttpAnalysisSource {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn client(&self) -> Result<&reqwest::Client> {
        let client = self.client.get_or_try_init(|| {
            reqwest::Client::builder()
                .user_agent(self.config.user_agent.clone())
                .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
                .build()
        })?;
        Ok(client)
    }

    pub fn analysis_url(&self, request: &AnalysisRequest) -> String {
        self.config.url(self.config.endpoint(request.kind))
    }

    /// `<base_url>/plots/<plot_id>`, with the id percent-encoded as a single
    /// path segment.
    pub fn plot_url(&self, plot_id: &str) -> Result<reqwest::Url> {
        let invalid = || FieldError::InvalidConfig(format!("base_url '{}'", self.config.base_url));
        let mut url = reqwest::Url::parse(self.config.base_url.trim()).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("plots")
            .push(plot_id);
        Ok(url)
    }

    async fn get_bytes(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>> {
        let resp = request.send().await.map_err(FieldError::from)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FieldError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }
        let bytes = resp.bytes().await.map_err(FieldError::from)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AnalysisSource for HttpAnalysisSource {
    async fn fetch_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let url = self.analysis_url(request);
        log::debug!("GET {} for {}", url, request);
        let end_date = request.end_date.format("%Y-%m-%d").to_string();
        let builder = self.client()?.get(&url).query(&[
            ("plot_name", request.plot_id.as_str()),
            ("end_date", end_date.as_str()),
        ]);
        let bytes = self.get_bytes(builder, &url).await?;
        AnalysisResponse::from_slice(&bytes)
    }

    async fn fetch_plot(&self, plot_id: &str) -> Result<Plot> {
        let url = self.plot_url(plot_id)?;
        log::debug!("GET {}", url);
        let builder = self.client()?.get(url.as_str());
        let bytes = self.get_bytes(builder, url.as_str()).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        Plot::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::kind::LayerKind;
    use chrono::NaiveDate;

    #[test]
    fn test_urls_follow_config() {
        let mut config = SourceConfig::new("https://api.example.com/");
        config
            .endpoints
            .insert(LayerKind::Pest, "v2/pest".to_string());
        let source = HttpAnalysisSource::new(config);
        let date = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();

        assert_eq!(
            source.analysis_url(&AnalysisRequest::new("P1", LayerKind::Growth, date)),
            "https://api.example.com/analyze/growth"
        );
        assert_eq!(
            source.analysis_url(&AnalysisRequest::new("P1", LayerKind::Pest, date)),
            "https://api.example.com/v2/pest"
        );
        assert_eq!(
            source.plot_url("P1").unwrap().as_str(),
            "https://api.example.com/plots/P1"
        );
    }

    #[test]
    fn test_plot_id_stays_one_segment() {
        let source = HttpAnalysisSource::new(SourceConfig::new("https://api.example.com/v1"));
        assert_eq!(
            source.plot_url("P1/a?b").unwrap().as_str(),
            "https://api.example.com/v1/plots/P1%2Fa%3Fb"
        );
        assert_eq!(
            source.plot_url("north field#2").unwrap().as_str(),
            "https://api.example.com/v1/plots/north%20field%232"
        );

        let bad = HttpAnalysisSource::new(SourceConfig::new("not a url"));
        assert!(bad.plot_url("P1").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let mut config = SourceConfig::new("http://127.0.0.1:9");
        config.timeout_secs = 2;
        let source = HttpAnalysisSource::new(config);
        let date = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let result = source
            .fetch_analysis(&AnalysisRequest::new("P1", LayerKind::Growth, date))
            .await;
        assert!(result.is_err());
    }
}
