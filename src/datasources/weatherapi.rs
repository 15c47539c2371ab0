use super::WeatherProvider;
use crate::config::WeatherApiConfig;
use crate::error::{AgroError, Result};
use crate::models::{kph_to_ms, WeatherQuery, WeatherReading};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

const API_BASE_URL: &str = "https://api.weatherapi.com/v1";

pub struct WeatherApiClient {
    client: reqwest::Client,
    config: WeatherApiConfig,
    base_url: String,
}

// WeatherAPI current.json response structures
#[derive(Debug, Deserialize)]
struct WapiResponse {
    #[serde(default)]
    location: Option<WapiLocation>,
    #[serde(default)]
    current: Option<WapiCurrent>,
}

#[derive(Debug, Deserialize)]
struct WapiLocation {
    name: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct WapiCurrent {
    #[serde(default)]
    temp_c: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    precip_mm: Option<f64>,
    #[serde(default)]
    wind_kph: Option<f64>,
}

impl WeatherApiClient {
    pub fn new(config: WeatherApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: API_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn current_url(&self, query: &WeatherQuery) -> Result<reqwest::Url> {
        reqwest::Url::parse_with_params(
            &format!("{}/current.json", self.base_url),
            &[
                ("q", query.as_param()),
                ("key", self.config.api_key.clone()),
                ("aqi", "no".to_string()),
            ],
        )
        .map_err(|e| AgroError::Config(format!("Invalid WeatherAPI URL: {}", e)))
    }

    /// Test connection to WeatherAPI
    pub async fn test_connection(&self, query: &WeatherQuery) -> Result<bool> {
        let url = self.current_url(query)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AgroError::DataSourceUnavailable(format!("WeatherAPI: {}", e)))?;

        Ok(response.status().is_success())
    }

    fn convert_response(response: WapiResponse) -> Result<WeatherReading> {
        let current = response.current.ok_or_else(|| {
            AgroError::DataSourceUnavailable(
                "Unexpected WeatherAPI response: missing 'current' block".into(),
            )
        })?;

        Ok(WeatherReading {
            timestamp: Utc::now(),
            temperature_c: current.temp_c,
            humidity_percent: current.humidity,
            rain_mm: Some(current.precip_mm.unwrap_or(0.0)),
            wind_ms: Some(kph_to_ms(current.wind_kph.unwrap_or(0.0))),
            location: response.location.map(|l| {
                if l.country.is_empty() {
                    l.name
                } else {
                    format!("{}, {}", l.name, l.country)
                }
            }),
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn fetch_current(&self, query: &WeatherQuery) -> Result<WeatherReading> {
        let url = self.current_url(query)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AgroError::DataSourceUnavailable(format!("WeatherAPI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgroError::DataSourceUnavailable(format!(
                "WeatherAPI returned {}: {}",
                status, body
            )));
        }

        let wapi_response: WapiResponse = response.json().await.map_err(|e| {
            AgroError::DataSourceUnavailable(format!("Failed to parse WeatherAPI response: {}", e))
        })?;

        Self::convert_response(wapi_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> WeatherApiConfig {
        WeatherApiConfig {
            api_key: "test_key".to_string(),
            timeout_secs: 8,
        }
    }

    #[test]
    fn url_carries_query_key_and_aqi() {
        let client = WeatherApiClient::new(sample_config()).unwrap();
        let url = client
            .current_url(&WeatherQuery::Place {
                city: "San Miguel".into(),
                country: "SV".into(),
            })
            .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(url.as_str().starts_with("https://api.weatherapi.com/v1/current.json?"));
        assert!(pairs.contains(&("q".into(), "San Miguel,SV".into())));
        assert!(pairs.contains(&("key".into(), "test_key".into())));
        assert!(pairs.contains(&("aqi".into(), "no".into())));
    }

    #[test]
    fn converts_current_block() {
        let json = r#"{
            "location": {"name": "Sonsonate", "country": "El Salvador"},
            "current": {"temp_c": 35.0, "humidity": 30, "precip_mm": 0.0, "wind_kph": 18.0}
        }"#;
        let response: WapiResponse = serde_json::from_str(json).unwrap();
        let reading = WeatherApiClient::convert_response(response).unwrap();
        assert_eq!(reading.temperature_c, Some(35.0));
        assert_eq!(reading.humidity_percent, Some(30.0));
        assert_eq!(reading.rain_mm, Some(0.0));
        assert!((reading.wind_ms.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(reading.location.as_deref(), Some("Sonsonate, El Salvador"));
    }

    #[test]
    fn missing_fields_keep_temperature_absent_and_zero_rain() {
        let json = r#"{"current": {}}"#;
        let response: WapiResponse = serde_json::from_str(json).unwrap();
        let reading = WeatherApiClient::convert_response(response).unwrap();
        assert!(reading.temperature_c.is_none());
        assert!(reading.humidity_percent.is_none());
        assert_eq!(reading.rain_mm, Some(0.0));
        assert_eq!(reading.wind_ms, Some(0.0));
        assert!(reading.location.is_none());
    }

    #[test]
    fn missing_current_block_is_unavailable() {
        let response: WapiResponse =
            serde_json::from_str(r#"{"error": {"code": 1006}}"#).unwrap();
        assert!(matches!(
            WeatherApiClient::convert_response(response),
            Err(AgroError::DataSourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        let client = WeatherApiClient::new(WeatherApiConfig {
            api_key: "k".into(),
            timeout_secs: 1,
        })
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
        let result = client
            .fetch_current(&WeatherQuery::Coordinates {
                latitude: 0.0,
                longitude: 0.0,
            })
            .await;
        assert!(matches!(result, Err(AgroError::DataSourceUnavailable(_))));
    }
}
