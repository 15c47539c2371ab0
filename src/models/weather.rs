use super::recommendation::{Recommendation, RecommendationCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions as reported by the weather provider. Any field may be
/// missing from the upstream payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReading {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub rain_mm: Option<f64>,
    pub wind_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl WeatherReading {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            temperature_c: None,
            humidity_percent: None,
            rain_mm: None,
            wind_ms: None,
            location: None,
        }
    }

    pub fn with_values(temperature_c: f64, humidity_percent: f64, rain_mm: f64) -> Self {
        Self {
            temperature_c: Some(temperature_c),
            humidity_percent: Some(humidity_percent),
            rain_mm: Some(rain_mm),
            ..Self::new()
        }
    }
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only history sample stored for each accepted reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: Option<i64>,
    pub plot_id: i64,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub rain_mm: Option<f64>,
    pub wind_ms: Option<f64>,
    pub category: Option<RecommendationCategory>,
    pub recommendation: String,
}

impl WeatherRecord {
    pub fn from_reading(
        plot_id: i64,
        reading: &WeatherReading,
        recommendation: &Recommendation,
    ) -> Self {
        Self {
            id: None,
            plot_id,
            timestamp: reading.timestamp,
            temperature_c: reading.temperature_c,
            humidity_percent: reading.humidity_percent,
            rain_mm: reading.rain_mm,
            wind_ms: reading.wind_ms,
            category: Some(recommendation.category),
            recommendation: recommendation.message.clone(),
        }
    }
}

pub fn kph_to_ms(kph: f64) -> f64 {
    kph / 3.6
}
