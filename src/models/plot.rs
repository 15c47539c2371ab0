use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A grower's registered parcel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plot {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub owner_email: String,
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Plot {
    pub fn new(name: impl Into<String>, owner_email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            country_code: "SV".into(),
            latitude: None,
            longitude: None,
            owner_email: owner_email.into(),
            owner_name: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Coordinate query for this plot, `None` when either coordinate is missing.
    pub fn weather_query(&self) -> Option<WeatherQuery> {
        self.coordinates()
            .map(|(latitude, longitude)| WeatherQuery::Coordinates {
                latitude,
                longitude,
            })
    }

    /// Name used to greet the owner in notifications.
    pub fn owner_display(&self) -> &str {
        self.owner_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.owner_email)
    }
}

impl std::fmt::Display for Plot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.country_code)?;
        if let Some((lat, lon)) = self.coordinates() {
            write!(f, " {:.4},{:.4}", lat, lon)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WeatherQuery {
    Coordinates { latitude: f64, longitude: f64 },
    Place { city: String, country: String },
}

impl WeatherQuery {
    /// Value of the provider's `q` parameter.
    pub fn as_param(&self) -> String {
        match self {
            WeatherQuery::Coordinates {
                latitude,
                longitude,
            } => format!("{},{}", latitude, longitude),
            WeatherQuery::Place { city, country } => format!("{},{}", city, country),
        }
    }
}
