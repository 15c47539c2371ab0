pub mod gemini;
pub mod mailer;
pub mod weatherapi;

pub use gemini::GeminiClient;
pub use mailer::HttpMailer;
pub use weatherapi::WeatherApiClient;

use crate::error::Result;
use crate::models::{Plot, WeatherQuery, WeatherReading};
use async_trait::async_trait;
use serde::Serialize;

/// Source of current conditions for a location.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_current(&self, query: &WeatherQuery) -> Result<WeatherReading>;
}

/// Free-text assistant consulted during scheduled sweeps. Its answers are
/// advisory only.
#[async_trait]
pub trait AiAdvisor: Send + Sync {
    async fn ask(&self, question: &str, context: &PlotContext) -> Result<String>;
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct PlotContext {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<&Plot> for PlotContext {
    fn from(plot: &Plot) -> Self {
        Self {
            name: plot.name.clone(),
            latitude: plot.latitude,
            longitude: plot.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}
