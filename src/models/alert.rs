use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Irrigation,
    Fertilizer,
    Pest,
    General,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Irrigation => "irrigation",
            AlertType::Fertilizer => "fertilizer",
            AlertType::Pest => "pest",
            AlertType::General => "general",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertType::Irrigation => "Irrigation",
            AlertType::Fertilizer => "Fertilizer",
            AlertType::Pest => "Pest / Disease",
            AlertType::General => "General",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "irrigation" => Some(AlertType::Irrigation),
            "fertilizer" => Some(AlertType::Fertilizer),
            "pest" => Some(AlertType::Pest),
            "general" => Some(AlertType::General),
            _ => None,
        }
    }

    pub fn all() -> &'static [AlertType] {
        &[
            AlertType::Irrigation,
            AlertType::Fertilizer,
            AlertType::Pest,
            AlertType::General,
        ]
    }

    /// Types an automatic alert is deduplicated against. Pest alerts are
    /// raised by hand and never suppress a weather-driven one.
    pub fn dedup_scope() -> &'static [AlertType] {
        &[AlertType::Irrigation, AlertType::Fertilizer, AlertType::General]
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Option<i64>,
    pub plot_id: i64,
    pub alert_type: AlertType,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub notified: bool,
    pub resolved: bool,
    pub user_response: String,
}

impl AlertRecord {
    pub fn new(plot_id: i64, alert_type: AlertType, message: impl Into<String>) -> Self {
        Self {
            id: None,
            plot_id,
            alert_type,
            message: message.into(),
            created_at: Utc::now(),
            notified: false,
            resolved: false,
            user_response: String::new(),
        }
    }

    pub fn with_notified(mut self, notified: bool) -> Self {
        self.notified = notified;
        self
    }

    /// Mark resolved and overwrite the response. Calling it again only
    /// replaces the response.
    pub fn resolve(&mut self, response: impl Into<String>) {
        self.resolved = true;
        self.user_response = response.into();
    }

    pub fn is_open(&self) -> bool {
        !self.resolved
    }
}

/// Outcome of comparing a recommendation with a plot's open alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AlertDecision {
    NoAction,
    CreateAlert {
        alert_type: AlertType,
        message: String,
    },
}

impl AlertDecision {
    pub fn is_create(&self) -> bool {
        matches!(self, AlertDecision::CreateAlert { .. })
    }
}

/// Action a grower reports against a plot's alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Applied,
    NotApplied,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Applied => "applied",
            UserAction::NotApplied => "not_applied",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "applied" | "fertilizer_applied" | "abono_aplicado" => Some(UserAction::Applied),
            "not_applied" | "no_aplicado" => Some(UserAction::NotApplied),
            _ => None,
        }
    }

    /// Message stored on the synthesized alert when no open one exists.
    pub fn manual_message(&self) -> String {
        format!("Manual response: {}", self.as_str())
    }
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
