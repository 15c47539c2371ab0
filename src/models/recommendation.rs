use super::alert::AlertType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    NoRainBlock,
    HeavyWater,
    LightWater,
    Hold,
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::NoRainBlock => "no_rain_block",
            RecommendationCategory::HeavyWater => "heavy_water",
            RecommendationCategory::LightWater => "light_water",
            RecommendationCategory::Hold => "hold",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "no_rain_block" | "norainblock" => Some(RecommendationCategory::NoRainBlock),
            "heavy_water" | "heavywater" => Some(RecommendationCategory::HeavyWater),
            "light_water" | "lightwater" => Some(RecommendationCategory::LightWater),
            "hold" => Some(RecommendationCategory::Hold),
            _ => None,
        }
    }

    pub fn all() -> &'static [RecommendationCategory] {
        &[
            RecommendationCategory::NoRainBlock,
            RecommendationCategory::HeavyWater,
            RecommendationCategory::LightWater,
            RecommendationCategory::Hold,
        ]
    }

    /// Grower-facing message for this category.
    pub fn message(&self) -> &'static str {
        match self {
            RecommendationCategory::NoRainBlock => {
                "significant rain detected, do not irrigate today."
            }
            RecommendationCategory::HeavyWater => {
                "high temperature and low humidity with no rain; irrigate 15–20mm at first light."
            }
            RecommendationCategory::LightWater => {
                "warm conditions with moderate humidity; apply light irrigation of 5–10mm."
            }
            RecommendationCategory::Hold => {
                "no critical conditions; continue monitoring, postpone irrigation."
            }
        }
    }

    /// Watering band the category belongs to.
    pub fn band(&self) -> &'static str {
        match self {
            RecommendationCategory::NoRainBlock => "no-water",
            RecommendationCategory::HeavyWater => "heavy-water",
            RecommendationCategory::LightWater => "light-water",
            RecommendationCategory::Hold => "hold",
        }
    }

    /// Alert type raised for this category, `None` when it needs no attention.
    pub fn alert_type(&self) -> Option<AlertType> {
        match self {
            RecommendationCategory::HeavyWater | RecommendationCategory::LightWater => {
                Some(AlertType::Irrigation)
            }
            RecommendationCategory::NoRainBlock | RecommendationCategory::Hold => None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.alert_type().is_some()
    }
}

impl std::fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub message: String,
}

impl Recommendation {
    pub fn new(category: RecommendationCategory) -> Self {
        Self {
            category,
            message: category.message().to_string(),
        }
    }

    pub fn band(&self) -> &'static str {
        self.category.band()
    }

    pub fn is_critical(&self) -> bool {
        self.category.is_critical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_str_valid() {
        assert_eq!(
            RecommendationCategory::from_str("no_rain_block"),
            Some(RecommendationCategory::NoRainBlock)
        );
        assert_eq!(
            RecommendationCategory::from_str("heavy-water"),
            Some(RecommendationCategory::HeavyWater)
        );
        assert_eq!(
            RecommendationCategory::from_str("Light Water"),
            Some(RecommendationCategory::LightWater)
        );
        assert_eq!(
            RecommendationCategory::from_str("HOLD"),
            Some(RecommendationCategory::Hold)
        );
    }

    #[test]
    fn category_from_str_invalid() {
        assert_eq!(RecommendationCategory::from_str(""), None);
        assert_eq!(RecommendationCategory::from_str("water"), None);
    }

    #[test]
    fn category_round_trip_through_storage_tag() {
        for category in RecommendationCategory::all() {
            assert_eq!(
                RecommendationCategory::from_str(category.as_str()),
                Some(*category),
                "Round-trip failed for {:?}",
                category
            );
        }
    }

    #[test]
    fn only_watering_categories_are_critical() {
        assert!(RecommendationCategory::HeavyWater.is_critical());
        assert!(RecommendationCategory::LightWater.is_critical());
        assert!(!RecommendationCategory::NoRainBlock.is_critical());
        assert!(!RecommendationCategory::Hold.is_critical());
        assert_eq!(
            RecommendationCategory::LightWater.alert_type(),
            Some(AlertType::Irrigation)
        );
    }

    #[test]
    fn recommendation_carries_category_message() {
        let rec = Recommendation::new(RecommendationCategory::Hold);
        assert_eq!(rec.message, RecommendationCategory::Hold.message());
        assert_eq!(rec.band(), "hold");
    }

    #[test]
    fn serializes_as_snake_case_tag() {
        let json = serde_json::to_string(&RecommendationCategory::NoRainBlock).unwrap();
        assert_eq!(json, "\"no_rain_block\"");
    }
}
