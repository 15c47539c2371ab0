use super::{Conditions, Rule};
use crate::models::RecommendationCategory;

/// Rain block rule - no irrigation after significant rain
///
/// Conditions:
/// - Accumulated rain >= 5mm
///
/// Takes precedence over every watering rule.
pub struct NoRainBlockRule;

pub const SIGNIFICANT_RAIN_MM: f64 = 5.0;

impl Rule for NoRainBlockRule {
    fn id(&self) -> &'static str {
        "no_rain_block"
    }

    fn name(&self) -> &'static str {
        "Significant Rain"
    }

    fn evaluate(&self, conditions: &Conditions) -> Option<RecommendationCategory> {
        (conditions.rain_mm >= SIGNIFICANT_RAIN_MM).then_some(RecommendationCategory::NoRainBlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(rain_mm: f64) -> Conditions {
        Conditions {
            temperature_c: 40.0,
            humidity_percent: 10.0,
            rain_mm,
        }
    }

    #[test]
    fn matches_from_five_millimetres() {
        assert_eq!(
            NoRainBlockRule.evaluate(&conditions(5.0)),
            Some(RecommendationCategory::NoRainBlock)
        );
        assert_eq!(
            NoRainBlockRule.evaluate(&conditions(42.0)),
            Some(RecommendationCategory::NoRainBlock)
        );
    }

    #[test]
    fn ignores_light_rain() {
        assert_eq!(NoRainBlockRule.evaluate(&conditions(4.99)), None);
        assert_eq!(NoRainBlockRule.evaluate(&conditions(0.0)), None);
    }
}
