use super::{Conditions, Rule};
use crate::models::RecommendationCategory;

/// Heavy watering rule - hot, dry and rainless
///
/// Conditions:
/// - Temperature > 33°C (33.0 itself does not qualify)
/// - Humidity < 40%
/// - Rain exactly 0mm
///
/// Any trace of rain below the rain-block threshold disables this rule.
pub struct HeavyWaterRule;

impl Rule for HeavyWaterRule {
    fn id(&self) -> &'static str {
        "heavy_water"
    }

    fn name(&self) -> &'static str {
        "Heavy Irrigation"
    }

    fn evaluate(&self, conditions: &Conditions) -> Option<RecommendationCategory> {
        let matches = conditions.temperature_c > 33.0
            && conditions.humidity_percent < 40.0
            && conditions.rain_mm == 0.0;

        matches.then_some(RecommendationCategory::HeavyWater)
    }
}
