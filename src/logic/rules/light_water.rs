use super::{Conditions, Rule};
use crate::models::RecommendationCategory;

/// Light watering rule - warm with moderate humidity
///
/// Conditions:
/// - 28°C <= temperature <= 33°C
/// - Humidity < 50%
/// - Rain exactly 0mm
pub struct LightWaterRule;

impl Rule for LightWaterRule {
    fn id(&self) -> &'static str {
        "light_water"
    }

    fn name(&self) -> &'static str {
        "Light Irrigation"
    }

    fn evaluate(&self, conditions: &Conditions) -> Option<RecommendationCategory> {
        let matches = (28.0..=33.0).contains(&conditions.temperature_c)
            && conditions.humidity_percent < 50.0
            && conditions.rain_mm == 0.0;

        matches.then_some(RecommendationCategory::LightWater)
    }
}
