use super::{
    heavy_water::HeavyWaterRule, light_water::LightWaterRule, rain_block::NoRainBlockRule,
    Conditions, Rule,
};
use crate::models::{Recommendation, RecommendationCategory, WeatherReading};

/// Ordered rule list; the first rule that matches decides the recommendation.
pub struct AdvisoryEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl AdvisoryEngine {
    pub fn new() -> Self {
        // Order matters: the rules overlap and rain always wins.
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(NoRainBlockRule),
            Box::new(HeavyWaterRule),
            Box::new(LightWaterRule),
        ];

        Self { rules }
    }

    pub fn evaluate(&self, conditions: &Conditions) -> Recommendation {
        let category = self
            .rules
            .iter()
            .find_map(|rule| {
                let category = rule.evaluate(conditions)?;
                tracing::debug!(rule = rule.id(), name = rule.name(), "Advisory rule matched");
                Some(category)
            })
            .unwrap_or(RecommendationCategory::Hold);

        Recommendation::new(category)
    }

    pub fn recommend(
        &self,
        temperature_c: Option<f64>,
        humidity_percent: Option<f64>,
        rain_mm: Option<f64>,
    ) -> Recommendation {
        self.evaluate(&Conditions::normalized(
            temperature_c,
            humidity_percent,
            rain_mm,
        ))
    }

    pub fn evaluate_reading(&self, reading: &WeatherReading) -> Recommendation {
        self.recommend(
            reading.temperature_c,
            reading.humidity_percent,
            reading.rain_mm,
        )
    }
}

impl Default for AdvisoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Irrigation recommendation for a single set of readings.
pub fn recommend(
    temperature_c: Option<f64>,
    humidity_percent: Option<f64>,
    rain_mm: Option<f64>,
) -> Recommendation {
    AdvisoryEngine::new().recommend(temperature_c, humidity_percent, rain_mm)
}
