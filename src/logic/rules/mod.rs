pub mod engine;
pub mod heavy_water;
pub mod light_water;
pub mod rain_block;

pub use engine::AdvisoryEngine;

use crate::models::RecommendationCategory;

/// Readings a rule is evaluated against. Absent values are already zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub rain_mm: f64,
}

impl Conditions {
    /// Missing (or NaN) inputs count as zero.
    pub fn normalized(
        temperature_c: Option<f64>,
        humidity_percent: Option<f64>,
        rain_mm: Option<f64>,
    ) -> Self {
        let zero_if_absent = |v: Option<f64>| v.filter(|x| !x.is_nan()).unwrap_or(0.0);
        Self {
            temperature_c: zero_if_absent(temperature_c),
            humidity_percent: zero_if_absent(humidity_percent),
            rain_mm: zero_if_absent(rain_mm),
        }
    }
}

/// Trait for irrigation advisory rules
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Category this rule yields when it matches
    fn evaluate(&self, conditions: &Conditions) -> Option<RecommendationCategory>;
}
