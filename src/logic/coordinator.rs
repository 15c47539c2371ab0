use crate::db::Database;
use crate::error::{AgroError, Result};
use crate::models::{AlertDecision, AlertRecord, AlertType, Plot, Recommendation, UserAction};
use serde::Serialize;

/// Decide whether a recommendation warrants a new alert given the plot's
/// latest open alert.
///
/// Only irrigation categories produce alerts on their own. `escalate` lets an
/// AI "alert" verdict raise a general alert for any other category; nothing
/// suppresses a critical one. An open alert with the identical message means
/// the grower has already been told.
pub fn decide(
    latest_open: Option<&AlertRecord>,
    recommendation: &Recommendation,
    escalate: bool,
) -> AlertDecision {
    let alert_type = if recommendation.is_critical() {
        recommendation
            .category
            .alert_type()
            .unwrap_or(AlertType::General)
    } else if escalate {
        AlertType::General
    } else {
        return AlertDecision::NoAction;
    };

    if latest_open.is_some_and(|alert| alert.message == recommendation.message) {
        return AlertDecision::NoAction;
    }

    AlertDecision::CreateAlert {
        alert_type,
        message: recommendation.message.clone(),
    }
}

/// How the AI assistant answered "should the grower be alerted?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AiVerdict {
    Alert,
    NoAlert,
    Ambiguous,
    Unavailable,
}

impl AiVerdict {
    /// Classify a free-text answer by its first word.
    pub fn from_answer(answer: &str) -> Self {
        let first_word = answer
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            .map(str::to_lowercase);

        match first_word.as_deref() {
            Some("sí" | "si" | "yes" | "alert") => AiVerdict::Alert,
            Some("no") => AiVerdict::NoAlert,
            _ => AiVerdict::Ambiguous,
        }
    }

    pub fn escalates(&self) -> bool {
        matches!(self, AiVerdict::Alert)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AiVerdict::Alert => "alert",
            AiVerdict::NoAlert => "no_alert",
            AiVerdict::Ambiguous => "ambiguous",
            AiVerdict::Unavailable => "unavailable",
        }
    }
}

/// Owns the alert lifecycle for plots: dedup, creation and resolution.
#[derive(Clone)]
pub struct AlertCoordinator {
    db: Database,
}

impl AlertCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// What `evaluate_and_record` would do right now, without writing.
    pub fn evaluate(&self, plot: &Plot, recommendation: &Recommendation) -> Result<AlertDecision> {
        let plot_id = saved_plot_id(plot)?;
        let latest = self
            .db
            .latest_open_alert(plot_id, AlertType::dedup_scope())?;
        Ok(decide(latest.as_ref(), recommendation, false))
    }

    /// Run the decision and persist the alert it calls for. The read and the
    /// insert share one transaction, so concurrent callers for the same plot
    /// cannot both create an alert for the same message.
    pub fn evaluate_and_record(
        &self,
        plot: &Plot,
        recommendation: &Recommendation,
        escalate: bool,
        notified: bool,
    ) -> Result<Option<AlertRecord>> {
        let plot_id = saved_plot_id(plot)?;
        let (decision, created) = self.db.apply_alert_decision(
            plot_id,
            AlertType::dedup_scope(),
            notified,
            |latest| decide(latest, recommendation, escalate),
        )?;

        match &created {
            Some(alert) => tracing::info!(
                plot = %plot.name,
                alert_id = ?alert.id,
                alert_type = alert.alert_type.as_str(),
                "Created alert"
            ),
            None => tracing::debug!(plot = %plot.name, ?decision, "No new alert"),
        }

        Ok(created)
    }

    /// Mark an alert resolved with the grower's response. Resolving an
    /// already-resolved alert only replaces the response.
    pub fn resolve(&self, alert_id: i64, response: &str) -> Result<AlertRecord> {
        let mut alert = self
            .db
            .get_alert(alert_id)?
            .ok_or_else(|| AgroError::NotFound(format!("alert {}", alert_id)))?;

        if alert.resolved {
            tracing::debug!(alert_id, "Alert already resolved, replacing response");
        }

        alert.resolve(response);
        self.db.update_alert(&alert)?;
        Ok(alert)
    }

    /// Apply a grower's action to the plot's newest open alert, or record it
    /// as an already-resolved general alert when nothing is open.
    pub fn resolve_latest_or_create(&self, plot: &Plot, action: UserAction) -> Result<AlertRecord> {
        let plot_id = saved_plot_id(plot)?;
        self.db
            .resolve_latest_or_insert(plot_id, action.as_str(), &action.manual_message())
    }
}

fn saved_plot_id(plot: &Plot) -> Result<i64> {
    plot.id
        .ok_or_else(|| AgroError::InvalidData(format!("plot '{}' has not been saved", plot.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendationCategory;

    fn setup() -> (AlertCoordinator, Database, Plot) {
        let db = Database::open_in_memory().unwrap();
        let mut plot = Plot::new("North field", "grower@example.com");
        plot.id = Some(db.create_plot(&plot).unwrap());
        (AlertCoordinator::new(db.clone()), db, plot)
    }

    fn rec(category: RecommendationCategory) -> Recommendation {
        Recommendation::new(category)
    }

    fn open_alert(message: &str) -> AlertRecord {
        AlertRecord::new(1, AlertType::Irrigation, message)
    }

    #[test]
    fn critical_without_open_alert_creates() {
        let heavy = rec(RecommendationCategory::HeavyWater);
        assert_eq!(
            decide(None, &heavy, false),
            AlertDecision::CreateAlert {
                alert_type: AlertType::Irrigation,
                message: heavy.message.clone(),
            }
        );
    }

    #[test]
    fn same_message_open_is_no_action() {
        let heavy = rec(RecommendationCategory::HeavyWater);
        let open = open_alert(&heavy.message);
        assert_eq!(decide(Some(&open), &heavy, false), AlertDecision::NoAction);
        assert_eq!(decide(Some(&open), &heavy, true), AlertDecision::NoAction);
    }

    #[test]
    fn different_message_open_creates() {
        let light = rec(RecommendationCategory::LightWater);
        let open = open_alert(RecommendationCategory::HeavyWater.message());
        assert!(decide(Some(&open), &light, false).is_create());
    }

    #[test]
    fn non_critical_is_no_action_without_escalation() {
        for category in [RecommendationCategory::Hold, RecommendationCategory::NoRainBlock] {
            assert_eq!(decide(None, &rec(category), false), AlertDecision::NoAction);
        }
    }

    #[test]
    fn only_critical_categories_create_on_their_own() {
        for &category in RecommendationCategory::all() {
            let recommendation = rec(category);
            assert_eq!(
                decide(None, &recommendation, false).is_create(),
                recommendation.is_critical(),
                "{}",
                category
            );
        }
    }

    #[test]
    fn escalation_raises_general_alert() {
        let hold = rec(RecommendationCategory::Hold);
        assert_eq!(
            decide(None, &hold, true),
            AlertDecision::CreateAlert {
                alert_type: AlertType::General,
                message: hold.message.clone(),
            }
        );
    }

    #[test]
    fn verdict_parsing() {
        assert_eq!(AiVerdict::from_answer("Sí, el cultivo lo necesita"), AiVerdict::Alert);
        assert_eq!(AiVerdict::from_answer("si"), AiVerdict::Alert);
        assert_eq!(AiVerdict::from_answer("  YES. Heat stress likely"), AiVerdict::Alert);
        assert_eq!(AiVerdict::from_answer("No, conditions are fine"), AiVerdict::NoAlert);
        assert_eq!(AiVerdict::from_answer("Maybe"), AiVerdict::Ambiguous);
        assert_eq!(AiVerdict::from_answer("Nothing to report"), AiVerdict::Ambiguous);
        assert_eq!(AiVerdict::from_answer(""), AiVerdict::Ambiguous);
    }

    #[test]
    fn only_alert_verdict_escalates() {
        assert!(AiVerdict::Alert.escalates());
        assert!(!AiVerdict::NoAlert.escalates());
        assert!(!AiVerdict::Ambiguous.escalates());
        assert!(!AiVerdict::Unavailable.escalates());
    }

    #[test]
    fn record_dedups_repeated_recommendation() {
        let (coordinator, db, plot) = setup();
        let heavy = rec(RecommendationCategory::HeavyWater);

        let first = coordinator
            .evaluate_and_record(&plot, &heavy, false, true)
            .unwrap()
            .unwrap();
        assert_eq!(first.alert_type, AlertType::Irrigation);
        assert!(first.notified);

        assert!(coordinator
            .evaluate_and_record(&plot, &heavy, false, true)
            .unwrap()
            .is_none());
        assert_eq!(coordinator.evaluate(&plot, &heavy).unwrap(), AlertDecision::NoAction);
        assert_eq!(db.list_alerts(plot.id, false).unwrap().len(), 1);
    }

    #[test]
    fn changed_recommendation_leaves_both_open() {
        let (coordinator, db, plot) = setup();
        coordinator
            .evaluate_and_record(&plot, &rec(RecommendationCategory::HeavyWater), false, false)
            .unwrap();
        coordinator
            .evaluate_and_record(&plot, &rec(RecommendationCategory::LightWater), false, false)
            .unwrap();

        let open = db.list_alerts(plot.id, true).unwrap();
        assert_eq!(open.len(), 2);
        assert!(open.iter().all(|a| !a.notified));
    }

    #[test]
    fn open_pest_alert_does_not_dedup() {
        let (coordinator, db, plot) = setup();
        let heavy = rec(RecommendationCategory::HeavyWater);
        db.insert_alert(&AlertRecord::new(
            plot.id.unwrap(),
            AlertType::Pest,
            heavy.message.clone(),
        ))
        .unwrap();

        assert!(coordinator
            .evaluate_and_record(&plot, &heavy, false, true)
            .unwrap()
            .is_some());
    }

    #[test]
    fn resolved_alert_no_longer_dedups() {
        let (coordinator, _db, plot) = setup();
        let heavy = rec(RecommendationCategory::HeavyWater);
        let alert = coordinator
            .evaluate_and_record(&plot, &heavy, false, true)
            .unwrap()
            .unwrap();
        coordinator.resolve(alert.id.unwrap(), "watered").unwrap();

        assert!(coordinator.evaluate(&plot, &heavy).unwrap().is_create());
    }

    #[test]
    fn resolving_twice_replaces_response() {
        let (coordinator, db, plot) = setup();
        let alert = coordinator
            .evaluate_and_record(&plot, &rec(RecommendationCategory::LightWater), false, true)
            .unwrap()
            .unwrap();
        let id = alert.id.unwrap();

        let first = coordinator.resolve(id, "done").unwrap();
        assert!(first.resolved);
        assert_eq!(first.user_response, "done");

        let second = coordinator.resolve(id, "again").unwrap();
        assert!(second.resolved);
        assert_eq!(second.user_response, "again");

        let stored = db.get_alert(id).unwrap().unwrap();
        assert!(stored.resolved);
        assert_eq!(stored.user_response, "again");
        assert_eq!(stored.message, alert.message);
    }

    #[test]
    fn resolve_unknown_alert_is_not_found() {
        let (coordinator, _db, _plot) = setup();
        assert!(matches!(coordinator.resolve(999, "x"), Err(AgroError::NotFound(_))));
    }

    #[test]
    fn respond_resolves_latest_open_alert() {
        let (coordinator, db, plot) = setup();
        let alert = coordinator
            .evaluate_and_record(&plot, &rec(RecommendationCategory::HeavyWater), false, true)
            .unwrap()
            .unwrap();

        let resolved = coordinator
            .resolve_latest_or_create(&plot, UserAction::Applied)
            .unwrap();
        assert_eq!(resolved.id, alert.id);
        assert_eq!(resolved.user_response, "applied");
        assert!(db.list_alerts(plot.id, true).unwrap().is_empty());
    }

    #[test]
    fn respond_without_open_alert_records_manual_entry() {
        let (coordinator, db, plot) = setup();
        let created = coordinator
            .resolve_latest_or_create(&plot, UserAction::NotApplied)
            .unwrap();

        assert_eq!(created.alert_type, AlertType::General);
        assert_eq!(created.message, "Manual response: not_applied");
        assert!(created.resolved);
        assert_eq!(db.list_alerts(plot.id, false).unwrap().len(), 1);
    }

    #[test]
    fn unsaved_plot_is_rejected() {
        let (coordinator, _db, _plot) = setup();
        let unsaved = Plot::new("Draft", "x@example.com");
        let heavy = rec(RecommendationCategory::HeavyWater);
        assert!(matches!(
            coordinator.evaluate_and_record(&unsaved, &heavy, false, true),
            Err(AgroError::InvalidData(_))
        ));
    }
}
