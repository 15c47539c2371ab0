use super::coordinator::{AiVerdict, AlertCoordinator};
use super::rules::AdvisoryEngine;
use crate::config::{Config, DefaultLocationConfig};
use crate::datasources::{
    AiAdvisor, GeminiClient, HttpMailer, MailSender, OutgoingMail, PlotContext, WeatherApiClient,
    WeatherProvider,
};
use crate::db::Database;
use crate::error::{AgroError, Result};
use crate::models::{
    AlertRecord, Plot, Recommendation, WeatherQuery, WeatherReading, WeatherRecord,
};
use serde::Serialize;
use std::sync::Arc;

/// Drives weather fetches, advice and alerting for registered plots.
pub struct MonitorService {
    db: Database,
    default_location: DefaultLocationConfig,
    engine: AdvisoryEngine,
    coordinator: AlertCoordinator,
    weather: Arc<dyn WeatherProvider>,
    advisor: Option<Arc<dyn AiAdvisor>>,
    mailer: Option<Arc<dyn MailSender>>,
}

/// Result of refreshing one plot on demand.
#[derive(Debug, Clone, Serialize)]
pub struct PlotReport {
    pub plot_id: Option<i64>,
    pub plot_name: String,
    pub query: WeatherQuery,
    pub reading: Option<WeatherReading>,
    pub recommendation: Option<Recommendation>,
    pub alert: Option<AlertRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlotReport {
    fn new(plot: &Plot, query: WeatherQuery) -> Self {
        Self {
            plot_id: plot.id,
            plot_name: plot.name.clone(),
            query,
            reading: None,
            recommendation: None,
            alert: None,
            error: None,
        }
    }
}

/// Counters for one pass over every plot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub plots_checked: usize,
    pub skipped_no_coordinates: usize,
    pub weather_failures: usize,
    pub alerts_created: usize,
    pub notifications_sent: usize,
    pub notification_failures: usize,
    pub errors: usize,
}

impl std::fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checked {} plots ({} without coordinates), {} weather failures, \
             {} alerts created, {} notified, {} notification failures, {} errors",
            self.plots_checked,
            self.skipped_no_coordinates,
            self.weather_failures,
            self.alerts_created,
            self.notifications_sent,
            self.notification_failures,
            self.errors
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub weather: bool,
    pub ai: Option<bool>,
    pub mail_configured: bool,
}

struct AiReview {
    verdict: AiVerdict,
    answer: Option<String>,
}

impl MonitorService {
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        let weather: Arc<dyn WeatherProvider> =
            Arc::new(WeatherApiClient::new(config.weather.clone())?);

        let advisor = match config
            .ai
            .as_ref()
            .filter(|c| c.enabled && !c.api_key.is_empty())
        {
            Some(ai) => {
                tracing::info!(model = %ai.model, "AI advisor configured for sweeps");
                Some(Arc::new(GeminiClient::new(ai.clone())?) as Arc<dyn AiAdvisor>)
            }
            None => {
                tracing::info!("AI advisor not configured - sweeps use the heuristic only");
                None
            }
        };

        let mailer = match config.mail.as_ref().filter(|c| c.enabled) {
            Some(mail) => Some(Arc::new(HttpMailer::new(mail.clone())?) as Arc<dyn MailSender>),
            None => {
                tracing::warn!("Mail relay not configured - alerts will not be delivered");
                None
            }
        };

        Ok(Self::with_collaborators(
            db,
            config.default_location.clone(),
            weather,
            advisor,
            mailer,
        ))
    }

    pub fn with_collaborators(
        db: Database,
        default_location: DefaultLocationConfig,
        weather: Arc<dyn WeatherProvider>,
        advisor: Option<Arc<dyn AiAdvisor>>,
        mailer: Option<Arc<dyn MailSender>>,
    ) -> Self {
        Self {
            coordinator: AlertCoordinator::new(db.clone()),
            db,
            default_location,
            engine: AdvisoryEngine::new(),
            weather,
            advisor,
            mailer,
        }
    }

    pub fn coordinator(&self) -> &AlertCoordinator {
        &self.coordinator
    }

    /// On-demand refresh for a plot being viewed. Upstream failures end up in
    /// the report instead of an error; only storage errors propagate.
    ///
    /// Alerts raised here are stored as notified before delivery is attempted
    /// and are not rolled back if delivery fails.
    pub async fn refresh_plot(&self, plot: &Plot) -> Result<PlotReport> {
        let query = plot
            .weather_query()
            .unwrap_or_else(|| self.default_location.query());
        let mut report = PlotReport::new(plot, query.clone());

        let reading = match self.weather.fetch_current(&query).await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(plot = %plot.name, "Weather unavailable: {}", e);
                report.error = Some(e.to_string());
                return Ok(report);
            }
        };

        let recommendation = self.engine.evaluate_reading(&reading);
        report.reading = Some(reading.clone());
        report.recommendation = Some(recommendation.clone());

        let Some(plot_id) = plot.id else {
            return Ok(report);
        };

        self.db
            .insert_weather_record(&WeatherRecord::from_reading(plot_id, &reading, &recommendation))?;

        if let Some(alert) = self
            .coordinator
            .evaluate_and_record(plot, &recommendation, false, true)?
        {
            let mail = alert_mail(plot, &alert, None);
            if let Err(e) = self.deliver(&mail).await {
                tracing::warn!(plot = %plot.name, alert_id = ?alert.id, "Alert delivery failed: {}", e);
            }
            report.alert = Some(alert);
        }

        Ok(report)
    }

    /// Scheduled pass over every plot with coordinates. One plot failing never
    /// stops the others.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let plots = self.db.list_plots()?;
        let mut summary = SweepSummary::default();

        tracing::info!(plots = plots.len(), "Starting sweep");

        for plot in &plots {
            summary.plots_checked += 1;
            if let Err(e) = self.sweep_plot(plot, &mut summary).await {
                summary.errors += 1;
                tracing::error!(plot = %plot.name, "Sweep failed for plot: {}", e);
            }
        }

        tracing::info!("Sweep finished: {}", summary);
        Ok(summary)
    }

    async fn sweep_plot(&self, plot: &Plot, summary: &mut SweepSummary) -> Result<()> {
        let Some(query) = plot.weather_query() else {
            tracing::debug!(plot = %plot.name, "Skipping plot without coordinates");
            summary.skipped_no_coordinates += 1;
            return Ok(());
        };
        let plot_id = plot
            .id
            .ok_or_else(|| AgroError::InvalidData(format!("plot '{}' has no id", plot.name)))?;

        let reading = match self.weather.fetch_current(&query).await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(plot = %plot.name, "Weather unavailable: {}", e);
                summary.weather_failures += 1;
                return Ok(());
            }
        };

        let recommendation = self.engine.evaluate_reading(&reading);
        self.db
            .insert_weather_record(&WeatherRecord::from_reading(plot_id, &reading, &recommendation))?;

        let review = self.review(plot, &reading, &recommendation).await;
        tracing::debug!(
            plot = %plot.name,
            category = recommendation.category.as_str(),
            verdict = review.verdict.as_str(),
            "Plot evaluated"
        );

        let Some(alert) = self.coordinator.evaluate_and_record(
            plot,
            &recommendation,
            review.verdict.escalates(),
            false,
        )?
        else {
            return Ok(());
        };
        summary.alerts_created += 1;

        let mail = alert_mail(plot, &alert, Some((&reading, &review)));
        match self.deliver(&mail).await {
            Ok(()) => {
                if let Some(id) = alert.id {
                    self.db.mark_alert_notified(id, true)?;
                }
                summary.notifications_sent += 1;
            }
            Err(e) => {
                tracing::warn!(plot = %plot.name, alert_id = ?alert.id, "Alert delivery failed: {}", e);
                summary.notification_failures += 1;
            }
        }

        Ok(())
    }

    /// Second opinion from the AI advisor. Any failure degrades to
    /// `Unavailable` and the heuristic alone decides.
    async fn review(
        &self,
        plot: &Plot,
        reading: &WeatherReading,
        recommendation: &Recommendation,
    ) -> AiReview {
        let Some(advisor) = &self.advisor else {
            return AiReview {
                verdict: AiVerdict::Unavailable,
                answer: None,
            };
        };

        let question = format!(
            "Given temperature {} and humidity {}, the automatic recommendation is: \"{}\". \
             Should the grower be alerted? Answer yes or no first, then a short reason.",
            fmt_value(reading.temperature_c, "°C"),
            fmt_value(reading.humidity_percent, "%"),
            recommendation.message
        );

        match advisor.ask(&question, &PlotContext::from(plot)).await {
            Ok(answer) => AiReview {
                verdict: AiVerdict::from_answer(&answer),
                answer: Some(answer),
            },
            Err(e) => {
                tracing::warn!(plot = %plot.name, "AI advisor unavailable: {}", e);
                AiReview {
                    verdict: AiVerdict::Unavailable,
                    answer: None,
                }
            }
        }
    }

    async fn deliver(&self, mail: &OutgoingMail) -> Result<()> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| AgroError::DataSourceUnavailable("mail relay not configured".into()))?;
        mailer.send(mail).await
    }
}

/// Probe each configured upstream without touching plots.
pub async fn check_connections(config: &Config) -> Result<ConnectionStatus> {
    let mut status = ConnectionStatus::default();

    let weather = WeatherApiClient::new(config.weather.clone())?;
    status.weather = weather
        .test_connection(&config.default_location.query())
        .await
        .unwrap_or(false);

    if let Some(ai) = config.ai.as_ref().filter(|c| c.enabled) {
        let client = GeminiClient::new(ai.clone())?;
        status.ai = Some(client.test_connection().await.unwrap_or(false));
    }

    status.mail_configured = config
        .mail
        .as_ref()
        .is_some_and(|m| m.enabled && !m.api_url.is_empty());

    Ok(status)
}

fn alert_mail(
    plot: &Plot,
    alert: &AlertRecord,
    sweep_details: Option<(&WeatherReading, &AiReview)>,
) -> OutgoingMail {
    let mut body = format!(
        "Hello {},\n\nA condition that needs attention was detected on your plot '{}':\n\n{}\n",
        plot.owner_display(),
        plot.name,
        alert.message
    );

    if let Some((reading, review)) = sweep_details {
        body.push_str(&format!(
            "\nTemperature: {}\nHumidity: {}\nRain: {}\n",
            fmt_value(reading.temperature_c, "°C"),
            fmt_value(reading.humidity_percent, "%"),
            fmt_value(reading.rain_mm, " mm"),
        ));
        match &review.answer {
            Some(answer) => body.push_str(&format!("Assistant: {}\n", answer.trim())),
            None => body.push_str("Source: automatic heuristic\n"),
        }
    }

    body.push_str("\nCheck the app for more details.\n");

    OutgoingMail {
        to: plot.owner_email.clone(),
        subject: format!("Automatic alert for your plot: {}", plot.name),
        body,
    }
}

fn fmt_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "n/a".to_string(),
    }
}
