//! Forecast report: pairs every forecast day with one recommendation
//!
//! Days are handled strictly in order. The recommendation for a day is
//! generated and rendered before the next day is started.

use crate::models::{DayForecast, ForecastResult};
use crate::recommendation::Recommender;
use crate::{OutfitError, Result};
use serde::Serialize;
use std::io::Write;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Destination of a rendered report
pub trait ReportSink: Send {
    /// Called once before the first day
    fn begin(&mut self, location: &str) -> Result<()>;

    fn day(&mut self, day: &DayForecast, recommendation: &str) -> Result<()>;

    /// Called instead of `begin`/`day` when the forecast failed
    fn failure(&mut self, code: u16, message: &str) -> Result<()>;
}

/// Render a forecast result, generating recommendations one day at a time
pub async fn present(
    location: &str,
    forecast: &ForecastResult,
    recommender: &dyn Recommender,
    sink: &mut dyn ReportSink,
) -> Result<()> {
    match forecast {
        ForecastResult::Failure { code, message } => {
            info!("Forecast for {} failed with code {}", location, code);
            sink.failure(*code, message)
        }
        ForecastResult::Success { days } => {
            sink.begin(location)?;
            for day in days {
                debug!("Generating recommendation for {}", day.date);
                let recommendation = recommender.recommend(day).await?;
                sink.day(day, &recommendation)?;
            }
            Ok(())
        }
    }
}

/// Plain text report for the terminal
pub struct ConsoleReport<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ReportSink for ConsoleReport<W> {
    fn begin(&mut self, location: &str) -> Result<()> {
        writeln!(self.out, "\n Previsão do Tempo para {location} ")?;
        writeln!(self.out, "{}", "-".repeat(50))?;
        Ok(())
    }

    fn day(&mut self, day: &DayForecast, recommendation: &str) -> Result<()> {
        writeln!(self.out, "\nData: {}", day.format_date())?;
        writeln!(self.out, "Temperatura: {}", day.format_temperature())?;
        writeln!(self.out, "Condição: {}\n", day.condition)?;
        writeln!(self.out, "-----\nRecomendação de Vestuário:\n{recommendation}")?;
        self.out.flush()?;
        Ok(())
    }

    fn failure(&mut self, _code: u16, message: &str) -> Result<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// One rendered day of the web report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayReport {
    pub date: String,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub condition: String,
    pub recommendation: String,
}

impl DayReport {
    fn new(day: &DayForecast, recommendation: &str) -> Self {
        Self {
            date: day.format_date(),
            min_temp_c: day.min_temp_c,
            max_temp_c: day.max_temp_c,
            condition: day.condition.clone(),
            recommendation: recommendation.to_string(),
        }
    }
}

/// Incremental report update, sent to the web UI as soon as it is known
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportEvent {
    Begin { location: String },
    Day(DayReport),
    Failure { code: u16, message: String },
    /// Generation stopped with an error; no further days follow
    Error { message: String },
    Done,
}

/// Sink forwarding every rendered piece over a channel
pub struct ChannelReport {
    tx: mpsc::UnboundedSender<ReportEvent>,
}

impl ChannelReport {
    pub fn new(tx: mpsc::UnboundedSender<ReportEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: ReportEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| OutfitError::Disconnected)
    }

    /// Close the report, reporting `outcome` when it is an error
    pub fn finish(self, outcome: &Result<()>) {
        let event = match outcome {
            Ok(()) => ReportEvent::Done,
            Err(e) => ReportEvent::Error {
                message: e.user_message(),
            },
        };
        // the receiver may already be gone, nothing left to tell it
        let _ = self.tx.send(event);
    }
}

impl ReportSink for ChannelReport {
    fn begin(&mut self, location: &str) -> Result<()> {
        self.send(ReportEvent::Begin {
            location: location.to_string(),
        })
    }

    fn day(&mut self, day: &DayForecast, recommendation: &str) -> Result<()> {
        self.send(ReportEvent::Day(DayReport::new(day, recommendation)))
    }

    fn failure(&mut self, code: u16, message: &str) -> Result<()> {
        self.send(ReportEvent::Failure {
            code,
            message: message.to_string(),
        })
    }
}
