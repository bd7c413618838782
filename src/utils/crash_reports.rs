//! Crash reporting.
//!
//! Panics and unexpected command errors are logged, counted and queued on a
//! channel. Once the client is up, [`report_to_owner`] drains that channel,
//! DMs each report to the configured owner and exits the process afterwards
//! unless `prevent_crash` is set.

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{self as serenity, Colour, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, Timestamp};
use std::panic::PanicHookInfo;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{error, info, warn};

use super::config::NoCrashOptions;
use super::format::truncate;

/// Embed field values are capped at 1024 characters.
const FIELD_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct CrashReport {
    pub message: String,
    /// Source location for panics, the failing command for command errors.
    pub origin: Option<String>,
    pub at: DateTime<Utc>,
}

impl CrashReport {
    pub fn new(message: impl Into<String>, origin: Option<String>) -> Self {
        Self {
            message: message.into(),
            origin,
            at: Utc::now(),
        }
    }

    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());
        let origin = info
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()));

        Self::new(message, origin)
    }

    /// `message` followed by the origin, the way it is shown in embeds.
    pub fn details(&self) -> String {
        match &self.origin {
            Some(origin) => format!("{}\n  at {}", self.message, origin),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    count: usize,
    recent: Option<CrashReport>,
}

/// Shared crash counter, fed by the panic hook and the error handler.
#[derive(Debug)]
pub struct CrashReports {
    tally: Mutex<Tally>,
    sender: UnboundedSender<CrashReport>,
}

impl CrashReports {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<CrashReport>) {
        let (sender, receiver) = unbounded_channel();
        let reports = Self {
            tally: Mutex::new(Tally::default()),
            sender,
        };
        (Arc::new(reports), receiver)
    }

    /// Records `report` and queues it for the owner. Returns the new count.
    pub fn report(&self, report: CrashReport) -> usize {
        error!("Crash detected, ignore if it isn't fatal: {}", report.details());

        let count = {
            let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
            tally.count += 1;
            tally.recent = Some(report.clone());
            tally.count
        };

        if self.sender.send(report).is_err() {
            warn!("Crash report dropped, the reporter has stopped");
        }
        count
    }

    pub fn count(&self) -> usize {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner).count
    }

    pub fn recent(&self) -> Option<CrashReport> {
        self.tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent
            .clone()
    }
}

/// Routes every panic through `reports`.
pub fn install_panic_hook(reports: Arc<CrashReports>) {
    std::panic::set_hook(Box::new(move |info| {
        reports.report(CrashReport::from_panic(info));
    }));
    warn!("Crash reporting enabled");
}

/// DM sent to the owner for each report.
pub fn report_embed(report: &CrashReport, prevent_crash: bool) -> CreateEmbed {
    let title = if prevent_crash {
        "Crash Detected!"
    } else {
        "Uncaught Exception"
    };

    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new(title))
        .colour(Colour::RED)
        .description(format!(
            "**Message:** {}\n```\n{}\n```",
            truncate(&report.message, FIELD_LIMIT),
            truncate(report.origin.as_deref().unwrap_or("unknown origin"), FIELD_LIMIT)
        ));
    if let Ok(timestamp) = Timestamp::from_unix_timestamp(report.at.timestamp()) {
        embed = embed.timestamp(timestamp);
    }
    embed
}

/// Reply to `crash-reports`: the config, the latest report and the count.
pub fn summary_embed(options: &NoCrashOptions, reports: &CrashReports, colour: Colour) -> CreateEmbed {
    let config = toml::to_string_pretty(options).unwrap_or_else(|e| e.to_string());
    let recent = reports
        .recent()
        .map(|report| report.details())
        .unwrap_or_else(|| "None".to_string());
    let count = match reports.count() {
        0 => "None".to_string(),
        n => n.to_string(),
    };

    CreateEmbed::new()
        .author(CreateEmbedAuthor::new("Crash Reports"))
        .colour(colour)
        .field("Config", format!("```toml\n{}```", truncate(&config, FIELD_LIMIT)), false)
        .field("Recent Crash Report", format!("```\n{}\n```", truncate(&recent, FIELD_LIMIT)), false)
        .footer(CreateEmbedFooter::new(format!("Prevented Crashes: {}", count)))
}

/// Drains queued reports until every sender is gone.
pub async fn report_to_owner(
    http: Arc<serenity::Http>,
    options: NoCrashOptions,
    mut receiver: UnboundedReceiver<CrashReport>,
) {
    let owner = options.report_target();
    if let Some(owner) = owner {
        info!("Crash reports go to {}", owner);
    }

    while let Some(report) = receiver.recv().await {
        if let Some(owner) = owner {
            let message = CreateMessage::new().embed(report_embed(&report, options.prevent_crash));
            if let Err(e) = owner.direct_message(&http, message).await {
                error!("Failed to send crash report to owner: {}", e);
            }
        }

        if !options.prevent_crash {
            error!("Exiting after crash");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reports_are_counted_and_queued() {
        let (reports, mut receiver) = CrashReports::new();
        assert_eq!(reports.count(), 0);
        assert_eq!(reports.recent(), None);

        reports.report(CrashReport::new("first", None));
        let count = reports.report(CrashReport::new("second", Some("src/main.rs:1:1".into())));

        assert_eq!(count, 2);
        assert_eq!(reports.recent().map(|r| r.message), Some("second".to_string()));
        assert_eq!(receiver.try_recv().map(|r| r.message), Ok("first".to_string()));
        assert_eq!(receiver.try_recv().map(|r| r.message), Ok("second".to_string()));
    }

    #[test]
    fn test_report_survives_closed_receiver() {
        let (reports, receiver) = CrashReports::new();
        drop(receiver);
        assert_eq!(reports.report(CrashReport::new("lost", None)), 1);
    }

    #[test]
    fn test_details() {
        let report = CrashReport::new("index out of bounds", Some("src/player/queue.rs:10:5".into()));
        assert_eq!(report.details(), "index out of bounds\n  at src/player/queue.rs:10:5");
        assert_eq!(CrashReport::new("boom", None).details(), "boom");
    }

    #[test]
    fn test_summary_embed() {
        let (reports, _receiver) = CrashReports::new();
        let options = NoCrashOptions::default();

        let json = serde_json::to_value(summary_embed(&options, &reports, Colour::RED)).unwrap();
        assert_eq!(json["footer"]["text"], "Prevented Crashes: None");
        assert_eq!(json["fields"][1]["value"], "```\nNone\n```");

        reports.report(CrashReport::new("boom", None));
        let json = serde_json::to_value(summary_embed(&options, &reports, Colour::RED)).unwrap();
        assert_eq!(json["footer"]["text"], "Prevented Crashes: 1");
        assert_eq!(json["fields"][1]["value"], "```\nboom\n```");
    }

    #[test]
    fn test_report_embed_title_follows_prevent_crash() {
        let report = CrashReport::new("boom", None);

        let json = serde_json::to_value(report_embed(&report, true)).unwrap();
        assert_eq!(json["author"]["name"], "Crash Detected!");

        let json = serde_json::to_value(report_embed(&report, false)).unwrap();
        assert_eq!(json["author"]["name"], "Uncaught Exception");
    }
}
