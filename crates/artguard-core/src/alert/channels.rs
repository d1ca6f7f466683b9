//! Alert delivery channels.
//!
//! Every channel is independent: [`deliver`] runs one tokio task per
//! channel, waits for all of them up to a shared deadline and reports a
//! per-channel [`ChannelOutcome`]. A channel that errors, panics or times
//! out is recorded as failed without affecting the others.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::{AlertSeverity, CorruptionAlert};
use crate::atomic::write_atomic;
use crate::config::GuardConfig;
use crate::domain::{GuardError, Result};
use crate::metrics::METRICS;
use crate::obs;

/// Result of handing an alert to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered,
    /// Nothing to do for this channel; counts as success.
    Skipped { reason: String },
    Failed { error: String },
}

impl ChannelOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// A destination for corruption alerts.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Stable channel name, used as the key in [`DeliveryReport`].
    fn name(&self) -> &str;

    /// Deliver `alert`. Re-delivering the same alert must not duplicate it.
    async fn deliver(&self, alert: &CorruptionAlert) -> Result<ChannelOutcome>;
}

/// Per-channel outcomes of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub results: BTreeMap<String, ChannelOutcome>,
}

impl DeliveryReport {
    /// Channel name to success flag.
    pub fn success_map(&self) -> BTreeMap<String, bool> {
        self.results
            .iter()
            .map(|(name, outcome)| (name.clone(), outcome.is_success()))
            .collect()
    }

    pub fn delivered_count(&self) -> usize {
        self.results.values().filter(|o| o.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.delivered_count()
    }

    pub fn any_failed(&self) -> bool {
        self.failed_count() > 0
    }
}

/// Deliver `alert` to every channel concurrently.
///
/// Never returns an error: failures, panics and channels still running at
/// the deadline are recorded as [`ChannelOutcome::Failed`].
pub async fn deliver(
    alert: &CorruptionAlert,
    channels: &[Arc<dyn AlertChannel>],
    timeout: Duration,
) -> DeliveryReport {
    let alert = Arc::new(alert.clone());
    let deadline = Instant::now() + timeout;

    let handles: Vec<_> = channels
        .iter()
        .map(|channel| {
            let channel = Arc::clone(channel);
            let alert = Arc::clone(&alert);
            let name = channel.name().to_string();
            (name, tokio::spawn(async move { channel.deliver(&alert).await }))
        })
        .collect();

    let mut report = DeliveryReport::default();
    for (name, mut handle) in handles {
        let outcome = match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => ChannelOutcome::Failed {
                error: e.to_string(),
            },
            Ok(Err(join_err)) => ChannelOutcome::Failed {
                error: format!("channel task failed: {join_err}"),
            },
            Err(_) => {
                handle.abort();
                ChannelOutcome::Failed {
                    error: format!("delivery timed out after {}ms", timeout.as_millis()),
                }
            }
        };

        if let ChannelOutcome::Failed { error } = &outcome {
            METRICS.inc_channel_failures();
            obs::emit_channel_failed(&name, error);
        }
        report.results.insert(name, outcome);
    }

    obs::emit_alert_delivered(
        alert.severity.as_str(),
        report.delivered_count(),
        report.failed_count(),
    );
    report
}

// ── channel selection ─────────────────────────────────────────────────────

/// Built-in channel kinds as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    Log,
    Console,
    JsonFile,
    Annotations,
    StepSummary,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Log,
        ChannelKind::Console,
        ChannelKind::JsonFile,
        ChannelKind::Annotations,
        ChannelKind::StepSummary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Console => "console",
            Self::JsonFile => "json-file",
            Self::Annotations => "annotations",
            Self::StepSummary => "step-summary",
        }
    }

    /// Parse a comma-separated channel list, ignoring blanks and repeats.
    pub fn parse_list(raw: &str) -> std::result::Result<Vec<ChannelKind>, String> {
        let mut kinds = Vec::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind = item.parse::<ChannelKind>()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown channel '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Instantiate the selected channels from `config`.
pub fn build_channels(kinds: &[ChannelKind], config: &GuardConfig) -> Vec<Arc<dyn AlertChannel>> {
    kinds
        .iter()
        .map(|kind| -> Arc<dyn AlertChannel> {
            match kind {
                ChannelKind::Log => Arc::new(StructuredLogChannel),
                ChannelKind::Console => Arc::new(ConsoleChannel),
                ChannelKind::JsonFile => Arc::new(JsonFileChannel::new(config.alerts_dir.clone())),
                ChannelKind::Annotations => Arc::new(CiAnnotationChannel::new(config.annotate_files)),
                ChannelKind::StepSummary => {
                    Arc::new(StepSummaryChannel::new(config.step_summary_env.clone()))
                }
            }
        })
        .collect()
}

// ── structured log ────────────────────────────────────────────────────────

/// Emits the alert as one tracing event at a level matching its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredLogChannel;

#[async_trait]
impl AlertChannel for StructuredLogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, alert: &CorruptionAlert) -> Result<ChannelOutcome> {
        let fingerprint = alert.fingerprint();
        let files = alert.corrupted_files.len();
        match alert.severity {
            AlertSeverity::Critical | AlertSeverity::Error => error!(
                event = "alert.raised",
                severity = alert.severity.as_str(),
                title = %alert.title,
                corrupted_files = files,
                fingerprint = %fingerprint,
            ),
            AlertSeverity::Warning => warn!(
                event = "alert.raised",
                severity = alert.severity.as_str(),
                title = %alert.title,
                corrupted_files = files,
                fingerprint = %fingerprint,
            ),
            AlertSeverity::Info => info!(
                event = "alert.raised",
                severity = alert.severity.as_str(),
                title = %alert.title,
                corrupted_files = files,
                fingerprint = %fingerprint,
            ),
        }
        Ok(ChannelOutcome::Delivered)
    }
}

// ── console ───────────────────────────────────────────────────────────────

/// Prints a plain-text status block to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

/// Plain-text status block for `alert`.
pub fn render_console(alert: &CorruptionAlert) -> String {
    let mut out = format!(
        "[{}] {}\n{}\nImpact: {}\n",
        alert.severity.as_str().to_uppercase(),
        alert.title,
        alert.message,
        alert.workflow_impact
    );
    for path in &alert.corrupted_files {
        out.push_str(&format!("  corrupted: {}\n", path.display()));
    }
    if !alert.recommendations.is_empty() {
        out.push_str("Recommendations:\n");
        for rec in &alert.recommendations {
            out.push_str(&format!("  - {rec}\n"));
        }
    }
    out
}

#[async_trait]
impl AlertChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, alert: &CorruptionAlert) -> Result<ChannelOutcome> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(render_console(alert).as_bytes()).await?;
        stdout.flush().await?;
        Ok(ChannelOutcome::Delivered)
    }
}

// ── JSON file ─────────────────────────────────────────────────────────────

/// Writes the alert as a timestamped JSON file into an alerts directory.
#[derive(Debug, Clone)]
pub struct JsonFileChannel {
    alerts_dir: PathBuf,
}

impl JsonFileChannel {
    pub fn new(alerts_dir: PathBuf) -> Self {
        Self { alerts_dir }
    }

    /// Path the alert is written to; identical for re-deliveries.
    pub fn alert_path(&self, alert: &CorruptionAlert) -> PathBuf {
        let fingerprint = alert.fingerprint();
        self.alerts_dir.join(format!(
            "alert-{}-{}.json",
            alert.timestamp.format("%Y%m%dT%H%M%SZ"),
            &fingerprint[..12]
        ))
    }
}

#[async_trait]
impl AlertChannel for JsonFileChannel {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn deliver(&self, alert: &CorruptionAlert) -> Result<ChannelOutcome> {
        let path = self.alert_path(alert);
        let mut body = serde_json::to_vec_pretty(alert)?;
        body.push(b'\n');
        tokio::task::spawn_blocking(move || write_atomic(&path, &body))
            .await
            .map_err(|e| GuardError::Io(std::io::Error::other(e)))??;
        Ok(ChannelOutcome::Delivered)
    }
}

// ── CI annotations ────────────────────────────────────────────────────────

/// Prints `::error`/`::warning`/`::notice` workflow commands to stdout.
#[derive(Debug, Clone, Copy)]
pub struct CiAnnotationChannel {
    per_file: bool,
}

impl CiAnnotationChannel {
    pub fn new(per_file: bool) -> Self {
        Self { per_file }
    }
}

fn annotation_command(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical | AlertSeverity::Error => "error",
        AlertSeverity::Warning => "warning",
        AlertSeverity::Info => "notice",
    }
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

/// Annotation lines for `alert`: one summary line, plus one per corrupted
/// file when `per_file` is set.
pub fn render_annotations(alert: &CorruptionAlert, per_file: bool) -> Vec<String> {
    let command = annotation_command(alert.severity);
    let mut lines = vec![format!(
        "::{command} title={}::{}",
        escape_property(&alert.title),
        escape_data(&alert.message)
    )];
    if per_file {
        for path in &alert.corrupted_files {
            let shown = path.display().to_string();
            lines.push(format!(
                "::{command} file={},title=Corrupted artifact::{} failed structural validation",
                escape_property(&shown),
                escape_data(&shown)
            ));
        }
    }
    lines
}

#[async_trait]
impl AlertChannel for CiAnnotationChannel {
    fn name(&self) -> &str {
        "annotations"
    }

    async fn deliver(&self, alert: &CorruptionAlert) -> Result<ChannelOutcome> {
        let mut text = render_annotations(alert, self.per_file).join("\n");
        text.push('\n');
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
        Ok(ChannelOutcome::Delivered)
    }
}

// ── CI step summary ───────────────────────────────────────────────────────

/// Appends a markdown section to the step-summary file named by an
/// environment variable.
#[derive(Debug, Clone)]
pub struct StepSummaryChannel {
    env_var: String,
}

impl StepSummaryChannel {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }
}

/// Marker embedded in the step summary so an alert is appended only once.
pub fn step_summary_marker(alert: &CorruptionAlert) -> String {
    format!("<!-- artguard-alert:{} -->", alert.fingerprint())
}

/// Markdown section for `alert`.
pub fn render_step_summary(alert: &CorruptionAlert) -> String {
    let mut md = format!(
        "{}\n## Artifact guard: {} ({})\n\n{}\n\n**Impact:** {}\n",
        step_summary_marker(alert),
        alert.title,
        alert.severity,
        alert.message,
        alert.workflow_impact
    );
    if !alert.corrupted_files.is_empty() {
        md.push_str("\n| Corrupted file |\n|---|\n");
        for path in &alert.corrupted_files {
            md.push_str(&format!("| `{}` |\n", path.display()));
        }
    }
    if !alert.recommendations.is_empty() {
        md.push_str("\n### Recommendations\n\n");
        for rec in &alert.recommendations {
            md.push_str(&format!("- {rec}\n"));
        }
    }
    md.push('\n');
    md
}

#[async_trait]
impl AlertChannel for StepSummaryChannel {
    fn name(&self) -> &str {
        "step-summary"
    }

    async fn deliver(&self, alert: &CorruptionAlert) -> Result<ChannelOutcome> {
        let Some(path) = std::env::var_os(&self.env_var).filter(|v| !v.is_empty()) else {
            return Ok(ChannelOutcome::Skipped {
                reason: format!("{} is not set", self.env_var),
            });
        };
        let path = PathBuf::from(path);

        let marker = step_summary_marker(alert);
        match tokio::fs::read_to_string(&path).await {
            Ok(existing) if existing.contains(&marker) => {
                return Ok(ChannelOutcome::Skipped {
                    reason: "alert already recorded in step summary".to_string(),
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(render_step_summary(alert).as_bytes()).await?;
        file.flush().await?;
        Ok(ChannelOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::build_alert;
    use crate::domain::ValidationSummary;

    fn info_alert() -> CorruptionAlert {
        build_alert(&[], &ValidationSummary::from_results(Vec::new()), &[], None)
    }

    #[test]
    fn parse_channel_list() {
        let kinds = ChannelKind::parse_list("log, json-file,,log").unwrap();
        assert_eq!(kinds, vec![ChannelKind::Log, ChannelKind::JsonFile]);
        assert!(ChannelKind::parse_list("log,pager").is_err());
    }

    #[test]
    fn annotation_escaping() {
        let mut alert = info_alert();
        alert.severity = AlertSeverity::Warning;
        alert.title = "a: b, c".to_string();
        alert.message = "50% broken\nsee log".to_string();
        alert.corrupted_files = vec![PathBuf::from("x/scan-config.yml")];

        let lines = render_annotations(&alert, true);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "::warning title=a%3A b%2C c::50%25 broken%0Asee log");
        assert!(lines[1].starts_with("::warning file=x/scan-config.yml,"));
        assert_eq!(render_annotations(&alert, false).len(), 1);
    }

    #[test]
    fn step_summary_carries_marker() {
        let alert = info_alert();
        assert!(render_step_summary(&alert).starts_with(&step_summary_marker(&alert)));
    }

    #[test]
    fn json_file_name_uses_fingerprint_prefix() {
        let alert = info_alert();
        let channel = JsonFileChannel::new(PathBuf::from("alerts"));
        let name = channel.alert_path(&alert).file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("alert-"));
        assert!(name.ends_with(&format!("-{}.json", &alert.fingerprint()[..12])));
    }

    #[test]
    fn report_counts() {
        let mut report = DeliveryReport::default();
        report.results.insert("a".into(), ChannelOutcome::Delivered);
        report.results.insert(
            "b".into(),
            ChannelOutcome::Skipped {
                reason: "unset".into(),
            },
        );
        report.results.insert(
            "c".into(),
            ChannelOutcome::Failed {
                error: "boom".into(),
            },
        );
        assert_eq!(report.delivered_count(), 2);
        assert!(report.any_failed());
        assert_eq!(report.success_map()["c"], false);
    }
}
