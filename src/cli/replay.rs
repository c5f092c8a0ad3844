//! Replay CLI command.

use super::{SessionArgs, open_ledger, write_error};
use crate::config::{RollcallConfig, check_acceptance_threshold};
use crate::io::Recording;
use crate::models::{Annotation, Decision, SessionContext};
use crate::services::{AnnotationSink, Frame, RecognitionLoop, ReconcilerConfig, RunSummary, StopSignal};
use crate::storage::{InMemoryLedger, Ledger};
use crate::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

/// Runs the recognition loop over a recorded match stream.
#[derive(Debug, Clone, Args)]
pub struct ReplayCommand {
    /// JSON-lines recording of matcher observations.
    pub recording: PathBuf,

    /// Session the records belong to.
    #[command(flatten)]
    pub session: SessionArgs,

    /// Reconcile against a copy of the session's rows; nothing is written.
    #[arg(long)]
    pub dry_run: bool,

    /// Acceptance threshold (defaults to `matcher.acceptance_threshold`).
    #[arg(long)]
    pub threshold: Option<f32>,
}

/// Sink that remembers every decision with its frame index.
#[derive(Debug, Default)]
pub struct DecisionLog {
    /// Decisions in the order they were made.
    pub entries: Vec<(u64, Decision)>,
}

impl AnnotationSink for DecisionLog {
    fn annotate(&mut self, _frame: &Frame, _annotations: &[Annotation]) {}

    fn on_decision(&mut self, frame: &Frame, decision: &Decision) {
        self.entries.push((frame.index, decision.clone()));
    }
}

impl ReplayCommand {
    /// Replays the recording and prints each decision and the run summary.
    ///
    /// Decisions made before a ledger failure are printed before the error
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSession`] before anything is read for a
    /// bad subject, [`crate::Error::InvalidInput`] for a malformed recording
    /// or a `--threshold` outside `[0, 1]`,
    /// and [`crate::Error::LedgerUnavailable`] if the ledger fails.
    pub fn run(
        &self,
        config: &RollcallConfig,
        stop: &StopSignal,
        out: &mut impl Write,
    ) -> Result<RunSummary> {
        let context = self.session.resolve(config)?;
        let threshold = check_acceptance_threshold(
            self.threshold
                .unwrap_or(config.matcher.acceptance_threshold),
        )?;
        let recording = Recording::open(&self.recording)?.with_acceptance_threshold(threshold);
        let ledger = open_ledger(config)?;

        writeln!(
            out,
            "Replaying {} frames for {context}{}",
            recording.len(),
            if self.dry_run { " (dry run)" } else { "" }
        )
        .map_err(write_error)?;

        if self.dry_run {
            let rows = ledger.records_for_session(context.subject(), context.date())?;
            let preview = InMemoryLedger::with_records(rows);
            drive(preview, config.reconciler_config(), &recording, context, stop, out)
        } else {
            drive(ledger, config.reconciler_config(), &recording, context, stop, out)
        }
    }
}

fn drive<L: Ledger>(
    ledger: L,
    reconciler: ReconcilerConfig,
    recording: &Recording,
    context: SessionContext,
    stop: &StopSignal,
    out: &mut impl Write,
) -> Result<RunSummary> {
    let mut driver = RecognitionLoop::new(
        ledger,
        reconciler,
        recording.frames(),
        recording,
        recording,
        DecisionLog::default(),
    );
    let session = driver.begin_session(context);
    let result = driver.run(&session, stop);

    for (frame, decision) in &driver.into_sink().entries {
        writeln!(out, "frame {frame}: {decision}").map_err(write_error)?;
    }
    let summary = result?;
    writeln!(out, "{summary}").map_err(write_error)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::{session_args, temp_config};
    use crate::Error;
    use std::fs;

    const RECORDING: &str = r#"{"frame": 0, "at": "2024-01-10T09:00:00Z", "identity": "Alice", "confidence": 0.9, "region": {"x": 1, "y": 1, "width": 10, "height": 10}}
{"frame": 1, "at": "2024-01-10T09:00:05Z", "identity": "Alice", "confidence": 0.88, "region": {"x": 1, "y": 1, "width": 10, "height": 10}}
{"frame": 2, "at": "2024-01-10T09:00:40Z", "identity": "Alice", "confidence": 0.91, "region": {"x": 1, "y": 1, "width": 10, "height": 10}}
{"frame": 3, "at": "2024-01-10T09:00:41Z", "identity": null, "confidence": 0.3, "region": {"x": 1, "y": 1, "width": 10, "height": 10}}
"#;

    fn command(dir: &std::path::Path, dry_run: bool) -> ReplayCommand {
        let recording = dir.join("stream.jsonl");
        fs::write(&recording, RECORDING).unwrap();
        ReplayCommand {
            recording,
            session: session_args("Maths"),
            dry_run,
            threshold: None,
        }
    }

    #[test]
    fn test_replay_writes_one_row() {
        let (dir, config) = temp_config();
        let mut out = Vec::new();

        let summary = command(dir.path(), false)
            .run(&config, &StopSignal::new(), &mut out)
            .unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.suppressed, 2);
        assert_eq!(summary.rejected, 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("frame 0: accepted Alice"));
        assert!(text.contains("frame 1: suppressed Alice (debounced)"));
        assert!(text.contains("frame 2: suppressed Alice (already-marked-today)"));
        assert!(text.contains("frame 3: rejected (unknown)"));

        assert_eq!(open_ledger(&config).unwrap().count().unwrap(), 1);
    }

    #[test]
    fn test_dry_run_leaves_ledger_untouched() {
        let (dir, config) = temp_config();
        let mut out = Vec::new();

        let summary = command(dir.path(), true)
            .run(&config, &StopSignal::new(), &mut out)
            .unwrap();
        assert_eq!(summary.accepted, 1);
        assert!(String::from_utf8(out).unwrap().contains("(dry run)"));
        assert_eq!(open_ledger(&config).unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_dry_run_sees_existing_rows() {
        let (dir, config) = temp_config();
        command(dir.path(), false)
            .run(&config, &StopSignal::new(), &mut Vec::new())
            .unwrap();

        let summary = command(dir.path(), true)
            .run(&config, &StopSignal::new(), &mut Vec::new())
            .unwrap();
        assert_eq!(summary.accepted, 0);
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let (dir, config) = temp_config();
        for bad in [f32::NAN, -0.1, 1.5] {
            let mut cmd = command(dir.path(), false);
            cmd.threshold = Some(bad);
            let result = cmd.run(&config, &StopSignal::new(), &mut Vec::new());
            assert!(matches!(result, Err(Error::InvalidInput(_))), "{bad}");
        }
        assert_eq!(open_ledger(&config).unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_placeholder_subject_rejected_before_reading() {
        let (dir, config) = temp_config();
        let mut cmd = command(dir.path(), false);
        cmd.session.subject = "Select Subject".to_string();
        cmd.recording = dir.path().join("missing.jsonl");

        let result = cmd.run(&config, &StopSignal::new(), &mut Vec::new());
        assert!(matches!(result, Err(Error::InvalidSession(_))));
    }
}
