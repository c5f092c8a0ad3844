//! Recognition loop driver.
//!
//! Pulls frames from a source, finds regions, asks the matcher who is in
//! each region and feeds every candidate through the [`Reconciler`].
//! The driver is synchronous; cancellation is observed between frames.

use super::reconciler::{RecognitionSession, Reconciler, ReconcilerConfig};
use crate::models::{Annotation, BoundingBox, Decision, IdentityCandidate, SessionContext};
use crate::storage::Ledger;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

/// One frame of input.
///
/// The pixel payload is owned by the frame source; the driver only needs
/// the frame's identity and capture time, which serves as `now` for every
/// candidate found in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number within the stream.
    pub index: u64,
    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
}

/// Produces frames until exhausted.
pub trait FrameSource {
    /// Returns the next frame, or `None` when the stream has ended.
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Finds face regions in a frame.
pub trait RegionDetector {
    /// Returns the regions to match, possibly none.
    fn detect(&self, frame: &Frame) -> Vec<BoundingBox>;
}

/// Maps a region to identity candidates.
pub trait Matcher {
    /// Minimum confidence at which this matcher's candidates are trusted.
    fn acceptance_threshold(&self) -> f32;

    /// Returns zero or more candidates for one region.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MatcherFailed`] if the region cannot be
    /// evaluated. The driver skips the region and continues.
    fn match_region(&self, frame: &Frame, region: &BoundingBox) -> Result<Vec<IdentityCandidate>>;
}

/// Receives per-frame output.
pub trait AnnotationSink {
    /// Receives the annotations for every region of a frame.
    fn annotate(&mut self, frame: &Frame, annotations: &[Annotation]);

    /// Receives each decision as it is made.
    fn on_decision(&mut self, _frame: &Frame, _decision: &Decision) {}
}

impl<T: RegionDetector + ?Sized> RegionDetector for &T {
    fn detect(&self, frame: &Frame) -> Vec<BoundingBox> {
        (**self).detect(frame)
    }
}

impl<T: Matcher + ?Sized> Matcher for &T {
    fn acceptance_threshold(&self) -> f32 {
        (**self).acceptance_threshold()
    }

    fn match_region(&self, frame: &Frame, region: &BoundingBox) -> Result<Vec<IdentityCandidate>> {
        (**self).match_region(frame, region)
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AnnotationSink for NullSink {
    fn annotate(&mut self, _frame: &Frame, _annotations: &[Annotation]) {}
}

/// Sink that keeps every frame's annotations and decisions in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    /// Annotations per frame index, in frame order.
    pub frames: Vec<(u64, Vec<Annotation>)>,
    /// Decisions in the order they were made.
    pub decisions: Vec<Decision>,
}

impl AnnotationSink for CollectingSink {
    fn annotate(&mut self, frame: &Frame, annotations: &[Annotation]) {
        self.frames.push((frame.index, annotations.to_vec()));
    }

    fn on_decision(&mut self, _frame: &Frame, decision: &Decision) {
        self.decisions.push(decision.clone());
    }
}

/// Cooperative cancellation flag shared with a signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Creates an unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the run stop before its next frame.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Frames pulled from the source.
    pub frames: u64,
    /// Regions detected across all frames.
    pub regions: u64,
    /// Candidates that produced a new record.
    pub accepted: u64,
    /// Candidates suppressed as repeats.
    pub suppressed: u64,
    /// Candidates rejected as unknown.
    pub rejected: u64,
    /// Regions skipped because the matcher failed.
    pub matcher_failures: u64,
    /// Whether the run ended on a stop request.
    pub stopped: bool,
}

impl RunSummary {
    fn record(&mut self, decision: &Decision) {
        match decision {
            Decision::Accepted { .. } => self.accepted += 1,
            Decision::Suppressed { .. } => self.suppressed += 1,
            Decision::Rejected { .. } => self.rejected += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} regions: {} accepted, {} suppressed, {} rejected, {} matcher failures",
            self.frames,
            self.regions,
            self.accepted,
            self.suppressed,
            self.rejected,
            self.matcher_failures
        )?;
        if self.stopped {
            write!(f, " (stopped)")?;
        }
        Ok(())
    }
}

/// Drives frames through detection, matching and reconciliation.
///
/// The reconciler's acceptance threshold is always taken from the matcher,
/// so the two cannot disagree about what counts as a confident match.
pub struct RecognitionLoop<L, S, D, M, A>
where
    L: Ledger,
    S: FrameSource,
    D: RegionDetector,
    M: Matcher,
    A: AnnotationSink,
{
    reconciler: Reconciler<L>,
    source: S,
    detector: D,
    matcher: M,
    sink: A,
}

impl<L, S, D, M, A> RecognitionLoop<L, S, D, M, A>
where
    L: Ledger,
    S: FrameSource,
    D: RegionDetector,
    M: Matcher,
    A: AnnotationSink,
{
    /// Creates a loop. `config.acceptance_threshold` is replaced by the
    /// matcher's threshold.
    #[must_use]
    pub fn new(
        ledger: L,
        config: ReconcilerConfig,
        source: S,
        detector: D,
        matcher: M,
        sink: A,
    ) -> Self {
        let config = config.with_acceptance_threshold(matcher.acceptance_threshold());
        Self {
            reconciler: Reconciler::new(ledger, config),
            source,
            detector,
            matcher,
            sink,
        }
    }

    /// Returns the reconciler.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler<L> {
        &self.reconciler
    }

    /// Returns the sink.
    #[must_use]
    pub const fn sink(&self) -> &A {
        &self.sink
    }

    /// Consumes the loop and returns the sink.
    #[must_use]
    pub fn into_sink(self) -> A {
        self.sink
    }

    /// Starts a session for this loop's reconciler.
    #[must_use]
    pub fn begin_session(&self, context: SessionContext) -> RecognitionSession {
        self.reconciler.begin_session(context)
    }

    /// Runs until the source is exhausted or `stop` is set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] as soon as the ledger
    /// fails; decisions already made stay written.
    #[instrument(skip_all, fields(operation = "recognition_run", session = %session.context()))]
    pub fn run(&mut self, session: &RecognitionSession, stop: &StopSignal) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            if stop.is_stopped() {
                tracing::info!(frames = summary.frames, "Stop requested, ending run");
                summary.stopped = true;
                break;
            }
            let Some(frame) = self.source.next_frame() else {
                break;
            };
            summary.frames += 1;

            let annotations = self.process_frame(&frame, session, &mut summary)?;
            self.sink.annotate(&frame, &annotations);
        }

        tracing::info!(%summary, "Recognition run finished");
        Ok(summary)
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        session: &RecognitionSession,
        summary: &mut RunSummary,
    ) -> Result<Vec<Annotation>> {
        let regions = self.detector.detect(frame);
        let mut annotations = Vec::with_capacity(regions.len());

        for region in regions {
            summary.regions += 1;

            let candidates = match self.matcher.match_region(frame, &region) {
                Ok(candidates) => candidates,
                Err(e) if e.is_fatal_to_run() => return Err(e),
                Err(e) => {
                    summary.matcher_failures += 1;
                    metrics::counter!("matcher_failures_total").increment(1);
                    tracing::warn!(frame = frame.index, ?region, error = %e, "Matcher failed, skipping region");
                    continue;
                },
            };

            if candidates.is_empty() {
                annotations.push(Annotation::unknown(region));
            }

            for candidate in &candidates {
                let decision = self.reconciler.reconcile(candidate, session, frame.captured_at)?;
                summary.record(&decision);
                self.sink.on_decision(frame, &decision);
                annotations.push(decision.annotate(region));
            }
        }

        Ok(annotations)
    }
}
