//! Meeting workflow orchestrator.
//!
//! Manages the full meeting pipeline:
//! start → screenshots → stop → transcribe → align → insights → report
//!
//! Recording operations are synchronous from the caller's point of view;
//! post-recording processing runs in a background task whose handle is
//! retained so shutdown can wait for it instead of abandoning it.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::align::{AlignedContent, TranscriptAligner};
use crate::config::Config;
use crate::error::{ErrorCategory, OpReport};
use crate::insights::InsightsService;
use crate::recorder::SystemAudioRecorder;
use crate::report::MarkdownExporter;
use crate::screenshot::ScreenshotCapture;
use crate::transcription::TranscriptionService;

use super::notifier::{Notifier, WorkflowEvent};
use super::status::{WorkflowPhase, WorkflowStatusHandle};

pub struct MeetingWorkflow {
    config: Config,
    recorder: SystemAudioRecorder,
    screenshots: ScreenshotCapture,
    notifier: Arc<dyn Notifier>,
    status: WorkflowStatusHandle,
    processing: Option<JoinHandle<()>>,
}

/// Outcome of a toggle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Stopped,
}

impl MeetingWorkflow {
    /// Build a workflow from configuration, verifying external tooling
    /// (FFmpeg, screencapture) up front.
    pub fn new(
        config: Config,
        notifier: Arc<dyn Notifier>,
        status: WorkflowStatusHandle,
    ) -> anyhow::Result<Self> {
        let output_dir = config.output_dir()?;
        let recorder = SystemAudioRecorder::new(config.audio.clone(), output_dir)?;
        let screenshots = ScreenshotCapture::new(&config.screenshot)?;

        Ok(Self {
            config,
            recorder,
            screenshots,
            notifier,
            status,
            processing: None,
        })
    }

    pub fn status_handle(&self) -> WorkflowStatusHandle {
        self.status.clone()
    }

    /// Start a meeting recording.
    pub async fn start_recording(&mut self) -> OpReport {
        let state = self.status.get().await;
        if state.phase == WorkflowPhase::Recording {
            return OpReport::failure_with_category(
                ErrorCategory::Recording,
                "Recording already in progress. Stop it first or use toggle.",
            );
        }

        let started = match self.recorder.start_recording().await {
            Ok(started) => started,
            Err(e) => {
                let report = OpReport::from_error(&e);
                self.status.set_error(report.message.clone()).await;
                return report;
            }
        };

        if let Err(e) = self.screenshots.set_meeting_path(&started.meeting_path) {
            warn!("Failed to prepare screenshot directory: {:#}", e);
        }

        self.status
            .start_recording(started.meeting_path.clone())
            .await;
        self.notifier
            .notify(&WorkflowEvent::RecordingStarted {
                meeting_path: started.meeting_path.clone(),
            })
            .await;

        OpReport::success("Recording started")
            .with_detail("meeting_path", started.meeting_path.display().to_string())
            .with_detail("audio_path", started.audio_path.display().to_string())
    }

    /// Stop the recording and kick off background processing.
    pub async fn stop_recording(&mut self) -> OpReport {
        let state = self.status.get().await;
        if state.phase != WorkflowPhase::Recording {
            return OpReport::failure_with_category(
                ErrorCategory::Recording,
                format!(
                    "No recording in progress (current phase: {})",
                    state.phase.as_str()
                ),
            );
        }

        self.status.set_phase(WorkflowPhase::Stopping).await;
        self.screenshots.clear_meeting_path();

        let stopped = match self.recorder.stop_recording().await {
            Ok(stopped) => stopped,
            Err(e) => {
                let report = OpReport::from_error(&e);
                self.status.set_error(report.message.clone()).await;
                return report;
            }
        };

        self.notifier
            .notify(&WorkflowEvent::RecordingStopped {
                meeting_path: stopped.meeting_path.clone(),
                duration_seconds: stopped.duration_seconds,
            })
            .await;

        self.status.set_phase(WorkflowPhase::Processing).await;
        self.spawn_processing(stopped.meeting_path.clone(), stopped.audio_path.clone());

        OpReport::success("Recording stopped, processing in background")
            .with_detail("meeting_path", stopped.meeting_path.display().to_string())
            .with_detail("audio_path", stopped.audio_path.display().to_string())
            .with_detail("duration_seconds", stopped.duration_seconds)
            .with_detail("file_size", stopped.file_size)
    }

    /// Toggle recording: stop when recording, start otherwise.
    pub async fn toggle_recording(&mut self) -> (ToggleOutcome, OpReport) {
        let state = self.status.get().await;
        match state.phase {
            WorkflowPhase::Recording => (ToggleOutcome::Stopped, self.stop_recording().await),
            WorkflowPhase::Idle | WorkflowPhase::Completed | WorkflowPhase::Error => {
                (ToggleOutcome::Started, self.start_recording().await)
            }
            phase => (
                ToggleOutcome::Started,
                OpReport::failure_with_category(
                    ErrorCategory::Recording,
                    format!("Cannot toggle while {}", phase.as_str()),
                ),
            ),
        }
    }

    /// Capture a screenshot into the active meeting.
    pub async fn capture_screenshot(&mut self) -> OpReport {
        let state = self.status.get().await;
        if state.phase != WorkflowPhase::Recording {
            return OpReport::failure_with_category(
                ErrorCategory::Screenshot,
                "No active meeting. Start recording first.",
            );
        }

        let report = self.screenshots.capture_active_window().await;
        if report.success {
            let count = self.status.record_screenshot().await;
            self.notifier
                .notify(&WorkflowEvent::ScreenshotCaptured { count })
                .await;
        }
        report
    }

    fn spawn_processing(&mut self, meeting_path: PathBuf, audio_path: PathBuf) {
        if let Some(handle) = self.processing.take() {
            if !handle.is_finished() {
                warn!("Previous meeting is still processing; it keeps running");
            }
            // Let the old task run to completion unsupervised.
            drop(handle);
        }

        let config = self.config.clone();
        let status = self.status.clone();
        let notifier = Arc::clone(&self.notifier);

        self.processing = Some(tokio::spawn(async move {
            run_post_processing(config, meeting_path, audio_path, status, notifier).await;
        }));
    }

    /// Wait for any in-flight background processing to finish.
    pub async fn wait_for_processing(&mut self) {
        if let Some(handle) = self.processing.take() {
            if let Err(e) = handle.await {
                error!("Processing task panicked: {}", e);
            }
        }
    }

    /// Stop any recording and finish processing. Called on application exit.
    pub async fn shutdown(&mut self) {
        if self.recorder.is_recording() {
            info!("Shutdown: stopping in-flight recording");
            let report = self.stop_recording().await;
            if !report.success {
                warn!("Shutdown stop failed: {}", report.message);
            }
        }
        self.recorder.cleanup_on_exit().await;
        self.wait_for_processing().await;
    }
}

/// Post-recording pipeline: transcribe → align → insights → report.
///
/// Transcription and insights are skipped when unconfigured, and every
/// stage failure degrades to a report with placeholders rather than
/// aborting the run. The report is the one artifact that must land.
pub async fn run_post_processing(
    config: Config,
    meeting_path: PathBuf,
    audio_path: PathBuf,
    status: WorkflowStatusHandle,
    notifier: Arc<dyn Notifier>,
) {
    notifier
        .notify(&WorkflowEvent::ProcessingStarted {
            meeting_path: meeting_path.clone(),
        })
        .await;

    let transcription = TranscriptionService::new(&config.ai);
    if transcription.is_configured() {
        let report = transcription
            .transcribe_audio(&audio_path, &meeting_path)
            .await;
        if !report.success {
            warn!("Transcription failed: {}", report.message);
        }
    } else {
        info!("Transcription not configured, report will use a placeholder");
    }

    let aligner = TranscriptAligner::new(config.alignment.slack_seconds);
    let align_report = aligner.align_meeting_content(&meeting_path);
    if !align_report.success {
        warn!("Alignment skipped: {}", align_report.message);
    }

    if let Some(insights) = InsightsService::new(&config.ai) {
        match load_aligned_content(&meeting_path) {
            Some(content) => {
                if let Err(e) = insights.process_meeting(&meeting_path, &content).await {
                    warn!("Insights generation failed: {:#}", e);
                }
            }
            None => info!("No aligned content, skipping insights"),
        }
    }

    // The status handle may belong to a newer recording by now; the
    // ownership check inside complete/fail keeps a stale pipeline from
    // flipping its phase.
    let exporter = MarkdownExporter::new(&config.markdown);
    match exporter.generate_report(&meeting_path).await {
        Ok(report_path) => {
            if !status.complete_meeting(&meeting_path).await {
                info!("A newer recording owns the status; leaving it untouched");
            }
            notifier
                .notify(&WorkflowEvent::ReportReady { report_path })
                .await;
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!("Report generation failed: {}", message);
            if !status.fail_meeting(&meeting_path, message.clone()).await {
                warn!("A newer recording owns the status; not marking it errored");
            }
            notifier
                .notify(&WorkflowEvent::ProcessingFailed { message })
                .await;
        }
    }
}

fn load_aligned_content(meeting_path: &std::path::Path) -> Option<AlignedContent> {
    let path = meeting_path.join("aligned_content.json");
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::notifier::ChannelNotifier;

    fn fast_config() -> Config {
        let mut config = Config::default();
        // No API key, no waiting on transcripts.
        config.markdown.transcript_wait_seconds = 0;
        config
    }

    #[tokio::test]
    async fn test_post_processing_without_ai_still_produces_report() {
        let dir = tempfile::tempdir().unwrap();
        let meeting_path = dir.path().join("2025-05-21-10-00-meeting");
        std::fs::create_dir_all(meeting_path.join("screenshots")).unwrap();
        std::fs::write(
            meeting_path.join("meeting_info.txt"),
            "Recording started at: 2025-05-21T10:00:00\n",
        )
        .unwrap();
        std::fs::write(meeting_path.join("meeting_audio.mp3"), b"audio").unwrap();

        let (notifier, mut events) = ChannelNotifier::new();
        let status = WorkflowStatusHandle::default();
        status.start_recording(meeting_path.clone()).await;
        status.set_phase(WorkflowPhase::Processing).await;

        run_post_processing(
            fast_config(),
            meeting_path.clone(),
            meeting_path.join("meeting_audio.mp3"),
            status.clone(),
            Arc::new(notifier),
        )
        .await;

        assert_eq!(status.get().await.phase, WorkflowPhase::Completed);
        assert!(meeting_path.join("meeting_report.md").exists());

        let first = events.recv().await.unwrap();
        assert!(matches!(first, WorkflowEvent::ProcessingStarted { .. }));
        let second = events.recv().await.unwrap();
        assert!(matches!(second, WorkflowEvent::ReportReady { .. }));
    }

    #[tokio::test]
    async fn test_post_processing_missing_meeting_reports_failure() {
        let (notifier, mut events) = ChannelNotifier::new();
        let status = WorkflowStatusHandle::default();
        status
            .start_recording(PathBuf::from("/nonexistent/meeting"))
            .await;
        status.set_phase(WorkflowPhase::Processing).await;

        run_post_processing(
            fast_config(),
            PathBuf::from("/nonexistent/meeting"),
            PathBuf::from("/nonexistent/meeting/meeting_audio.mp3"),
            status.clone(),
            Arc::new(notifier),
        )
        .await;

        let state = status.get().await;
        assert_eq!(state.phase, WorkflowPhase::Error);
        assert!(state.last_error.is_some());

        let first = events.recv().await.unwrap();
        assert!(matches!(first, WorkflowEvent::ProcessingStarted { .. }));
        let second = events.recv().await.unwrap();
        assert!(second.is_failure());
    }

    #[tokio::test]
    async fn test_stale_pipeline_leaves_new_recording_alone() {
        let dir = tempfile::tempdir().unwrap();
        let old_meeting = dir.path().join("2025-05-21-10-00-meeting");
        std::fs::create_dir_all(old_meeting.join("screenshots")).unwrap();
        std::fs::write(old_meeting.join("meeting_audio.mp3"), b"audio").unwrap();

        let (notifier, _events) = ChannelNotifier::new();
        let status = WorkflowStatusHandle::default();
        // A new recording started while the old meeting was still processing.
        let new_meeting = dir.path().join("2025-05-21-11-00-meeting");
        status.start_recording(new_meeting.clone()).await;

        run_post_processing(
            fast_config(),
            old_meeting.clone(),
            old_meeting.join("meeting_audio.mp3"),
            status.clone(),
            Arc::new(notifier),
        )
        .await;

        // The old meeting's report still lands, but the live recording keeps
        // its phase and stays stoppable.
        assert!(old_meeting.join("meeting_report.md").exists());
        let state = status.get().await;
        assert_eq!(state.phase, WorkflowPhase::Recording);
        assert_eq!(state.meeting_path, Some(new_meeting));
    }

    #[tokio::test]
    async fn test_stale_pipeline_failure_does_not_mark_error() {
        let (notifier, _events) = ChannelNotifier::new();
        let status = WorkflowStatusHandle::default();
        status
            .start_recording(PathBuf::from("/tmp/current-meeting"))
            .await;

        run_post_processing(
            fast_config(),
            PathBuf::from("/nonexistent/meeting"),
            PathBuf::from("/nonexistent/meeting/meeting_audio.mp3"),
            status.clone(),
            Arc::new(notifier),
        )
        .await;

        let state = status.get().await;
        assert_eq!(state.phase, WorkflowPhase::Recording);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_load_aligned_content_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_aligned_content(dir.path()).is_none());
    }

    #[test]
    fn test_load_aligned_content_present() {
        let dir = tempfile::tempdir().unwrap();
        let content = AlignedContent {
            segments: vec![],
            total_screenshots: 2,
            total_segments: 0,
            screenshots_used: 0,
        };
        std::fs::write(
            dir.path().join("aligned_content.json"),
            serde_json::to_string(&content).unwrap(),
        )
        .unwrap();

        let loaded = load_aligned_content(dir.path()).unwrap();
        assert_eq!(loaded.total_screenshots, 2);
    }
}
