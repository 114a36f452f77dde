//! Integration tests for the post-recording pipeline and embedded images.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use meetingrec::config::Config;
use meetingrec::report::embed;
use meetingrec::workflow::machine::run_post_processing;
use meetingrec::workflow::{ChannelNotifier, WorkflowEvent, WorkflowPhase, WorkflowStatusHandle};

fn fast_config() -> Config {
    let mut config = Config::default();
    config.markdown.transcript_wait_seconds = 0;
    config
}

fn make_meeting(root: &Path) -> PathBuf {
    let meeting = root.join("2025-05-21-16-00-meeting");
    std::fs::create_dir_all(meeting.join("screenshots")).unwrap();
    std::fs::write(
        meeting.join("meeting_info.txt"),
        "Recording started at: 2025-05-21T16:00:00\n",
    )
    .unwrap();
    std::fs::write(meeting.join("meeting_audio.mp3"), b"audio").unwrap();
    meeting
}

#[tokio::test]
async fn test_pipeline_aligns_and_reports_with_existing_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let meeting = make_meeting(dir.path());

    // Pre-existing transcript stands in for the transcription step, which is
    // skipped without an API key.
    std::fs::write(
        meeting.join("transcript_20250521_160500.json"),
        r#"{"text": "status update", "segments": [
            {"start": 0.0, "end": 30.0, "text": "status update"}
        ]}"#,
    )
    .unwrap();
    std::fs::write(
        meeting.join("screenshots/screenshot_00000_16-00-10.jpg"),
        b"img",
    )
    .unwrap();

    let (notifier, mut events) = ChannelNotifier::new();
    let status = WorkflowStatusHandle::default();
    status.start_recording(meeting.clone()).await;
    status.set_phase(WorkflowPhase::Processing).await;

    run_post_processing(
        fast_config(),
        meeting.clone(),
        meeting.join("meeting_audio.mp3"),
        status.clone(),
        Arc::new(notifier),
    )
    .await;

    assert_eq!(status.get().await.phase, WorkflowPhase::Completed);
    assert!(meeting.join("aligned_content.json").exists());

    let report = std::fs::read_to_string(meeting.join("meeting_report.md")).unwrap();
    assert!(report.contains("status update"));

    assert!(matches!(
        events.recv().await.unwrap(),
        WorkflowEvent::ProcessingStarted { .. }
    ));
    match events.recv().await.unwrap() {
        WorkflowEvent::ReportReady { report_path } => {
            assert!(report_path.ends_with("meeting_report.md"));
        }
        other => panic!("expected ReportReady, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pipeline_without_transcript_degrades_to_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let meeting = make_meeting(dir.path());

    let (notifier, _events) = ChannelNotifier::new();
    let status = WorkflowStatusHandle::default();
    status.start_recording(meeting.clone()).await;
    status.set_phase(WorkflowPhase::Processing).await;

    run_post_processing(
        fast_config(),
        meeting.clone(),
        meeting.join("meeting_audio.mp3"),
        status.clone(),
        Arc::new(notifier),
    )
    .await;

    assert_eq!(status.get().await.phase, WorkflowPhase::Completed);
    // No transcript, so no alignment output, but the report still lands.
    assert!(!meeting.join("aligned_content.json").exists());
    let report = std::fs::read_to_string(meeting.join("meeting_report.md")).unwrap();
    assert!(report.contains("*Transcript not available."));
}

#[test]
fn test_embedded_image_respects_width_and_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.png");
    image::RgbImage::from_pixel(2000, 500, image::Rgb([10, 20, 30]))
        .save(&path)
        .unwrap();

    let embedded = embed::process_for_embedding(&path, 1200, 85).unwrap();
    assert!(embedded.width <= 1200);
    assert!(embedded.data_uri.starts_with("data:image/jpeg;base64,"));
}
