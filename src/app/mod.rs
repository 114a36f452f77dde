//! Service entrypoint: wires the workflow machine to the control API.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::api::{ApiCommand, ApiServer, WorkflowCommand, DEFAULT_PORT};
use crate::config::Config;
use crate::workflow::{LogNotifier, MeetingWorkflow, WorkflowStatusHandle};

pub async fn run_service(port: Option<u16>) -> Result<()> {
    info!("Starting MeetingRec service");

    let config = Config::load()?;
    let port = port.unwrap_or(DEFAULT_PORT);

    if !config.has_api_key() {
        info!("No OpenAI API key configured; recordings will not be transcribed");
    }

    let status = WorkflowStatusHandle::default();
    let mut workflow = MeetingWorkflow::new(
        config.clone(),
        Arc::new(LogNotifier),
        status.clone(),
    )?;

    let (tx, mut rx) = mpsc::channel::<ApiCommand>(10);

    let api_server = ApiServer::new(port, tx, status, config.output_dir()?);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("MeetingRec is ready!");
    info!(
        "Start a recording with: curl -X POST http://127.0.0.1:{}/start",
        port
    );
    info!(
        "Capture a screenshot with: curl -X POST http://127.0.0.1:{}/screenshot",
        port
    );

    // The server task holds a sender for its whole lifetime, so the channel
    // alone never closes; Ctrl-C is the way out, and it must go through
    // shutdown so an in-flight FFmpeg is stopped rather than orphaned.
    while let Some(ApiCommand { command, reply }) = next_command(&mut rx, ctrl_c()).await {
        let report = match command {
            WorkflowCommand::Start => workflow.start_recording().await,
            WorkflowCommand::Stop => workflow.stop_recording().await,
            WorkflowCommand::Toggle => workflow.toggle_recording().await.1,
            WorkflowCommand::Screenshot => workflow.capture_screenshot().await,
        };

        if !report.success {
            error!("{} failed: {}", command.as_str(), report.message);
        }
        // The handler may have given up waiting; that is fine.
        let _ = reply.send(report);
    }

    info!("Shutting down");
    workflow.shutdown().await;

    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler the loop runs until the process dies.
        std::future::pending::<()>().await;
    }
}

/// Wait for the next API command. Yields `None` when the channel closes or
/// the shutdown future completes, whichever comes first.
async fn next_command(
    rx: &mut mpsc::Receiver<ApiCommand>,
    shutdown: impl Future<Output = ()>,
) -> Option<ApiCommand> {
    tokio::select! {
        command = rx.recv() => command,
        _ = shutdown => {
            info!("Shutdown signal received");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_next_command_yields_queued_command() {
        let (tx, mut rx) = mpsc::channel(1);
        let (reply, _response) = oneshot::channel();
        tx.send(ApiCommand {
            command: WorkflowCommand::Start,
            reply,
        })
        .await
        .unwrap();

        let received = next_command(&mut rx, std::future::pending()).await;
        assert_eq!(received.unwrap().command, WorkflowCommand::Start);
    }

    #[tokio::test]
    async fn test_next_command_ends_loop_on_shutdown_with_live_senders() {
        // The channel stays open (the server owns a sender), so only the
        // shutdown signal can end the loop.
        let (tx, mut rx) = mpsc::channel::<ApiCommand>(1);

        let received = next_command(&mut rx, std::future::ready(())).await;
        assert!(received.is_none());
        drop(tx);
    }
}
