//! Meeting workflow orchestration.

pub mod machine;
pub mod notifier;
pub mod status;

pub use machine::{MeetingWorkflow, ToggleOutcome};
pub use notifier::{ChannelNotifier, LogNotifier, Notifier, WorkflowEvent};
pub use status::{WorkflowPhase, WorkflowState, WorkflowStatusHandle};
