use super::task::{Task, TaskId, TaskKind, TaskSource};
use super::WireMessage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Variant-specific payload of a task result.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub enum TaskResultPayload {
    #[default]
    Empty,
    Compile {
        artifact_path: PathBuf,
    },
    Register {
        artifact_path: PathBuf,
    },
    Call {
        /// Serialized return values of the invoked method, when any.
        returns: Option<String>,
        instructions_executed: u64,
    },
    Upgrade {
        instructions_executed: u64,
    },
    Destroy {
        instructions_executed: u64,
    },
    Transfer {
        instructions_executed: u64,
    },
}

/// Outcome record for a dispatched task.
///
/// The header triple (`task_id`, `task_type`, `task_from`) is snapshotted
/// from the originating [`Task`] at construction, so a result stays
/// traceable to exactly one task even after the task is gone. Constructed
/// once, at the end of a handler, and never mutated afterwards.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub task_type: TaskKind,
    pub task_from: TaskSource,
    pub error_code: u32,
    pub error_msg: String,
    pub payload: TaskResultPayload,
}

impl TaskResult {
    pub fn success(task: &Task, payload: TaskResultPayload) -> Self {
        TaskResult {
            task_id: task.id,
            task_type: task.kind,
            task_from: task.source,
            error_code: 0,
            error_msg: String::new(),
            payload,
        }
    }

    /// A populated error record. A nonzero code always carries a
    /// non-empty message; an empty engine message is replaced with a
    /// generic one so the invariant holds by construction.
    pub fn failure(task: &Task, error_code: u32, error_msg: impl Into<String>) -> Self {
        let mut error_msg = error_msg.into();
        if error_msg.is_empty() {
            error_msg = "unspecified contract error".to_string();
        }
        TaskResult {
            task_id: task.id,
            task_type: task.kind,
            task_from: task.source,
            error_code,
            error_msg,
            payload: TaskResultPayload::Empty,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }

    /// Wrap the result into its transport envelope. This is the sole path
    /// by which a result leaves the dispatcher.
    pub fn into_wire_message(self) -> WireMessage {
        WireMessage {
            msg_id: self.task_id,
            payload: self,
        }
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "  task_id : {}", self.task_id)?;
        writeln!(f, "  task_type : {:?}", self.task_type)?;
        writeln!(f, "  task_from : {:?}", self.task_from)?;
        writeln!(f, "  error_code : {}", self.error_code)?;
        writeln!(f, "  error_msg : {}", self.error_msg)?;
        match &self.payload {
            TaskResultPayload::Empty => {}
            TaskResultPayload::Compile { artifact_path }
            | TaskResultPayload::Register { artifact_path } => {
                writeln!(f, "  artifact_path : {}", artifact_path.display())?;
            }
            TaskResultPayload::Call {
                returns,
                instructions_executed,
            } => {
                writeln!(f, "  returns : {}", returns.as_deref().unwrap_or(""))?;
                writeln!(f, "  instructions_executed : {instructions_executed}")?;
            }
            TaskResultPayload::Upgrade {
                instructions_executed,
            }
            | TaskResultPayload::Destroy {
                instructions_executed,
            }
            | TaskResultPayload::Transfer {
                instructions_executed,
            } => {
                writeln!(f, "  instructions_executed : {instructions_executed}")?;
            }
        }
        write!(f, "}}")
    }
}
