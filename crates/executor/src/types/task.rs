use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub type TaskId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum TaskKind {
    #[default]
    Compile,
    Register,
    Call,
    Upgrade,
    Destroy,
    Transfer,
}

/// Origin of a task submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum TaskSource {
    #[default]
    Cli,
    Network,
    Internal,
}

/// A unit of submitted work. Created at submission time, immutable
/// thereafter; owned by the submitter until handed to the dispatcher.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub source: TaskSource,
}

// Last id handed out. Ids derive from the submission timestamp but must
// stay strictly monotonic even when the clock ties or steps backwards.
static LAST_TASK_ID: AtomicU64 = AtomicU64::new(0);

fn next_task_id() -> TaskId {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);

    let mut prev = LAST_TASK_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_TASK_ID.compare_exchange_weak(
            prev,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}

impl Task {
    pub fn new(kind: TaskKind, source: TaskSource) -> Self {
        Task {
            id: next_task_id(),
            kind,
            source,
        }
    }
}
