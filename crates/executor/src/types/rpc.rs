use super::result::TaskResult;
use super::task::TaskId;
use serde::{Deserialize, Serialize};

/// Transport envelope for a finished task result.
///
/// The message identifier is the originating task id; delivery order is
/// not guaranteed to match submission order, so consumers correlate by
/// `msg_id`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WireMessage {
    pub msg_id: TaskId,
    pub payload: TaskResult,
}
