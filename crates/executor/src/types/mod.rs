mod operation;
mod result;
mod rpc;
mod task;

pub use operation::{ContractOperation, StateCheckpoint};
pub use result::{TaskResult, TaskResultPayload};
pub use rpc::WireMessage;
pub use task::{Task, TaskId, TaskKind, TaskSource};
