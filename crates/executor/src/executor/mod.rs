//! Operation dispatcher: one handler per contract operation kind.
//!
//! Every handler follows the same shape: validate the payload, open an
//! execution scope sized from configuration, run the engine, classify the
//! raw status, populate the typed result. Only an engine-integrity
//! violation leaves a handler as an error; every other condition becomes a
//! populated [`TaskResult`].

mod scope;

pub use scope::{ExecutionContext, ExecutionScope};

use crate::config::ExecutionConfig;
use crate::engine::{
    EngineProvider, InterruptFlag, RunStatus, EXCEPTION_LIMIT_OVER, EXIT_CODE_INTERNAL_ERROR,
};
use crate::types::{ContractOperation, Task, TaskKind, TaskResult, TaskResultPayload};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Host-assigned error code bands carried in task results.
pub mod codes {
    /// Operation completed normally.
    pub const SUCCESS: u32 = 0;
    /// Malformed operation payload, detected before any engine is opened.
    pub const VALIDATION_FAULT: u32 = 31000;
    /// Script raised an ordinary runtime error.
    pub const SCRIPT_FAULT: u32 = 32000;
    /// Script consumed its full instruction allowance.
    pub const BUDGET_EXCEEDED: u32 = 32001;
}

/// Fatal, non-recoverable dispatch failures.
///
/// These unwind past the dispatcher: the engine is in an inconsistent
/// state and the enclosing operation batch cannot safely continue. All
/// recoverable conditions are recorded in the task result instead.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("engine integrity violated: {0}")]
    EngineFault(String),
}

/// Classified outcome of running an operation inside a scope.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success { returns: Option<String> },
    ScriptFault { code: i32, message: String },
    BudgetExceeded,
}

/// Interpret the raw engine status.
///
/// Forced stop combined with the internal-error exit code means the
/// engine itself is broken and is escalated; the reserved limit-over
/// exception code is budget exhaustion; any other nonzero exception is a
/// recoverable script fault.
pub fn classify(status: RunStatus) -> Result<Outcome, ExecutionError> {
    if status.force_stopped && status.exit_code == EXIT_CODE_INTERNAL_ERROR {
        return Err(ExecutionError::EngineFault(format!(
            "forced stop with exit code {}",
            status.exit_code
        )));
    }
    match status.exception {
        Some((EXCEPTION_LIMIT_OVER, _)) => Ok(Outcome::BudgetExceeded),
        Some((code, message)) if code != 0 => Ok(Outcome::ScriptFault { code, message }),
        _ => Ok(Outcome::Success {
            returns: status.returns,
        }),
    }
}

/// Dispatches contract operations into bounded, isolated engine runs.
///
/// Cheap to clone; clones share the engine provider, the configuration and
/// the interrupt flag, so raising the flag stops in-flight runs on every
/// clone at the next instruction boundary.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn EngineProvider>,
    config: ExecutionConfig,
    interrupt: InterruptFlag,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn EngineProvider>, config: ExecutionConfig) -> Self {
        Dispatcher {
            provider,
            config,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Handle to the cooperative cancellation flag. Raising it aborts
    /// in-flight and subsequent runs at the next instruction boundary.
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    /// Run one contract operation end to end and produce its result.
    ///
    /// Returns `Err` only on an engine-integrity violation; validation
    /// faults, script faults and budget exhaustion are recorded in the
    /// returned result and the caller may keep processing.
    pub fn dispatch(
        &self,
        task: &Task,
        operation: &ContractOperation,
    ) -> Result<TaskResult, ExecutionError> {
        self.dispatch_at(task, operation, crate::types::StateCheckpoint::default())
    }

    /// As [`dispatch`](Self::dispatch), but against an explicit state
    /// checkpoint instead of the default ledger view.
    pub fn dispatch_at(
        &self,
        task: &Task,
        operation: &ContractOperation,
        checkpoint: crate::types::StateCheckpoint,
    ) -> Result<TaskResult, ExecutionError> {
        let kind = operation_kind(operation);
        if let Err(reason) = validate(task, kind, operation) {
            tracing::info!(
                task_id = task.id,
                "rejecting malformed operation: {reason}"
            );
            return Ok(TaskResult::failure(task, codes::VALIDATION_FAULT, reason));
        }

        // Entry point and serialized arguments per operation kind; the
        // non-Call operations run the contract's reserved entries.
        let (method, args): (&str, String) = match operation {
            ContractOperation::Register { init_args, .. } => ("init", init_args.clone()),
            ContractOperation::Upgrade { upgrade_args, .. } => ("on_upgrade", upgrade_args.clone()),
            ContractOperation::Destroy { .. } => ("on_destroy", String::new()),
            ContractOperation::Call { method, args, .. } => (method, args.clone()),
            ContractOperation::Transfer {
                to_address,
                amount,
                memo,
                ..
            } => ("on_deposit", json!([to_address, amount, memo]).to_string()),
        };

        let ctx = ExecutionContext {
            caller: operation.caller().to_string(),
            caller_address: operation.caller_address().to_string(),
            checkpoint,
            budget: self.config.budget_for(kind),
        };
        self.run_in_scope(task, operation, method, &args, ctx)
    }

    /// The uniform handler body shared by all operation kinds.
    fn run_in_scope(
        &self,
        task: &Task,
        operation: &ContractOperation,
        method: &str,
        args: &str,
        ctx: ExecutionContext,
    ) -> Result<TaskResult, ExecutionError> {
        // The scope is dropped on every path out of this function,
        // releasing the engine instance.
        let mut scope = ExecutionScope::open(self.provider.as_ref(), &ctx, self.interrupt.clone())?;
        let status = scope.run(operation.contract_address(), method, args);

        match classify(status)? {
            Outcome::Success { returns } => {
                let executed = scope.instructions_executed();
                tracing::trace!(
                    task_id = task.id,
                    instructions_executed = executed,
                    remaining_budget = scope.remaining_budget(),
                    "operation completed"
                );
                Ok(TaskResult::success(
                    task,
                    success_payload(operation, returns, executed),
                ))
            }
            Outcome::ScriptFault { code, message } => {
                tracing::trace!(
                    task_id = task.id,
                    engine_code = code,
                    "script fault: {message}"
                );
                Ok(TaskResult::failure(task, codes::SCRIPT_FAULT, message))
            }
            Outcome::BudgetExceeded => {
                tracing::trace!(
                    task_id = task.id,
                    budget = scope.budget(),
                    "instruction budget exhausted"
                );
                Ok(TaskResult::failure(
                    task,
                    codes::BUDGET_EXCEEDED,
                    "contract ran out of instruction budget",
                ))
            }
        }
    }
}

fn operation_kind(operation: &ContractOperation) -> TaskKind {
    match operation {
        ContractOperation::Register { .. } => TaskKind::Register,
        ContractOperation::Upgrade { .. } => TaskKind::Upgrade,
        ContractOperation::Destroy { .. } => TaskKind::Destroy,
        ContractOperation::Call { .. } => TaskKind::Call,
        ContractOperation::Transfer { .. } => TaskKind::Transfer,
    }
}

/// Payload constraints checked before any engine is allocated.
fn validate(task: &Task, kind: TaskKind, operation: &ContractOperation) -> Result<(), String> {
    if task.kind != kind {
        return Err(format!(
            "task kind {:?} does not match operation kind {:?}",
            task.kind, kind
        ));
    }
    if operation.contract_address().is_empty() {
        return Err("contract address must not be empty".to_string());
    }
    match operation {
        ContractOperation::Call { method, .. } if method.is_empty() => {
            Err("call method must not be empty".to_string())
        }
        ContractOperation::Register { bytecode_path, .. }
        | ContractOperation::Upgrade { bytecode_path, .. }
            if bytecode_path.as_os_str().is_empty() =>
        {
            Err("bytecode artifact must be present".to_string())
        }
        ContractOperation::Transfer { to_address, .. } if to_address.is_empty() => {
            Err("transfer destination must not be empty".to_string())
        }
        _ => Ok(()),
    }
}

fn success_payload(
    operation: &ContractOperation,
    returns: Option<String>,
    instructions_executed: u64,
) -> TaskResultPayload {
    match operation {
        ContractOperation::Register { bytecode_path, .. } => TaskResultPayload::Register {
            artifact_path: bytecode_path.clone(),
        },
        ContractOperation::Upgrade { .. } => TaskResultPayload::Upgrade {
            instructions_executed,
        },
        ContractOperation::Destroy { .. } => TaskResultPayload::Destroy {
            instructions_executed,
        },
        ContractOperation::Call { .. } => TaskResultPayload::Call {
            returns,
            instructions_executed,
        },
        ContractOperation::Transfer { .. } => TaskResultPayload::Transfer {
            instructions_executed,
        },
    }
}
