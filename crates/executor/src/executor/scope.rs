use crate::engine::{Engine, EngineProvider, InterruptFlag, RunStatus, StateValue};
use crate::executor::ExecutionError;
use crate::types::StateCheckpoint;

/// State value key under which the checkpoint handle is bound.
const EVALUATE_STATE_KEY: &str = "evaluate_state";

/// Environment bindings and budget for one execution scope.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub caller: String,
    pub caller_address: String,
    pub checkpoint: StateCheckpoint,
    pub budget: u64,
}

/// An isolated, single-use engine instance with its bound environment and
/// instruction budget.
///
/// The engine is released when the scope is dropped, so teardown happens
/// on every exit path of a handler, classified fault or not.
pub struct ExecutionScope {
    engine: Box<dyn Engine>,
    budget: u64,
}

impl ExecutionScope {
    /// Allocate an engine and prepare it for one top-level invocation:
    /// bind caller identity and address as read-only environment values,
    /// bind the state checkpoint, clear stale exception state, install the
    /// interrupt flag and set the instruction budget.
    pub fn open(
        provider: &dyn EngineProvider,
        ctx: &ExecutionContext,
        interrupt: InterruptFlag,
    ) -> Result<Self, ExecutionError> {
        let mut engine = provider
            .new_engine()
            .map_err(|err| ExecutionError::EngineFault(format!("engine allocation: {err}")))?;

        engine.bind_env_string("caller", &ctx.caller);
        engine.bind_env_string("caller_address", &ctx.caller_address);
        engine.set_state_value(
            EVALUATE_STATE_KEY,
            StateValue::Pointer(ctx.checkpoint.as_raw()),
        );
        engine.clear_pending_exception();
        engine.install_interrupt_flag(interrupt);
        engine.set_instruction_budget(ctx.budget);

        Ok(ExecutionScope {
            engine,
            budget: ctx.budget,
        })
    }

    /// Invoke the bound engine. Engine-internal fault flags and exception
    /// registers are mutated; nothing outside the scope is touched except
    /// through the checkpoint handle.
    pub fn run(&mut self, contract_address: &str, method: &str, args: &str) -> RunStatus {
        self.engine.execute(contract_address, method, args)
    }

    /// Instructions consumed by the most recent [`run`](Self::run).
    pub fn instructions_executed(&self) -> u64 {
        self.engine.instructions_executed()
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Budget left after the most recent run, for fee accounting.
    pub fn remaining_budget(&self) -> u64 {
        self.budget.saturating_sub(self.engine.instructions_executed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockBehavior, MockProvider};

    fn ctx(budget: u64) -> ExecutionContext {
        ExecutionContext {
            caller: "alice".to_string(),
            caller_address: "CSabc123".to_string(),
            checkpoint: StateCheckpoint::new(7),
            budget,
        }
    }

    #[test]
    fn open_prepares_engine_and_run_reports_instructions() {
        let provider = MockProvider::new(MockBehavior::Succeed {
            returns: Some("[1]".to_string()),
            instructions: 500,
        });
        let mut scope =
            ExecutionScope::open(&provider, &ctx(1_000_000), InterruptFlag::new()).unwrap();

        let status = scope.run("CScontract", "get", "[]");
        assert!(!status.force_stopped);
        assert_eq!(status.returns.as_deref(), Some("[1]"));
        assert_eq!(scope.instructions_executed(), 500);
        assert_eq!(scope.remaining_budget(), 999_500);
    }

    #[test]
    fn scope_releases_engine_on_drop() {
        let provider = MockProvider::new(MockBehavior::Succeed {
            returns: None,
            instructions: 1,
        });
        {
            let _scope =
                ExecutionScope::open(&provider, &ctx(100), InterruptFlag::new()).unwrap();
        }
        assert_eq!(provider.engines_dropped(), 1);
    }

    #[test]
    fn allocation_failure_is_an_engine_fault() {
        let provider = MockProvider::failing();
        let err = ExecutionScope::open(&provider, &ctx(100), InterruptFlag::new())
            .err()
            .unwrap();
        assert!(matches!(err, ExecutionError::EngineFault(_)));
    }

    #[test]
    fn raised_interrupt_stops_the_next_run() {
        let provider = MockProvider::new(MockBehavior::Succeed {
            returns: None,
            instructions: 10,
        });
        let interrupt = InterruptFlag::new();
        let mut scope = ExecutionScope::open(&provider, &ctx(100), interrupt.clone()).unwrap();

        interrupt.raise();
        let status = scope.run("CScontract", "loop", "[]");
        assert!(status.exception.is_some());
    }
}
