//! Narrow seam over the embedded scripting engine.
//!
//! The engine (parser, interpreter, GC) lives outside this crate; the
//! dispatcher only ever touches it through [`Engine`], and acquires fresh
//! instances through [`EngineProvider`]. One engine instance serves exactly
//! one top-level invocation and is dropped when its scope closes.

use eyre::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exit code an engine reports together with the forced-stop flag when its
/// own integrity is violated. This combination is never attributable to
/// the script and must be escalated, not recorded.
pub const EXIT_CODE_INTERNAL_ERROR: i32 = 102;

/// Exception code reserved for "instruction budget exhausted". Classified
/// as budget exhaustion, never as a generic script fault.
pub const EXCEPTION_LIMIT_OVER: i32 = 107;

/// A typed state value bound into the engine's evaluation environment.
#[derive(Clone, Debug, PartialEq)]
pub enum StateValue {
    Nil,
    Int(i64),
    Str(String),
    /// Opaque pointer-kind value, e.g. the state checkpoint handle.
    Pointer(u64),
}

/// Raw status of one engine invocation. Interpretation of the flags and
/// codes belongs to the caller (see `executor::classify`).
#[derive(Clone, Debug, Default)]
pub struct RunStatus {
    pub force_stopped: bool,
    pub exit_code: i32,
    /// Exception code + engine-reported message, when the run raised one.
    pub exception: Option<(i32, String)>,
    /// Serialized return values of the invoked method on normal return.
    pub returns: Option<String>,
}

/// Cooperative cancellation flag checked by the engine's instruction
/// governor. Raising it makes the next checked instruction boundary raise
/// an error and unwind the engine call stack; it never interrupts
/// mid-instruction.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Execution interface of one isolated engine instance.
///
/// Implementations release their native resources in `Drop`; the scope
/// holding the instance guarantees the drop happens on every exit path.
pub trait Engine: Send {
    /// Bind a read-only string into the script environment (e.g. `caller`,
    /// `caller_address`).
    fn bind_env_string(&mut self, name: &str, value: &str);

    fn set_state_value(&mut self, key: &str, value: StateValue);

    fn get_state_value(&self, key: &str) -> StateValue;

    /// Clear any pending exception state left over from a prior use of the
    /// underlying allocation.
    fn clear_pending_exception(&mut self);

    fn set_instruction_budget(&mut self, limit: u64);

    /// Instructions consumed by the most recent `execute`.
    fn instructions_executed(&self) -> u64;

    /// Install the cooperative interrupt flag the instruction governor
    /// checks at instruction boundaries.
    fn install_interrupt_flag(&mut self, flag: InterruptFlag);

    /// Run `method` of the contract at `contract_address` with serialized
    /// `args`. Blocking: returns when the script completes, raises, or is
    /// stopped by the governor. Faults are encoded in the returned status,
    /// never panics.
    fn execute(&mut self, contract_address: &str, method: &str, args: &str) -> RunStatus;
}

/// Factory for isolated engine instances, one per execution scope.
pub trait EngineProvider: Send + Sync {
    fn new_engine(&self) -> Result<Box<dyn Engine>>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Scripted behavior for one `MockEngine::execute` call.
    #[derive(Clone, Debug)]
    pub enum MockBehavior {
        Succeed {
            returns: Option<String>,
            instructions: u64,
        },
        RaiseException {
            code: i32,
            message: String,
            instructions: u64,
        },
        /// Governor fires: limit-over exception, budget fully consumed.
        ExhaustBudget,
        /// Forced stop with the internal-error exit code.
        InternalFault,
    }

    pub struct MockEngine {
        behavior: MockBehavior,
        budget: u64,
        executed: u64,
        env: HashMap<String, String>,
        state: HashMap<String, StateValue>,
        exception_cleared: bool,
        interrupt: Option<InterruptFlag>,
        drops: Arc<AtomicUsize>,
    }

    impl Engine for MockEngine {
        fn bind_env_string(&mut self, name: &str, value: &str) {
            self.env.insert(name.to_string(), value.to_string());
        }

        fn set_state_value(&mut self, key: &str, value: StateValue) {
            self.state.insert(key.to_string(), value);
        }

        fn get_state_value(&self, key: &str) -> StateValue {
            self.state.get(key).cloned().unwrap_or(StateValue::Nil)
        }

        fn clear_pending_exception(&mut self) {
            self.exception_cleared = true;
        }

        fn set_instruction_budget(&mut self, limit: u64) {
            self.budget = limit;
        }

        fn instructions_executed(&self) -> u64 {
            self.executed
        }

        fn install_interrupt_flag(&mut self, flag: InterruptFlag) {
            self.interrupt = Some(flag);
        }

        fn execute(&mut self, _contract_address: &str, _method: &str, _args: &str) -> RunStatus {
            // Every engine is reached through a scope; a scope that skips
            // any of its preparation steps is a bug.
            assert!(
                self.exception_cleared,
                "scope must clear pending exceptions before running"
            );
            assert!(self.env.contains_key("caller"), "caller must be bound");
            assert!(
                self.env.contains_key("caller_address"),
                "caller_address must be bound"
            );
            assert!(
                matches!(
                    self.state.get("evaluate_state"),
                    Some(StateValue::Pointer(_))
                ),
                "state checkpoint must be bound"
            );
            assert!(
                self.interrupt.is_some(),
                "interrupt flag must be installed"
            );
            if let Some(flag) = &self.interrupt {
                if flag.is_raised() {
                    self.executed = 1;
                    return RunStatus {
                        exception: Some((EXCEPTION_LIMIT_OVER, "interrupted".to_string())),
                        ..Default::default()
                    };
                }
            }
            match self.behavior.clone() {
                MockBehavior::Succeed {
                    returns,
                    instructions,
                } => {
                    self.executed = instructions;
                    RunStatus {
                        returns,
                        ..Default::default()
                    }
                }
                MockBehavior::RaiseException {
                    code,
                    message,
                    instructions,
                } => {
                    self.executed = instructions;
                    RunStatus {
                        exception: Some((code, message)),
                        ..Default::default()
                    }
                }
                MockBehavior::ExhaustBudget => {
                    self.executed = self.budget;
                    RunStatus {
                        exception: Some((
                            EXCEPTION_LIMIT_OVER,
                            "instruction limit exceeded".to_string(),
                        )),
                        ..Default::default()
                    }
                }
                MockBehavior::InternalFault => RunStatus {
                    force_stopped: true,
                    exit_code: EXIT_CODE_INTERNAL_ERROR,
                    ..Default::default()
                },
            }
        }
    }

    impl Drop for MockEngine {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Provider that hands out engines scripted with a fixed behavior and
    /// counts how many instances have been released.
    pub struct MockProvider {
        pub behavior: MockBehavior,
        pub drops: Arc<AtomicUsize>,
        pub fail_allocation: bool,
    }

    impl MockProvider {
        pub fn new(behavior: MockBehavior) -> Self {
            MockProvider {
                behavior,
                drops: Arc::new(AtomicUsize::new(0)),
                fail_allocation: false,
            }
        }

        pub fn failing() -> Self {
            MockProvider {
                behavior: MockBehavior::Succeed {
                    returns: None,
                    instructions: 0,
                },
                drops: Arc::new(AtomicUsize::new(0)),
                fail_allocation: true,
            }
        }

        pub fn engines_dropped(&self) -> usize {
            self.drops.load(Ordering::SeqCst)
        }
    }

    impl EngineProvider for MockProvider {
        fn new_engine(&self) -> Result<Box<dyn Engine>> {
            if self.fail_allocation {
                eyre::bail!("engine allocation failed");
            }
            Ok(Box::new(MockEngine {
                behavior: self.behavior.clone(),
                budget: 0,
                executed: 0,
                env: HashMap::new(),
                state: HashMap::new(),
                exception_cleared: false,
                interrupt: None,
                drops: self.drops.clone(),
            }))
        }
    }
}
