use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque handle naming the ledger state view a contract invocation
/// operates against. Bound into the engine as a pointer-kind state value;
/// its consistency guarantees belong to the external state layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateCheckpoint(u64);

impl StateCheckpoint {
    pub fn new(raw: u64) -> Self {
        StateCheckpoint(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Payload of a contract operation. Immutable input to a handler.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum ContractOperation {
    Register {
        contract_address: String,
        caller: String,
        caller_address: String,
        /// Compiled bytecode artifact produced by the (out of scope)
        /// compiler; echoed into the result for the submitter.
        bytecode_path: PathBuf,
        init_args: String,
    },
    Upgrade {
        contract_address: String,
        caller: String,
        caller_address: String,
        bytecode_path: PathBuf,
        upgrade_args: String,
    },
    Destroy {
        contract_address: String,
        caller: String,
        caller_address: String,
    },
    Call {
        contract_address: String,
        caller: String,
        caller_address: String,
        method: String,
        args: String,
    },
    Transfer {
        contract_address: String,
        caller: String,
        caller_address: String,
        to_address: String,
        amount: u64,
        memo: Option<String>,
    },
}

impl ContractOperation {
    pub fn contract_address(&self) -> &str {
        match self {
            ContractOperation::Register {
                contract_address, ..
            }
            | ContractOperation::Upgrade {
                contract_address, ..
            }
            | ContractOperation::Destroy {
                contract_address, ..
            }
            | ContractOperation::Call {
                contract_address, ..
            }
            | ContractOperation::Transfer {
                contract_address, ..
            } => contract_address,
        }
    }

    pub fn caller(&self) -> &str {
        match self {
            ContractOperation::Register { caller, .. }
            | ContractOperation::Upgrade { caller, .. }
            | ContractOperation::Destroy { caller, .. }
            | ContractOperation::Call { caller, .. }
            | ContractOperation::Transfer { caller, .. } => caller,
        }
    }

    pub fn caller_address(&self) -> &str {
        match self {
            ContractOperation::Register { caller_address, .. }
            | ContractOperation::Upgrade { caller_address, .. }
            | ContractOperation::Destroy { caller_address, .. }
            | ContractOperation::Call { caller_address, .. }
            | ContractOperation::Transfer { caller_address, .. } => caller_address,
        }
    }
}
