use crate::types::TaskKind;
use serde::Deserialize;

const DEFAULT_CALL_BUDGET: u64 = 10_000_000;
const DEFAULT_REGISTER_BUDGET: u64 = 10_000_000;
const DEFAULT_UPGRADE_BUDGET: u64 = 5_000_000;
const DEFAULT_DESTROY_BUDGET: u64 = 5_000_000;
const DEFAULT_TRANSFER_BUDGET: u64 = 1_000_000;

/// Per-operation instruction budgets. Handlers never hardcode a limit;
/// every scope is sized from here.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub call_budget: u64,
    pub register_budget: u64,
    pub upgrade_budget: u64,
    pub destroy_budget: u64,
    pub transfer_budget: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            call_budget: DEFAULT_CALL_BUDGET,
            register_budget: DEFAULT_REGISTER_BUDGET,
            upgrade_budget: DEFAULT_UPGRADE_BUDGET,
            destroy_budget: DEFAULT_DESTROY_BUDGET,
            transfer_budget: DEFAULT_TRANSFER_BUDGET,
        }
    }
}

impl ExecutionConfig {
    pub fn budget_for(&self, kind: TaskKind) -> u64 {
        match kind {
            TaskKind::Call => self.call_budget,
            TaskKind::Register => self.register_budget,
            TaskKind::Upgrade => self.upgrade_budget,
            TaskKind::Destroy => self.destroy_budget,
            TaskKind::Transfer => self.transfer_budget,
            // Compile tasks never open an execution scope.
            TaskKind::Compile => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_nonzero_for_contract_operations() {
        let config = ExecutionConfig::default();
        for kind in [
            TaskKind::Register,
            TaskKind::Call,
            TaskKind::Upgrade,
            TaskKind::Destroy,
            TaskKind::Transfer,
        ] {
            assert!(config.budget_for(kind) > 0);
        }
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: ExecutionConfig = serde_json::from_str(r#"{"call_budget": 123}"#).unwrap();
        assert_eq!(config.call_budget, 123);
        assert_eq!(config.transfer_budget, DEFAULT_TRANSFER_BUDGET);
    }
}
