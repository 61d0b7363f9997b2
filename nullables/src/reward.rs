//! Nullable reward hook — records execution receipts.

use agora_governance::{ExecutionReceipt, GovernanceError, RewardHook};

/// A reward hook that remembers every receipt it was handed.
///
/// Set `fail_with` to make the next calls fail with that message.
#[derive(Debug, Default)]
pub struct NullRewardHook {
    receipts: Vec<ExecutionReceipt>,
    fail_with: Option<String>,
}

impl NullRewardHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            receipts: Vec::new(),
            fail_with: Some(message.into()),
        }
    }

    pub fn receipts(&self) -> &[ExecutionReceipt] {
        &self.receipts
    }
}

impl RewardHook for NullRewardHook {
    fn on_executed(&mut self, receipt: &ExecutionReceipt) -> Result<(), GovernanceError> {
        if let Some(message) = &self.fail_with {
            return Err(GovernanceError::RewardHook(message.clone()));
        }
        self.receipts.push(receipt.clone());
        Ok(())
    }
}
