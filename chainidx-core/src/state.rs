use serde::{Deserialize, Serialize};

use crate::consensus::ChangeId;

/// The identifier of the last consensus change successfully applied.
///
/// Absent until the first change is processed; a fresh daemon reads this at
/// startup to know where to resume its subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorerState {
    pub current_change_id: Option<ChangeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_has_no_change_id() {
        let state: ExplorerState = serde_json::from_str("{}").unwrap();
        assert!(state.current_change_id.is_none());
    }
}
