//! The status condition ledger: a small, ordered list of conditions keyed by
//! condition type, updated via linear scan.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::AppComponentStatus;

/// According to the Kubernetes schema the only allowed values for the status
/// of a condition are `True`, `False` and `Unknown`.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize, strum::Display,
)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize, strum::Display,
)]
pub enum StatusConditionType {
    /// The component has been reconciled successfully.
    Reconciled,
}

#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type")]
    pub type_: StatusConditionType,
    pub status: ConditionStatus,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub last_transition_time: Option<Time>,
}

impl StatusCondition {
    pub fn new(
        type_: StatusConditionType,
        status: ConditionStatus,
        reason: Option<String>,
        message: Option<String>,
        last_transition_time: Option<Time>,
    ) -> Self {
        Self {
            type_,
            status,
            reason,
            message,
            last_transition_time,
        }
    }
}

impl AppComponentStatus {
    /// Returns the condition of the given type. Never mutates the ledger.
    pub fn get_condition(&self, type_: StatusConditionType) -> Option<&StatusCondition> {
        self.conditions
            .iter()
            .find(|condition| condition.type_ == type_)
    }

    /// Updates the existing condition of the same type in place, or appends it
    /// if no such condition exists yet. The order of unrelated condition types
    /// is preserved. The transition time only moves when the status actually
    /// changed.
    pub fn set_condition(&mut self, condition: StatusCondition) {
        match self
            .conditions
            .iter_mut()
            .find(|existing| existing.type_ == condition.type_)
        {
            Some(existing) => {
                let last_transition_time = if existing.status == condition.status {
                    existing.last_transition_time.clone()
                } else {
                    condition.last_transition_time.clone()
                };
                *existing = StatusCondition {
                    last_transition_time,
                    ..condition
                };
            }
            None => self.conditions.push(condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciled(status: ConditionStatus) -> StatusCondition {
        StatusCondition::new(StatusConditionType::Reconciled, status, None, None, None)
    }

    #[test]
    fn get_condition_does_not_grow_the_ledger() {
        let status = AppComponentStatus::default();
        assert!(status.get_condition(StatusConditionType::Reconciled).is_none());
        assert_eq!(status.conditions.len(), 0);
    }

    #[test]
    fn set_condition_updates_in_place() {
        let mut status = AppComponentStatus {
            conditions: vec![reconciled(ConditionStatus::Unknown)],
            ..Default::default()
        };

        status.set_condition(reconciled(ConditionStatus::True));

        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, ConditionStatus::True);
    }

    #[test]
    fn set_condition_appends_when_absent() {
        let mut status = AppComponentStatus::default();
        status.set_condition(reconciled(ConditionStatus::True));
        assert_eq!(status.conditions.len(), 1);
    }

    #[test]
    fn transition_time_is_kept_when_status_is_unchanged() {
        let original_time: Time = serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z"))
            .expect("valid timestamp");
        let mut status = AppComponentStatus {
            conditions: vec![StatusCondition::new(
                StatusConditionType::Reconciled,
                ConditionStatus::True,
                None,
                None,
                Some(original_time.clone()),
            )],
            ..Default::default()
        };

        status.set_condition(StatusCondition::new(
            StatusConditionType::Reconciled,
            ConditionStatus::True,
            Some("Updated".to_owned()),
            None,
            None,
        ));

        assert_eq!(
            status.conditions[0].last_transition_time,
            Some(original_time)
        );
        assert_eq!(status.conditions[0].reason.as_deref(), Some("Updated"));
    }
}
