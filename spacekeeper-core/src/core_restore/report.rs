/*
    report.rs - Typed restoration results

    Every item a restore touches lands in the report as
    Created | Skipped(reason) | Failed(error), so the outcome of a run is
    inspectable as data. The aggregate counts the host renders are
    derived from the item lists, never tracked separately.
*/

use serde::Serialize;
use std::fmt;

/// Why an item was skipped rather than created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The remote API rejected the mutation for lack of permission
    PermissionDenied,
    /// The mutation target does not exist remotely
    NotFound,
    /// No delegation grant on any lookup path
    NoGrant,
    /// Grants exist but all are expired or expiring within the margin
    GrantExpired,
    /// A role-targeted overwrite whose role was not created this run
    UnmappedRole,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::PermissionDenied => "permission denied",
            SkipReason::NotFound => "not found",
            SkipReason::NoGrant => "no grant",
            SkipReason::GrantExpired => "grant expired",
            SkipReason::UnmappedRole => "unmapped role",
        };
        write!(f, "{}", label)
    }
}

/// Outcome of one destination mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Created,
    Skipped(SkipReason),
    Failed(String),
}

impl ItemOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, ItemOutcome::Created)
    }
}

/// One restored (or not) item, identified by its source-space identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    /// Source-space id (role/channel) or member id
    pub id: String,
    pub name: String,
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn new(id: &str, name: &str, outcome: ItemOutcome) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            outcome,
        }
    }
}

/// Best-effort report of one restoration run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    pub roles: Vec<ItemReport>,
    pub channels: Vec<ItemReport>,
    pub overwrites: Vec<ItemReport>,
    pub members: Vec<ItemReport>,
}

impl RestoreReport {
    pub fn roles_created(&self) -> usize {
        self.roles.iter().filter(|i| i.outcome.is_created()).count()
    }

    pub fn channels_created(&self) -> usize {
        self.channels
            .iter()
            .filter(|i| i.outcome.is_created())
            .count()
    }

    pub fn overwrites_created(&self) -> usize {
        self.overwrites
            .iter()
            .filter(|i| i.outcome.is_created())
            .count()
    }

    /// Members whose admission call was actually issued; members with no
    /// usable grant never reach the remote API and do not count
    pub fn members_attempted(&self) -> usize {
        self.members
            .iter()
            .filter(|i| {
                !matches!(
                    i.outcome,
                    ItemOutcome::Skipped(SkipReason::NoGrant)
                        | ItemOutcome::Skipped(SkipReason::GrantExpired)
                )
            })
            .count()
    }

    pub fn members_added(&self) -> usize {
        self.members
            .iter()
            .filter(|i| i.outcome.is_created())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
            && self.channels.is_empty()
            && self.overwrites.is_empty()
            && self.members.is_empty()
    }
}

/// Result of a restoration request for one destination space
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreOutcome {
    /// False only when the owner had no snapshot to restore from
    pub restored: bool,
    pub report: RestoreReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_derive_from_items() {
        let mut report = RestoreReport::default();
        report.roles.push(ItemReport::new("r1", "mod", ItemOutcome::Created));
        report.roles.push(ItemReport::new(
            "r2",
            "admin",
            ItemOutcome::Skipped(SkipReason::PermissionDenied),
        ));
        report
            .channels
            .push(ItemReport::new("c1", "info", ItemOutcome::Created));
        report.members.push(ItemReport::new("m1", "ana", ItemOutcome::Created));
        report.members.push(ItemReport::new(
            "m2",
            "bo",
            ItemOutcome::Skipped(SkipReason::NoGrant),
        ));
        report.members.push(ItemReport::new(
            "m3",
            "cy",
            ItemOutcome::Skipped(SkipReason::PermissionDenied),
        ));

        assert_eq!(report.roles_created(), 1);
        assert_eq!(report.channels_created(), 1);
        assert_eq!(report.members_added(), 1);
        // m1 and m3 were attempted; m2 never reached the API
        assert_eq!(report.members_attempted(), 2);
    }

    #[test]
    fn test_expired_grant_counts_as_not_attempted() {
        let mut report = RestoreReport::default();
        report.members.push(ItemReport::new(
            "m1",
            "ana",
            ItemOutcome::Skipped(SkipReason::GrantExpired),
        ));
        assert_eq!(report.members_attempted(), 0);
    }

    #[test]
    fn test_default_outcome_is_zero_valued() {
        let outcome = RestoreOutcome::default();
        assert!(!outcome.restored);
        assert!(outcome.report.is_empty());
        assert_eq!(outcome.report.roles_created(), 0);
        assert_eq!(outcome.report.members_attempted(), 0);
    }

    #[test]
    fn test_report_serializes_for_host_rendering() {
        let mut report = RestoreReport::default();
        report.roles.push(ItemReport::new(
            "r1",
            "mod",
            ItemOutcome::Failed("transport error: timeout".to_string()),
        ));
        let doc = serde_json::to_value(&report).unwrap();
        assert_eq!(doc["roles"][0]["outcome"]["failed"], "transport error: timeout");
    }
}
