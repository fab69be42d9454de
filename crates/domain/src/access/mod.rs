//! Fixed role → capability table (C15), checked at handler entry and
//! reaffirmed inside state-machine and ombudsperson-view operations.

use hinschg_core::Error;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageTenants,
    ManageUsers,
    ViewAllCases,
    ViewAssignedCases,
    ViewAudit,
    ExportData,
    ManageCases,
    AssignCases,
    ViewSubmissions,
    CreateSubmission,
    ViewOwnSubmissions,
    AddFollowUp,
    AddNotes,
    UploadAttachments,
    SendNotifications,
}

/// Spec.md §4.7's fixed table, built once and never mutated at runtime.
static ROLE_CAPABILITIES: Lazy<HashMap<Role, HashSet<Capability>>> = Lazy::new(|| {
    use Capability::*;
    let mut table = HashMap::new();

    table.insert(
        Role::Admin,
        HashSet::from([
            ManageTenants,
            ManageUsers,
            ViewAllCases,
            ViewAudit,
            ExportData,
            ManageCases,
            ViewSubmissions,
        ]),
    );

    table.insert(
        Role::Ombudsperson,
        HashSet::from([
            ViewSubmissions,
            ManageCases,
            AssignCases,
            ViewAudit,
            ExportData,
            ViewAllCases,
            SendNotifications,
        ]),
    );

    table.insert(
        Role::Fallbearbeiter,
        HashSet::from([ViewAssignedCases, ManageCases, AddNotes, UploadAttachments]),
    );

    table.insert(
        Role::Melder,
        HashSet::from([CreateSubmission, ViewOwnSubmissions, AddFollowUp]),
    );

    table.insert(
        Role::Auditor,
        HashSet::from([ViewAllCases, ViewAudit, ViewSubmissions, ExportData]),
    );

    table
});

pub fn capabilities_for(role: Role) -> &'static HashSet<Capability> {
    ROLE_CAPABILITIES
        .get(&role)
        .expect("every Role variant has a table entry")
}

pub fn has_capability(role: Role, capability: Capability) -> bool {
    capabilities_for(role).contains(&capability)
}

/// Reaffirms a capability check at a non-handler call site (state machine,
/// ombudsperson view). Returns `Forbidden` rather than `PermissionDenied`
/// since this check always names a specific resource boundary.
pub fn require_capability(role: Role, capability: Capability) -> hinschg_core::Result<()> {
    if has_capability(role, capability) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "role {role:?} lacks capability {capability:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_manage_tenants_but_fallbearbeiter_cannot() {
        assert!(has_capability(Role::Admin, Capability::ManageTenants));
        assert!(!has_capability(Role::Fallbearbeiter, Capability::ManageTenants));
    }

    #[test]
    fn melder_cannot_view_all_cases() {
        assert!(!has_capability(Role::Melder, Capability::ViewAllCases));
    }

    #[test]
    fn ombudsperson_can_assign_and_send_notifications() {
        assert!(has_capability(Role::Ombudsperson, Capability::AssignCases));
        assert!(has_capability(Role::Ombudsperson, Capability::SendNotifications));
    }

    #[test]
    fn require_capability_returns_forbidden_on_denial() {
        let err = require_capability(Role::Melder, Capability::ManageCases).unwrap_err();
        assert_eq!(err.code, hinschg_core::ErrorCode::PermissionDenied);
    }

    #[test]
    fn every_role_has_a_table_entry() {
        for role in [
            Role::Admin,
            Role::Ombudsperson,
            Role::Fallbearbeiter,
            Role::Melder,
            Role::Auditor,
        ] {
            assert!(!capabilities_for(role).is_empty());
        }
    }
}
