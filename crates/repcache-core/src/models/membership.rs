use serde::{Deserialize, Serialize};

use super::{ClientProfile, Plan};

/// A client's subscription record.
///
/// The backend encodes `active` as a 0/1 integer flag. An inactive
/// membership is an authorization-style terminal condition: the portal
/// must drop all locally held data for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Membership {
    pub name: String,
    pub active: u8,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub coach: Option<String>,
    pub package: Option<String>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.active != 0
    }
}

/// Full payload of a membership fetch: everything the portal shows,
/// plus the server-issued version token used for change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipBundle {
    pub client: ClientProfile,
    pub membership: Membership,
    #[serde(default)]
    pub plans: Vec<Plan>,
    /// Lookup data the views render against (exercise library, labels).
    /// Treated as opaque by this crate.
    #[serde(default)]
    pub references: serde_json::Value,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_flag() {
        let json = r#"{"name":"MEM-001","active":1}"#;
        let membership: Membership = serde_json::from_str(json).expect("parse membership");
        assert!(membership.is_active());

        let json = r#"{"name":"MEM-001","active":0,"end_date":"2026-01-31"}"#;
        let membership: Membership = serde_json::from_str(json).expect("parse membership");
        assert!(!membership.is_active());
    }

    #[test]
    fn test_parse_bundle_defaults() {
        let json = r#"{
            "client": {"name": "CL-0042"},
            "membership": {"name": "MEM-001", "active": 1},
            "version": "v7"
        }"#;
        let bundle: MembershipBundle = serde_json::from_str(json).expect("parse bundle");
        assert!(bundle.plans.is_empty());
        assert!(bundle.references.is_null());
        assert_eq!(bundle.version, "v7");
    }
}
