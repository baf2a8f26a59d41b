//! Minimal projections of the backend records the wizard touches.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartProxy {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medium {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hostgroup {
    pub id: u64,
    pub name: String,
}

/// Attributes for a provisioner that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProvisioner {
    pub host_id: u64,
    pub smart_proxy_id: u64,
    pub provision_interface: String,
}

/// A persisted provisioner record.
///
/// `wizard_step` only lives on the in-memory copy: step handlers bump it the
/// way the web controller keeps per-request state, and it never round-trips
/// through the backend. A reload therefore always yields `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provisioner {
    pub id: u64,
    pub host_id: u64,
    pub smart_proxy_id: u64,
    pub provision_interface: String,
    #[serde(default)]
    pub hostgroup_id: Option<u64>,
    #[serde(default)]
    pub subnet_id: Option<u64>,
    #[serde(default)]
    pub domain_id: Option<u64>,
    #[serde(skip)]
    pub wizard_step: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioner_decodes_without_optional_fields() {
        let raw = r#"{"id":7,"host_id":1,"smart_proxy_id":2,"provision_interface":"eth0"}"#;
        let p: Provisioner = serde_json::from_str(raw).unwrap();
        assert_eq!(p.id, 7);
        assert_eq!(p.hostgroup_id, None);
        assert_eq!(p.wizard_step, None);
    }

    #[test]
    fn wizard_step_is_never_serialized() {
        let p = Provisioner {
            id: 1,
            host_id: 1,
            smart_proxy_id: 1,
            provision_interface: "eth0".to_string(),
            hostgroup_id: Some(3),
            subnet_id: None,
            domain_id: None,
            wizard_step: Some(4),
        };
        let value = serde_json::to_value(&p).unwrap();
        assert!(value.get("wizard_step").is_none());
        assert_eq!(value["hostgroup_id"], 3);
    }
}
