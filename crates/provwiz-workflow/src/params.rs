//! Subnet parameters and the synthetic form bundles the wizard handlers expect.

use provwiz_error::{SetupError, SetupResult};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Display name given to the provisioning subnet.
pub const SUBNET_DISPLAY_NAME: &str = "Provisioning network";
/// Installation medium the host group is pointed at.
pub const INSTALL_MEDIUM_NAME: &str = "CentOS mirror";
pub const IPAM_MODE: &str = "DHCP";
pub const BOOT_MODE: &str = "DHCP";
pub const MEDIUM_TYPE: &str = "path";

/// Form namespace of every wizard submission.
pub const FORM_ROOT: &str = "foreman_setup_provisioner";

/// DHCP allocation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhcpRange {
    pub from: Ipv4Addr,
    pub to: Ipv4Addr,
}

impl FromStr for DhcpRange {
    type Err = SetupError;

    /// Accepts `FROM-TO` with any separator that is neither a dot nor a digit.
    fn from_str(s: &str) -> SetupResult<Self> {
        let invalid = || SetupError::InvalidDhcpRange(s.to_string());
        let parts: Vec<&str> = s
            .split(|c: char| c != '.' && !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .collect();
        let [from, to] = parts.as_slice() else {
            return Err(invalid());
        };
        Ok(Self {
            from: from.parse().map_err(|_| invalid())?,
            to: to.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for DhcpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetParameters {
    pub interface_name: String,
    pub domain_name: String,
    pub network: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns_primary: Ipv4Addr,
    pub dns_secondary: Option<Ipv4Addr>,
    pub dhcp_range: DhcpRange,
}

/// Field-by-field construction of [`SubnetParameters`], one setter per CLI flag.
#[derive(Debug, Clone, Default)]
pub struct SubnetParametersBuilder {
    pub interface_name: Option<String>,
    pub domain_name: Option<String>,
    pub network: Option<Ipv4Addr>,
    pub mask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub dns_primary: Option<Ipv4Addr>,
    pub dns_secondary: Option<Ipv4Addr>,
    pub dhcp_range: Option<DhcpRange>,
}

fn required<T>(value: Option<T>, flag: &'static str) -> SetupResult<T> {
    value.ok_or(SetupError::MissingParameter(flag))
}

impl SubnetParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> SetupResult<SubnetParameters> {
        let interface_name = required(self.interface_name, "interface-name")?;
        let domain_name = required(self.domain_name, "domain-name")?;
        if interface_name.trim().is_empty() {
            return Err(SetupError::MissingParameter("interface-name"));
        }
        if domain_name.trim().is_empty() {
            return Err(SetupError::MissingParameter("domain-name"));
        }
        Ok(SubnetParameters {
            interface_name,
            domain_name,
            network: required(self.network, "network-address")?,
            mask: required(self.mask, "netmask")?,
            gateway: required(self.gateway, "gateway")?,
            dns_primary: required(self.dns_primary, "dns-primary")?,
            dns_secondary: self.dns_secondary,
            dhcp_range: required(self.dhcp_range, "dhcp-range")?,
        })
    }
}

/// Field names match the HTML form fields of wizard step 2.
#[derive(Debug, Serialize)]
struct SubnetAttributes<'a> {
    network: Ipv4Addr,
    mask: Ipv4Addr,
    gateway: Ipv4Addr,
    dns_primary: Ipv4Addr,
    #[serde(skip_serializing_if = "Option::is_none")]
    dns_secondary: Option<Ipv4Addr>,
    from: Ipv4Addr,
    to: Ipv4Addr,
    name: &'a str,
    ipam: &'static str,
    boot_mode: &'static str,
}

impl SubnetParameters {
    /// Subnet sub-form. Interface and domain are not subnet attributes.
    pub fn subnet_attributes(&self, display_name: &str) -> Value {
        let attrs = SubnetAttributes {
            network: self.network,
            mask: self.mask,
            gateway: self.gateway,
            dns_primary: self.dns_primary,
            dns_secondary: self.dns_secondary,
            from: self.dhcp_range.from,
            to: self.dhcp_range.to,
            name: display_name,
            ipam: IPAM_MODE,
            boot_mode: BOOT_MODE,
        };
        // Only addresses and strings: serialization cannot fail.
        serde_json::to_value(attrs).unwrap_or(Value::Null)
    }

    /// Parameters for the step-2 update handler.
    pub fn step2_bundle(&self, display_name: &str) -> Value {
        json!({
            FORM_ROOT: {
                "subnet_attributes": self.subnet_attributes(display_name),
                "domain_name": self.domain_name,
            }
        })
    }
}

/// Parameters for the step-4 update handler.
pub fn step4_update_bundle(hostgroup_id: u64, medium_id: u64) -> Value {
    json!({
        FORM_ROOT: {
            "hostgroup_attributes": {
                "id": hostgroup_id,
                "medium_id": medium_id,
            },
            "activation_key": { "value": "" },
            "satellite_type": { "value": "" },
        },
        "medium_type": MEDIUM_TYPE,
    })
}
