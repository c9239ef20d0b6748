// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use bgp::policy::PolicyConfig;
use bgp::primitives::{AddressFamily, Afi, Safi};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a path without MULTI_EXIT_DISC compares against paths that have one.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MissingMed {
    /// Missing MED is treated as 0, the most preferred value.
    #[default]
    Zero,

    /// Missing MED is treated as the largest possible value.
    Worst,
}

impl MissingMed {
    pub fn value(&self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::Worst => u32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionConfig {
    /// LOCAL_PREF assumed for paths that do not carry one.
    #[serde(default = "default_local_pref")]
    pub default_local_pref: u32,

    /// Compare MED between paths from different neighboring ASes.
    #[serde(default)]
    pub always_compare_med: bool,

    #[serde(default)]
    pub missing_med: MissingMed,

    /// Prefer paths learned from external peers over internal ones.
    #[serde(default = "default_true")]
    pub ebgp_over_ibgp: bool,

    /// Only select paths tagged LLGR_STALE when nothing else is available.
    #[serde(default = "default_true")]
    pub depreference_llgr_stale: bool,
}

fn default_local_pref() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            default_local_pref: default_local_pref(),
            always_compare_med: false,
            missing_med: MissingMed::Zero,
            ebgp_over_ibgp: true,
            depreference_llgr_stale: true,
        }
    }
}

/// How many paths per destination are selected for a table.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AddPathMode {
    /// A single best path.
    #[default]
    Disabled,

    /// Every usable path, in preference order.
    All,

    /// The `n` most preferred paths.
    Best(usize),
}

impl AddPathMode {
    /// The maximum number of paths selected under this mode.
    pub fn limit(&self) -> usize {
        match self {
            Self::Disabled => 1,
            Self::All => usize::MAX,
            Self::Best(n) => *n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AddPathTable {
    pub afi: Afi,
    pub safi: Safi,
    pub mode: AddPathMode,
}

impl AddPathTable {
    pub fn family(&self) -> AddressFamily {
        AddressFamily::new(self.afi, self.safi)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RibConfig {
    #[serde(default)]
    pub decision: DecisionConfig,

    pub policy: PolicyConfig,

    #[serde(default)]
    pub add_path: Vec<AddPathTable>,
}

impl RibConfig {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            decision: DecisionConfig::default(),
            policy,
            add_path: Vec::new(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self, Error> {
        let config: RibConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for t in &self.add_path {
            if !t.family().is_supported() {
                return Err(Error::Config(format!(
                    "add-path configured for unsupported family {}",
                    t.family()
                )));
            }
            if t.mode == AddPathMode::Best(0) {
                return Err(Error::Config(format!(
                    "add-path best must select at least one path for {}",
                    t.family()
                )));
            }
        }
        Ok(())
    }

    pub fn add_path_mode(&self, family: AddressFamily) -> AddPathMode {
        self.add_path
            .iter()
            .rev()
            .find(|t| t.family() == family)
            .map(|t| t.mode)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    #[test]
    fn rib_config_from_json() {
        let config = RibConfig::from_json(
            r#"{
                "decision": {
                    "always_compare_med": true,
                    "missing_med": "worst"
                },
                "policy": {
                    "local_asn": 65000,
                    "local_id": "10.0.0.1",
                    "cluster_id": "10.0.0.100"
                },
                "add_path": [
                    { "afi": "Ipv4", "safi": "Unicast", "mode": "all" },
                    { "afi": "Ipv6", "safi": "Unicast", "mode": { "best": 2 } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.decision.default_local_pref, 100);
        assert!(config.decision.always_compare_med);
        assert_eq!(config.decision.missing_med, MissingMed::Worst);
        assert!(config.decision.ebgp_over_ibgp);
        assert_eq!(config.policy.cluster_id, Some(Ipv4Addr::new(10, 0, 0, 100)));
        assert!(config.policy.honor_graceful_shutdown);
        assert_eq!(
            config.add_path_mode(AddressFamily::IPV4_UNICAST),
            AddPathMode::All
        );
        assert_eq!(
            config.add_path_mode(AddressFamily::IPV6_UNICAST),
            AddPathMode::Best(2)
        );
        assert_eq!(
            config.add_path_mode(AddressFamily::L2VPN_EVPN),
            AddPathMode::Disabled
        );
    }

    #[test]
    fn rib_config_rejects_best_zero() {
        let r = RibConfig::from_json(
            r#"{
                "policy": { "local_asn": 65000, "local_id": "10.0.0.1" },
                "add_path": [
                    { "afi": "Ipv4", "safi": "Unicast", "mode": { "best": 0 } }
                ]
            }"#,
        );
        assert!(matches!(r, Err(Error::Config(_))));

        let r = RibConfig::from_json(r#"{ "policy": {} }"#);
        assert!(matches!(r, Err(Error::Serialization(_))));
    }
}
