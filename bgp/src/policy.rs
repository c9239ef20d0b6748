// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import and export policy keyed on the BGP roles of the peers a route
//! travels between.

use crate::attributes::{
    AsPath, AsPathSegment, Attributes, PathAttributeTypeCode,
    PathAttributeValue,
};
use crate::communities::Community;
use crate::log::policy_log;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::fmt;
use std::net::Ipv4Addr;

/// LOCAL_PREF given to routes sent to internal peers when none is set.
pub const DEFAULT_LOCAL_PREF: u32 = 100;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum PeerRole {
    External,
    Internal,
    RouteReflectorClient,
    InternalConfederation,
}

impl PeerRole {
    pub fn is_external(&self) -> bool {
        matches!(self, PeerRole::External)
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRole::External => write!(f, "external"),
            PeerRole::Internal => write!(f, "internal"),
            PeerRole::RouteReflectorClient => write!(f, "rr-client"),
            PeerRole::InternalConfederation => write!(f, "confederation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyConfig {
    pub local_asn: u32,
    pub local_id: Ipv4Addr,

    /// Cluster identifier used when reflecting. Defaults to `local_id`.
    #[serde(default)]
    pub cluster_id: Option<Ipv4Addr>,

    /// Keep MULTI_EXIT_DISC on routes sent to external peers.
    #[serde(default)]
    pub retain_med_to_external: bool,

    /// Force LOCAL_PREF to zero on routes tagged GRACEFUL_SHUTDOWN.
    #[serde(default = "default_true")]
    pub honor_graceful_shutdown: bool,
}

fn default_true() -> bool {
    true
}

impl PolicyConfig {
    pub fn new(local_asn: u32, local_id: Ipv4Addr) -> Self {
        Self {
            local_asn,
            local_id,
            cluster_id: None,
            retain_med_to_external: false,
            honor_graceful_shutdown: true,
        }
    }
}

/// Stateless policy functions parameterized by local configuration.
#[derive(Clone)]
pub struct Policy {
    pub config: PolicyConfig,
    pub log: Logger,
}

impl Policy {
    pub fn new(config: PolicyConfig, log: Logger) -> Self {
        Self { config, log }
    }

    pub fn cluster_id(&self) -> Ipv4Addr {
        self.config.cluster_id.unwrap_or(self.config.local_id)
    }

    /// Filter and adjust a route received from a peer with the given role.
    /// Returns `None` when the route must not enter the table.
    pub fn apply_import(
        &self,
        from: PeerRole,
        attrs: &Attributes,
    ) -> Option<Attributes> {
        if attrs.originator_id() == Some(self.config.local_id) {
            policy_log!(self, debug, "rejecting route originated locally";
                "peer_role" => from.to_string()
            );
            return None;
        }

        let cluster_id = self.cluster_id();
        if attrs.cluster_list().contains(&cluster_id) {
            policy_log!(self, debug,
                "rejecting route with cluster {} in cluster list", cluster_id;
                "peer_role" => from.to_string()
            );
            return None;
        }

        let mut attrs = attrs.clone();
        if from.is_external() {
            if attrs
                .as_path()
                .is_some_and(|p| p.contains(self.config.local_asn))
            {
                policy_log!(self, debug, "rejecting route with local AS in path";
                    "peer_role" => from.to_string()
                );
                return None;
            }
            attrs = attrs.without(PathAttributeTypeCode::LocalPref);
        }

        if self.config.honor_graceful_shutdown
            && attrs.has_community(Community::GracefulShutdown)
        {
            attrs = attrs.with_value(PathAttributeValue::LocalPref(0));
        }

        Some(attrs)
    }

    /// Compute what a selected route becomes when sent from a peer with role
    /// `from` to a peer with role `to`. `source_id` is the BGP identifier of
    /// the peer the route was learned from. Returns `None` when the route
    /// must not be advertised.
    pub fn apply_export(
        &self,
        from: PeerRole,
        to: PeerRole,
        source_id: Ipv4Addr,
        attrs: &Attributes,
    ) -> Option<Attributes> {
        use PeerRole::*;

        if attrs.has_community(Community::NoAdvertise) {
            return None;
        }
        if to == External
            && (attrs.has_community(Community::NoExport)
                || attrs.has_community(Community::NoExportSubConfed))
        {
            return None;
        }
        if to == InternalConfederation
            && attrs.has_community(Community::NoExportSubConfed)
        {
            return None;
        }

        let out = match (from, to) {
            (_, External) => self.export_external(attrs),
            (External, _) => {
                self.export_internal(&strip_non_transitive(attrs, true))
            }
            (Internal, Internal) => {
                policy_log!(self, trace, "suppressing internal to internal";
                    "source" => source_id.to_string()
                );
                return None;
            }
            (Internal, InternalConfederation) => self.export_internal(attrs),
            (Internal, RouteReflectorClient)
            | (RouteReflectorClient, Internal)
            | (RouteReflectorClient, RouteReflectorClient)
            | (RouteReflectorClient, InternalConfederation) => {
                self.reflect(&self.export_internal(attrs), source_id)
            }
            (InternalConfederation, _) => self.export_internal(attrs),
        };
        Some(out)
    }

    /// Add ORIGINATOR_ID and CLUSTER_LIST entries for route reflection. Both
    /// are left alone when already present.
    fn reflect(&self, attrs: &Attributes, source_id: Ipv4Addr) -> Attributes {
        let mut out = attrs.clone();
        if out.originator_id().is_none() {
            out = out.with_value(PathAttributeValue::OriginatorId(source_id));
        }
        let cluster_id = self.cluster_id();
        let list = out.cluster_list();
        if !list.contains(&cluster_id) {
            let mut updated = Vec::with_capacity(list.len() + 1);
            updated.push(cluster_id);
            updated.extend_from_slice(list);
            out = out.with_value(PathAttributeValue::ClusterList(updated));
        }
        out
    }

    fn export_internal(&self, attrs: &Attributes) -> Attributes {
        if attrs.local_pref().is_some() {
            return attrs.clone();
        }
        attrs.with_value(PathAttributeValue::LocalPref(DEFAULT_LOCAL_PREF))
    }

    fn export_external(&self, attrs: &Attributes) -> Attributes {
        let mut out =
            strip_non_transitive(attrs, self.config.retain_med_to_external)
                .without(PathAttributeTypeCode::LocalPref);

        let ext = out.extended_communities();
        if ext.iter().any(|c| !c.is_transitive()) {
            let kept: Vec<_> =
                ext.iter().filter(|c| c.is_transitive()).copied().collect();
            out = if kept.is_empty() {
                out.without(PathAttributeTypeCode::ExtendedCommunities)
            } else {
                out.with_value(PathAttributeValue::ExtendedCommunities(kept))
            };
        }

        let path = match out.as_path() {
            Some(path) => path.without_confed().prepend(self.config.local_asn),
            None => AsPath(vec![AsPathSegment::sequence(vec![
                self.config.local_asn,
            ])]),
        };
        out.with_value(PathAttributeValue::AsPath(path))
    }
}

/// Drop optional non-transitive attributes, which never cross an AS
/// boundary. MED is dropped too unless `keep_med` is set.
fn strip_non_transitive(attrs: &Attributes, keep_med: bool) -> Attributes {
    let med = u8::from(PathAttributeTypeCode::MultiExitDisc);
    attrs.retain(|a| {
        !a.is_optional()
            || a.is_transitive()
            || (keep_med && a.type_code() == med)
    })
}
