// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Information the routing database needs from the rest of the router.

use crate::types::PeerId;
use bgp::primitives::{AddressFamily, BgpNexthop};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Capabilities negotiated with a peer for one address family.
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
pub struct Capabilities {
    /// The peer accepts multiple paths per destination.
    pub add_path: bool,

    /// The peer sends path identifiers with its NLRI.
    pub multi_path: bool,
}

/// Collaborators queried by the decision process and reconciliation. Calls
/// must be fast and must not block.
pub trait Environment: Send + Sync {
    fn is_next_hop_reachable(&self, nexthop: &BgpNexthop) -> bool;

    fn igp_metric(&self, nexthop: &BgpNexthop) -> u32;

    fn local_bgp_identifier(&self) -> Ipv4Addr;

    fn local_cluster_id(&self) -> Ipv4Addr {
        self.local_bgp_identifier()
    }

    fn negotiated_capabilities(
        &self,
        peer: &PeerId,
        family: AddressFamily,
    ) -> Capabilities;
}
