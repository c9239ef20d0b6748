// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire codec and routing policy for BGP UPDATE processing.
//!
//! The codec is split along the lines of the message: [`prefix`] and
//! [`primitives`] carry fixed width elements, [`attributes`] and
//! [`registry`] handle the path attribute TLVs, [`nlri`] (with [`evpn`] and
//! [`mvpn`]) handles per address family reachability, and [`update`] ties
//! them together into an UPDATE body with RFC 7606 error handling.

pub mod attributes;
pub mod communities;
pub mod error;
pub mod evpn;
pub mod log;
pub mod mvpn;
pub mod nlri;
pub mod policy;
pub mod prefix;
pub mod primitives;
pub mod registry;
pub mod update;

#[cfg(test)]
mod proptest;

pub const COMPONENT_BGP: &str = "bgp";
pub const MOD_CODEC: &str = "codec";
pub const MOD_POLICY: &str = "policy";
