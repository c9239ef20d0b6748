// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The routing database (rdb).
//!
//! Routes received from peers are held per address family in the
//! [`AdjRibIn`]. Every change to a destination runs the decision process and
//! reconciles the result against what each subscribed peer was last sent,
//! producing per peer advertise and withdraw batches for the transport
//! layer.

pub mod adj_rib_in;
pub mod bestpath;
pub mod config;
pub mod db;
pub mod environment;
pub mod error;
pub mod log;
pub mod reconcile;
pub mod types;

pub use adj_rib_in::AdjRibIn;
pub use db::Db;
pub use types::*;

#[cfg(test)]
mod proptest;

pub const COMPONENT_RDB: &str = "rdb";
pub const MOD_DB: &str = "database";
pub const MOD_RIB: &str = "adj_rib_in";

/// Test utilities shared by rdb tests.
pub mod test;
