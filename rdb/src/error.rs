// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::types::PeerId;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    #[error("peer {0} already exists")]
    PeerExists(PeerId),

    #[error("codec error {0}")]
    Codec(#[from] bgp::error::Error),

    #[error("config error {0}")]
    Config(String),

    #[error("serialization error {0}")]
    Serialization(#[from] serde_json::Error),
}
