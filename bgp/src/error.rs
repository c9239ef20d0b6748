// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::attributes::PathAttributeTypeCode;
use num_enum::{IntoPrimitive, TryFromPrimitive, TryFromPrimitiveError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("too small: {0}")]
    TooSmall(String),

    #[error("too large: {0}")]
    TooLarge(String),

    #[error("message parse error")]
    Parse(nom::Err<(Vec<u8>, nom::error::ErrorKind)>),

    #[error("Path attribute type code error")]
    PathAttributeCode(
        #[from] TryFromPrimitiveError<crate::attributes::PathAttributeTypeCode>,
    ),

    #[error("AS path type error")]
    AsPathType(#[from] TryFromPrimitiveError<crate::attributes::AsPathType>),

    #[error("Path origin error")]
    PathOrigin(#[from] TryFromPrimitiveError<crate::attributes::PathOrigin>),

    #[error("Address family identifier error")]
    Afi(#[from] TryFromPrimitiveError<crate::primitives::Afi>),

    #[error("Subsequent address family identifier error")]
    Safi(#[from] TryFromPrimitiveError<crate::primitives::Safi>),

    #[error("Unsupported address family: AFI={0} SAFI={1}")]
    UnsupportedAddressFamily(u16, u8),

    #[error("Invalid nexthop length {0}")]
    InvalidNexthopLength(usize),

    #[error("Invalid address length {0}")]
    InvalidAddressLength(usize),

    #[error("Invalid address bit length {0}")]
    InvalidAddressBitLength(u8),

    #[error("Invalid prefix length {0}, max is {1}")]
    InvalidPrefixLength(u8, u8),

    #[error("Invalid MPLS label {0}")]
    InvalidLabel(u32),

    #[error("Labeled NLRI length too short for its label stack")]
    InvalidLabeledLength,

    #[error("Invalid route distinguisher")]
    InvalidRouteDistinguisher,

    #[error("Invalid length for {route_type}: {length}")]
    InvalidRouteLength { route_type: String, length: usize },

    #[error("Attribute {type_code} length: expected {expected} found {found}")]
    AttributeLength {
        type_code: u8,
        expected: usize,
        found: usize,
    },

    #[error("Attribute {type_code} has conflicting flags {flags:#04x}")]
    AttributeFlags { type_code: u8, flags: u8 },

    #[error("Malformed attribute {type_code}: {reason}")]
    MalformedAttribute { type_code: u8, reason: String },

    #[error("Missing well-known attribute {0:?}")]
    MissingWellKnownAttribute(PathAttributeTypeCode),

    #[error("Multiprotocol attribute appears more than once")]
    DuplicateMpAttribute,

    #[error("Malformed attribute list: {0}")]
    MalformedAttributeList(String),

    #[error("Unsupported path attribute value for type code {0}")]
    UnsupportedPathAttributeValue(u8),
}

impl Error {
    /// Whether this error must be reported to the session layer, which in
    /// turn sends a NOTIFICATION and closes the session.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(
            self,
            Error::TooLarge(_) | Error::UnsupportedPathAttributeValue(_)
        )
    }

    /// The NOTIFICATION error code and subcode describing this error.
    ///
    /// Ref: RFC 4271 §6.3
    pub fn notification(&self) -> (ErrorCode, UpdateErrorSubcode) {
        let subcode = match self {
            Error::MissingWellKnownAttribute(_) => {
                UpdateErrorSubcode::MissingWellKnownAttribute
            }
            Error::AttributeFlags { .. } => UpdateErrorSubcode::AttributeFlags,
            Error::AttributeLength { .. } => {
                UpdateErrorSubcode::AttributeLength
            }
            Error::PathOrigin(_) => UpdateErrorSubcode::InvalidOriginAttribute,
            Error::AsPathType(_) => UpdateErrorSubcode::MalformedAsPath,
            Error::InvalidNexthopLength(_) => {
                UpdateErrorSubcode::InvalidNexthopAttribute
            }
            Error::InvalidPrefixLength(..)
            | Error::InvalidAddressBitLength(_)
            | Error::InvalidLabeledLength
            | Error::InvalidRouteDistinguisher
            | Error::InvalidRouteLength { .. } => {
                UpdateErrorSubcode::InvalidNetworkField
            }
            Error::MalformedAttribute { type_code, .. } => {
                match PathAttributeTypeCode::try_from(*type_code) {
                    Ok(PathAttributeTypeCode::AsPath) => {
                        UpdateErrorSubcode::MalformedAsPath
                    }
                    Ok(PathAttributeTypeCode::Origin) => {
                        UpdateErrorSubcode::InvalidOriginAttribute
                    }
                    Ok(PathAttributeTypeCode::NextHop) => {
                        UpdateErrorSubcode::InvalidNexthopAttribute
                    }
                    _ => UpdateErrorSubcode::OptionalAttribute,
                }
            }
            _ => UpdateErrorSubcode::MalformedAttributeList,
        };
        (ErrorCode::Update, subcode)
    }
}

impl<'a> From<nom::Err<(&'a [u8], nom::error::ErrorKind)>> for Error {
    fn from(e: nom::Err<(&'a [u8], nom::error::ErrorKind)>) -> Error {
        Error::Parse(e.to_owned())
    }
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum ErrorCode {
    Header = 1,
    Open,
    Update,
    HoldTimerExpired,
    Fsm,
    Cease,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum UpdateErrorSubcode {
    Unspecific = 0,
    MalformedAttributeList,
    UnrecognizedWellKnownAttribute,
    MissingWellKnownAttribute,
    AttributeFlags,
    AttributeLength,
    InvalidOriginAttribute,
    Deprecated,
    InvalidNexthopAttribute,
    OptionalAttribute,
    InvalidNetworkField,
    MalformedAsPath,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn notification_for_missing_attribute() {
        let e = Error::MissingWellKnownAttribute(PathAttributeTypeCode::Origin);
        assert!(e.is_session_fatal());
        assert_eq!(
            e.notification(),
            (ErrorCode::Update, UpdateErrorSubcode::MissingWellKnownAttribute)
        );
        assert_eq!(u8::from(e.notification().1), 3);
    }

    #[test]
    fn nom_errors_convert() {
        let r: Result<(&[u8], u32), nom::Err<(&[u8], nom::error::ErrorKind)>> =
            nom::number::complete::be_u32(&[1u8, 2][..]);
        let e: Error = r.unwrap_err().into();
        assert!(matches!(e, Error::Parse(_)));
        assert_eq!(
            e.notification().1,
            UpdateErrorSubcode::MalformedAttributeList
        );
    }
}
