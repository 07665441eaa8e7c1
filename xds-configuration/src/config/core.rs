// SPDX-FileCopyrightText: © 2025 Huawei Cloud Computing Technologies Co., Ltd
// SPDX-License-Identifier: Apache-2.0
//
// Copyright 2025 Huawei Cloud Computing Technologies Co., Ltd
//
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
//

use base64::engine::general_purpose::STANDARD;
use base64_serde::base64_serde_type;
use compact_str::CompactString;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, net::IpAddr};

base64_serde_type!(Base64Standard, STANDARD);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Path(CompactString),
    InlineBytes(#[serde(with = "Base64Standard")] Vec<u8>),
    InlineString(CompactString),
    EnvironmentVariable(CompactString),
}

#[derive(thiserror::Error, Debug)]
pub enum DataSourceReadError {
    #[error("failed to read file \"{0}\"")]
    IoError(CompactString, #[source] std::io::Error),
    #[error("failed to read environment variable \"{0}\"")]
    EnvError(CompactString, #[source] std::env::VarError),
}

impl DataSource {
    pub fn to_bytes_blocking(&self) -> Result<Vec<u8>, DataSourceReadError> {
        match self {
            Self::InlineString(b) => Ok(b.as_bytes().to_owned()),
            Self::InlineBytes(b) => Ok(b.clone()),
            Self::Path(path) => std::fs::read(path).map_err(|e| DataSourceReadError::IoError(path.clone(), e)),
            Self::EnvironmentVariable(key) => {
                std::env::var(key).map(String::into_bytes).map_err(|e| DataSourceReadError::EnvError(key.clone(), e))
            },
        }
    }
}

/// A nested message that is not interpreted here, kept in its encoded form so
/// that it still takes part in equality and hashing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct EncodedMessage(#[serde(with = "Base64Standard")] pub Vec<u8>);

/// An address prefix as it appears on the wire. The prefix is kept as text so
/// that two ranges compare equal exactly when their configuration does.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CidrRange {
    pub address_prefix: CompactString,
    pub prefix_len: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum CidrRangeError {
    #[error("\"{0}\" is not an ip address")]
    InvalidAddress(CompactString, #[source] std::net::AddrParseError),
    #[error("prefix length {prefix_len} is too long for {address_prefix}")]
    InvalidPrefixLength { address_prefix: CompactString, prefix_len: u32 },
}

impl CidrRange {
    pub fn new(address_prefix: impl Into<CompactString>, prefix_len: u32) -> Self {
        Self { address_prefix: address_prefix.into(), prefix_len }
    }

    /// Parses the range for use by connection matchers.
    pub fn to_ip_net(&self) -> Result<IpNet, CidrRangeError> {
        let ip = self
            .address_prefix
            .parse::<IpAddr>()
            .map_err(|e| CidrRangeError::InvalidAddress(self.address_prefix.clone(), e))?;
        u8::try_from(self.prefix_len)
            .ok()
            .and_then(|prefix_len| IpNet::new(ip, prefix_len).ok())
            .ok_or_else(|| CidrRangeError::InvalidPrefixLength {
                address_prefix: self.address_prefix.clone(),
                prefix_len: self.prefix_len,
            })
    }
}

impl Display for CidrRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address_prefix, self.prefix_len)
    }
}

pub use envoy_conversions::socket_address_string;

mod envoy_conversions {
    use super::{CidrRange, DataSource};
    use compact_str::{format_compact, CompactString};
    use xds_data_plane_api::envoy::config::core::v3::{
        address::Address as EnvoyAddress, data_source::Specifier as EnvoySpecifier, socket_address::PortSpecifier,
        Address as EnvoyOuterAddress, CidrRange as EnvoyCidrRange, DataSource as EnvoyDataSource,
    };

    impl From<EnvoyCidrRange> for CidrRange {
        fn from(envoy: EnvoyCidrRange) -> Self {
            let EnvoyCidrRange { address_prefix, prefix_len } = envoy;
            // defaults to 0 when unset
            // https://www.envoyproxy.io/docs/envoy/latest/api-v3/config/core/v3/address.proto#envoy-v3-api-msg-config-core-v3-cidrrange
            Self { address_prefix: address_prefix.into(), prefix_len: prefix_len.unwrap_or(0) }
        }
    }

    impl DataSource {
        pub(crate) fn from_envoy(envoy: EnvoyDataSource) -> Option<Self> {
            Some(match envoy.specifier? {
                EnvoySpecifier::InlineBytes(b) => Self::InlineBytes(b),
                EnvoySpecifier::InlineString(s) => Self::InlineString(s.into()),
                EnvoySpecifier::Filename(filename) => Self::Path(filename.into()),
                EnvoySpecifier::EnvironmentVariable(var) => Self::EnvironmentVariable(var.into()),
            })
        }
    }

    /// Renders a listener address as `"host:port"`. Only socket addresses carry
    /// a host and port, anything else renders with an empty host and port 0.
    pub fn socket_address_string(address: Option<EnvoyOuterAddress>) -> CompactString {
        let Some(EnvoyAddress::SocketAddress(socket)) = address.and_then(|a| a.address) else {
            return CompactString::from(":0");
        };
        match socket.port_specifier {
            Some(PortSpecifier::PortValue(port)) => format_compact!("{}:{port}", socket.address),
            Some(PortSpecifier::NamedPort(name)) => format_compact!("{}:{name}", socket.address),
            None => format_compact!("{}:0", socket.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{socket_address_string, CidrRange, DataSource};
    use xds_data_plane_api::envoy::config::core::v3::{
        address, data_source::Specifier, socket_address::PortSpecifier, Address, CidrRange as EnvoyCidrRange,
        DataSource as EnvoyDataSource, Pipe, SocketAddress,
    };

    fn socket(address: &str, port: Option<PortSpecifier>) -> Option<Address> {
        Some(Address {
            address: Some(address::Address::SocketAddress(SocketAddress {
                address: address.to_owned(),
                port_specifier: port,
                ..Default::default()
            })),
        })
    }

    #[test]
    fn address_is_host_colon_port() {
        assert_eq!(socket_address_string(socket("10.2.1.34", Some(PortSpecifier::PortValue(8000)))), "10.2.1.34:8000");
        assert_eq!(
            socket_address_string(socket("0.0.0.0", Some(PortSpecifier::NamedPort("https".to_owned())))),
            "0.0.0.0:https"
        );
        assert_eq!(socket_address_string(socket("::", None)), ":::0");
    }

    #[test]
    fn missing_or_pipe_address_defaults() {
        assert_eq!(socket_address_string(None), ":0");
        let pipe = Address { address: Some(address::Address::Pipe(Pipe { path: "/tmp/sock".to_owned(), mode: 0 })) };
        assert_eq!(socket_address_string(Some(pipe)), ":0");
    }

    #[test]
    fn cidr_range_defaults_prefix_len_to_zero() {
        let range = CidrRange::from(EnvoyCidrRange { address_prefix: "10.0.0.0".to_owned(), prefix_len: None });
        assert_eq!(range, CidrRange::new("10.0.0.0", 0));
        assert_eq!(range.to_string(), "10.0.0.0/0");
    }

    #[test]
    fn cidr_range_to_ip_net() {
        let net = CidrRange::new("10.30.3.0", 24).to_ip_net().unwrap();
        assert!(net.contains(&"10.30.3.77".parse::<std::net::IpAddr>().unwrap()));
        assert!(CidrRange::new("10.30.3.0", 33).to_ip_net().is_err());
        assert!(CidrRange::new("not-an-ip", 8).to_ip_net().is_err());
        assert_eq!(CidrRange::new("2001:db8::", 32).to_ip_net().unwrap().prefix_len(), 32);
    }

    #[test]
    fn data_source_conversion_and_read() {
        let inline =
            DataSource::from_envoy(EnvoyDataSource { specifier: Some(Specifier::InlineString("pem".to_owned())) });
        assert_eq!(inline, Some(DataSource::InlineString("pem".into())));
        assert_eq!(inline.unwrap().to_bytes_blocking().unwrap(), b"pem");
        assert_eq!(DataSource::from_envoy(EnvoyDataSource { specifier: None }), None);

        let missing = DataSource::Path("/definitely/not/here.pem".into());
        assert!(missing.to_bytes_blocking().is_err());
    }
}
