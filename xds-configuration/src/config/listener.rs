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

use super::{common::is_default, core::CidrRange};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionSourceType {
    /// Any connection source matches.
    #[default]
    Any,
    /// Match a connection originating from the same host.
    SameIpOrLoopback,
    /// Match a connection originating from a different host.
    External,
}

/// Selector criteria for a filter chain. An empty collection or `None` means
/// the dimension is unconstrained; a populated one matches only what it lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct FilterChainMatch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub destination_port: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub application_protocols: Vec<CompactString>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub server_names: Vec<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transport_protocol: Option<CompactString>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub prefix_ranges: BTreeSet<CidrRange>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub source_prefix_ranges: BTreeSet<CidrRange>,
    #[serde(skip_serializing_if = "is_default", default)]
    pub connection_source_type: ConnectionSourceType,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub source_ports: BTreeSet<u32>,
}

impl FilterChainMatch {
    /// `true` if no dimension is constrained.
    pub fn is_unconstrained(&self) -> bool {
        is_default(self)
    }
}

mod envoy_conversions {
    use super::{ConnectionSourceType, FilterChainMatch};
    use crate::config::core::CidrRange;
    use compact_str::CompactString;
    use tracing::debug;
    use xds_data_plane_api::envoy::config::listener::v3::{
        filter_chain_match::ConnectionSourceType as EnvoyConnectionSourceType,
        FilterChainMatch as EnvoyFilterChainMatch,
    };

    impl From<EnvoyConnectionSourceType> for ConnectionSourceType {
        fn from(value: EnvoyConnectionSourceType) -> Self {
            match value {
                EnvoyConnectionSourceType::Any => Self::Any,
                EnvoyConnectionSourceType::SameIpOrLoopback => Self::SameIpOrLoopback,
                EnvoyConnectionSourceType::External => Self::External,
            }
        }
    }

    impl From<EnvoyFilterChainMatch> for FilterChainMatch {
        fn from(envoy: EnvoyFilterChainMatch) -> Self {
            // the accessor falls back to ANY for values this build doesn't know about
            let connection_source_type = envoy.source_type().into();
            let EnvoyFilterChainMatch {
                destination_port,
                prefix_ranges,
                address_suffix,
                suffix_len,
                direct_source_prefix_ranges,
                source_type: _,
                source_prefix_ranges,
                source_ports,
                server_names,
                transport_protocol,
                application_protocols,
            } = envoy;
            if !address_suffix.is_empty() || suffix_len.is_some() || !direct_source_prefix_ranges.is_empty() {
                debug!("ignoring address_suffix, suffix_len and direct_source_prefix_ranges in filter chain match");
            }
            Self {
                destination_port,
                application_protocols: application_protocols.into_iter().map(CompactString::from).collect(),
                server_names: server_names.into_iter().map(CompactString::from).collect(),
                transport_protocol: (!transport_protocol.is_empty()).then(|| transport_protocol.into()),
                prefix_ranges: prefix_ranges.into_iter().map(CidrRange::from).collect(),
                source_prefix_ranges: source_prefix_ranges.into_iter().map(CidrRange::from).collect(),
                connection_source_type,
                source_ports: source_ports.into_iter().collect(),
            }
        }
    }
}
