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

use super::filter_chain::FilterChain;
use crate::{ConversionContext, Result, TlsContextManager};
use compact_str::CompactString;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use xds_configuration::config::{core::socket_address_string, WithNodeOnResult};
use xds_data_plane_api::envoy::config::listener::v3::Listener as EnvoyListener;

#[derive(Debug, Serialize)]
pub struct Listener {
    name: CompactString,
    address: CompactString,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filter_chains: Vec<FilterChain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_filter_chain: Option<FilterChain>,
}

impl Listener {
    /// Converts a wire listener, binding every TLS filter chain to
    /// `tls_context_manager`. No provider is acquired until a filter chain's
    /// supplier is first asked for one.
    pub fn from_envoy_listener(
        envoy_listener: EnvoyListener,
        tls_context_manager: &Arc<dyn TlsContextManager>,
    ) -> Result<Self> {
        Self::try_from(ConversionContext::new((envoy_listener, tls_context_manager)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `host:port` of the socket address the listener binds to.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn filter_chains(&self) -> &[FilterChain] {
        &self.filter_chains
    }

    pub fn default_filter_chain(&self) -> Option<&FilterChain> {
        self.default_filter_chain.as_ref()
    }

    /// The regular filter chains followed by the default one, if any.
    pub fn all_filter_chains(&self) -> impl Iterator<Item = &FilterChain> {
        self.filter_chains.iter().chain(self.default_filter_chain.iter())
    }
}

impl TryFrom<ConversionContext<'_, EnvoyListener>> for Listener {
    type Error = crate::GenericError;

    fn try_from(ctx: ConversionContext<'_, EnvoyListener>) -> Result<Self> {
        let ConversionContext { envoy_object: envoy, tls_context_manager } = ctx;
        let EnvoyListener { name, address, filter_chains, traffic_direction: _, default_filter_chain, stat_prefix: _ } =
            envoy;
        let address = socket_address_string(address);
        let filter_chains = filter_chains
            .into_iter()
            .enumerate()
            .map(|(idx, filter_chain)| {
                FilterChain::try_from(ConversionContext::new((filter_chain, tls_context_manager))).with_index(idx)
            })
            .collect::<Result<Vec<_>>>()
            .with_node("filter_chains")?;
        let default_filter_chain = default_filter_chain
            .map(|filter_chain| FilterChain::try_from(ConversionContext::new((filter_chain, tls_context_manager))))
            .transpose()
            .with_node("default_filter_chain")?;
        debug!(
            "listener \"{name}\" on {address}: {} filter chains, default filter chain {}",
            filter_chains.len(),
            if default_filter_chain.is_some() { "present" } else { "absent" }
        );
        Ok(Self { name: name.into(), address, filter_chains, default_filter_chain })
    }
}

#[cfg(test)]
mod tests {
    use super::Listener;
    use crate::{sds::tls_context_manager::tests::mock_manager, TlsContextManager};
    use std::sync::Arc;
    use xds_data_plane_api::{
        envoy::config::{
            core::v3::{
                address, socket_address::PortSpecifier, transport_socket::ConfigType, Address, SocketAddress,
                TransportSocket,
            },
            listener::v3::{FilterChain, Listener as EnvoyListener},
        },
        google::protobuf::Any,
    };

    fn manager() -> Arc<dyn TlsContextManager> {
        Arc::new(mock_manager())
    }

    #[test]
    fn empty_listener() {
        let envoy = EnvoyListener { name: "empty".to_owned(), ..Default::default() };
        let listener = Listener::from_envoy_listener(envoy, &manager()).unwrap();
        assert_eq!(listener.name(), "empty");
        assert_eq!(listener.address(), ":0");
        assert!(listener.filter_chains().is_empty());
        assert!(listener.default_filter_chain().is_none());
    }

    #[test]
    fn named_port_is_kept() {
        let envoy = EnvoyListener {
            name: "named".to_owned(),
            address: Some(Address {
                address: Some(address::Address::SocketAddress(SocketAddress {
                    address: "0.0.0.0".to_owned(),
                    port_specifier: Some(PortSpecifier::NamedPort("https".to_owned())),
                    ..Default::default()
                })),
            }),
            ..Default::default()
        };
        assert_eq!(Listener::from_envoy_listener(envoy, &manager()).unwrap().address(), "0.0.0.0:https");
    }

    #[test]
    fn undecodable_tls_context_names_the_filter_chain() {
        let garbage = Any {
            type_url: "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext".to_owned(),
            value: vec![0x0a, 0xff, 0xff],
        };
        let envoy = EnvoyListener {
            name: "broken".to_owned(),
            filter_chains: vec![
                FilterChain::default(),
                FilterChain {
                    transport_socket: Some(TransportSocket {
                        name: "envoy.transport_sockets.tls".to_owned(),
                        config_type: Some(ConfigType::TypedConfig(garbage)),
                    }),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let err = Listener::from_envoy_listener(envoy, &manager()).unwrap_err();
        assert_eq!(err.trace().as_deref(), Some("filter_chains [1] / transport_socket / typed_config"));
    }
}
