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

use crate::{sds::SslContextProviderSupplier, ConversionContext, Result};
use compact_str::CompactString;
use serde::Serialize;
use tracing::debug;
use xds_configuration::config::{
    listener::FilterChainMatch,
    transport::{downstream_tls_context_from_transport_socket, TlsContext},
    WithNodeOnResult,
};
use xds_data_plane_api::envoy::config::listener::v3::FilterChain as EnvoyFilterChain;

/// A filter chain reduced to what selects it and how its connections are
/// secured. Dropping it releases its share of the TLS context provider.
#[derive(Debug, Serialize)]
pub struct FilterChain {
    #[serde(skip_serializing_if = "CompactString::is_empty")]
    name: CompactString,
    filter_chain_match: FilterChainMatch,
    #[serde(rename = "tls_context", skip_serializing_if = "SslContextProviderSupplier::is_plaintext")]
    ssl_context_provider_supplier: SslContextProviderSupplier,
}

impl FilterChain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter_chain_match(&self) -> &FilterChainMatch {
        &self.filter_chain_match
    }

    pub fn ssl_context_provider_supplier(&self) -> &SslContextProviderSupplier {
        &self.ssl_context_provider_supplier
    }
}

impl TryFrom<ConversionContext<'_, EnvoyFilterChain>> for FilterChain {
    type Error = crate::GenericError;

    fn try_from(ctx: ConversionContext<'_, EnvoyFilterChain>) -> Result<Self> {
        let ConversionContext { envoy_object: envoy, tls_context_manager } = ctx;
        let EnvoyFilterChain { filter_chain_match, filters, transport_socket, name } = envoy;
        if !filters.is_empty() {
            debug!("filter chain \"{name}\": {} network filters are not converted", filters.len());
        }
        let filter_chain_match = filter_chain_match.map(FilterChainMatch::from).unwrap_or_default();
        let tls_context =
            downstream_tls_context_from_transport_socket(transport_socket).with_node("transport_socket")?.map(TlsContext::from);
        Ok(Self {
            name: name.into(),
            filter_chain_match,
            ssl_context_provider_supplier: SslContextProviderSupplier::new(tls_context, tls_context_manager.clone()),
        })
    }
}
