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

use super::{
    reference_counting_map::ReferenceCountingMap,
    ssl_context_provider::{ProviderError, RustlsSslContextProvider, SslContextProvider},
    SdsError,
};
use std::{fmt::Debug, sync::Arc};
use xds_configuration::config::transport::{DownstreamTlsContext, UpstreamTlsContext};

/// Hands out shared [`SslContextProvider`]s so that filter chains with equal
/// TLS configuration use one provider. Each successful `find_or_create_*`
/// must be matched by one `release_*` of the same role.
pub trait TlsContextManager: Send + Sync + Debug {
    fn find_or_create_server_ssl_context_provider(
        &self,
        downstream_tls_context: &DownstreamTlsContext,
    ) -> Result<Arc<dyn SslContextProvider>, SdsError>;

    fn find_or_create_client_ssl_context_provider(
        &self,
        upstream_tls_context: &UpstreamTlsContext,
    ) -> Result<Arc<dyn SslContextProvider>, SdsError>;

    fn release_server_ssl_context_provider(&self, provider: &Arc<dyn SslContextProvider>) -> Result<(), SdsError>;

    fn release_client_ssl_context_provider(&self, provider: &Arc<dyn SslContextProvider>) -> Result<(), SdsError>;
}

pub type ProviderFactory<K> = Box<dyn Fn(&K) -> Result<Arc<dyn SslContextProvider>, ProviderError> + Send + Sync>;

type ProviderMap<K> = ReferenceCountingMap<K, dyn SslContextProvider, ProviderFactory<K>>;

#[derive(Debug)]
pub struct TlsContextManagerImpl {
    server_providers: ProviderMap<DownstreamTlsContext>,
    client_providers: ProviderMap<UpstreamTlsContext>,
}

impl Default for TlsContextManagerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsContextManagerImpl {
    /// A manager whose providers are backed by rustls configurations.
    pub fn new() -> Self {
        Self::with_factories(Box::new(RustlsSslContextProvider::for_client), Box::new(RustlsSslContextProvider::for_server))
    }

    pub fn with_factories(
        client_factory: ProviderFactory<UpstreamTlsContext>,
        server_factory: ProviderFactory<DownstreamTlsContext>,
    ) -> Self {
        Self {
            server_providers: ReferenceCountingMap::new(server_factory),
            client_providers: ReferenceCountingMap::new(client_factory),
        }
    }

    pub fn server_provider_count(&self) -> usize {
        self.server_providers.len()
    }

    pub fn client_provider_count(&self) -> usize {
        self.client_providers.len()
    }

    pub fn server_ref_count(&self, downstream_tls_context: &DownstreamTlsContext) -> Option<usize> {
        self.server_providers.ref_count(downstream_tls_context)
    }

    pub fn client_ref_count(&self, upstream_tls_context: &UpstreamTlsContext) -> Option<usize> {
        self.client_providers.ref_count(upstream_tls_context)
    }
}

impl TlsContextManager for TlsContextManagerImpl {
    fn find_or_create_server_ssl_context_provider(
        &self,
        downstream_tls_context: &DownstreamTlsContext,
    ) -> Result<Arc<dyn SslContextProvider>, SdsError> {
        Ok(self.server_providers.find_or_create(downstream_tls_context)?)
    }

    fn find_or_create_client_ssl_context_provider(
        &self,
        upstream_tls_context: &UpstreamTlsContext,
    ) -> Result<Arc<dyn SslContextProvider>, SdsError> {
        Ok(self.client_providers.find_or_create(upstream_tls_context)?)
    }

    fn release_server_ssl_context_provider(&self, provider: &Arc<dyn SslContextProvider>) -> Result<(), SdsError> {
        let key = provider
            .downstream_tls_context()
            .ok_or(SdsError::WrongRole { expected: "downstream", found: provider.tls_context().role() })?;
        Ok(self.server_providers.release(key, provider)?)
    }

    fn release_client_ssl_context_provider(&self, provider: &Arc<dyn SslContextProvider>) -> Result<(), SdsError> {
        let key = provider
            .upstream_tls_context()
            .ok_or(SdsError::WrongRole { expected: "upstream", found: provider.tls_context().role() })?;
        Ok(self.client_providers.release(key, provider)?)
    }
}
