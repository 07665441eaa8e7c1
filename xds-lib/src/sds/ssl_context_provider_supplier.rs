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

use super::{SdsError, SslContextProvider, TlsContextManager};
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, warn};
use xds_configuration::config::transport::TlsContext;

#[derive(Debug)]
enum SupplierState {
    Idle,
    Acquired(Arc<dyn SslContextProvider>),
    Shutdown,
}

/// Binds one filter chain to its TLS configuration. The provider is acquired
/// from the shared manager on first use and released when the supplier is
/// closed or dropped.
#[derive(Debug)]
pub struct SslContextProviderSupplier {
    tls_context: Option<TlsContext>,
    tls_context_manager: Arc<dyn TlsContextManager>,
    state: Mutex<SupplierState>,
}

impl SslContextProviderSupplier {
    pub fn new(tls_context: Option<TlsContext>, tls_context_manager: Arc<dyn TlsContextManager>) -> Self {
        Self { tls_context, tls_context_manager, state: Mutex::new(SupplierState::Idle) }
    }

    /// `None` for a plaintext filter chain.
    pub fn tls_context(&self) -> Option<&TlsContext> {
        self.tls_context.as_ref()
    }

    pub fn is_plaintext(&self) -> bool {
        self.tls_context.is_none()
    }

    /// Returns the shared provider, acquiring it on the first call. Plaintext
    /// suppliers yield `Ok(None)` and never touch the manager. Once closed,
    /// every supplier fails with [`SdsError::SupplierShutdown`].
    pub fn ssl_context_provider(&self) -> Result<Option<Arc<dyn SslContextProvider>>, SdsError> {
        let mut state = self.state.lock();
        match &*state {
            SupplierState::Acquired(provider) => return Ok(Some(Arc::clone(provider))),
            SupplierState::Shutdown => return Err(SdsError::SupplierShutdown),
            SupplierState::Idle => {},
        }
        let provider = match &self.tls_context {
            None => return Ok(None),
            Some(TlsContext::Downstream(ctx)) => self.tls_context_manager.find_or_create_server_ssl_context_provider(ctx)?,
            Some(TlsContext::Upstream(ctx)) => self.tls_context_manager.find_or_create_client_ssl_context_provider(ctx)?,
        };
        debug!("acquired {} SSL context provider", provider.tls_context().role());
        *state = SupplierState::Acquired(Arc::clone(&provider));
        Ok(Some(provider))
    }

    /// Releases the provider if one was acquired. Later calls are no-ops and
    /// later acquisitions fail.
    pub fn close(&self) -> Result<(), SdsError> {
        let previous = std::mem::replace(&mut *self.state.lock(), SupplierState::Shutdown);
        let SupplierState::Acquired(provider) = previous else {
            return Ok(());
        };
        match provider.tls_context() {
            TlsContext::Downstream(_) => self.tls_context_manager.release_server_ssl_context_provider(&provider),
            TlsContext::Upstream(_) => self.tls_context_manager.release_client_ssl_context_provider(&provider),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(*self.state.lock(), SupplierState::Shutdown)
    }
}

impl Drop for SslContextProviderSupplier {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to release SSL context provider: {e}");
        }
    }
}

impl Serialize for SslContextProviderSupplier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tls_context.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::SslContextProviderSupplier;
    use crate::sds::{
        tls_context_manager::tests::{downstream, mock_manager},
        SdsError, TlsContextManager,
    };
    use std::sync::Arc;
    use xds_configuration::config::transport::{TlsContext, UpstreamTlsContext};

    #[test]
    fn plaintext_supplier_never_acquires() {
        let manager = Arc::new(mock_manager());
        let supplier = SslContextProviderSupplier::new(None, manager.clone());
        assert!(supplier.is_plaintext());
        assert!(supplier.ssl_context_provider().unwrap().is_none());
        assert_eq!(manager.server_provider_count(), 0);
        supplier.close().unwrap();
        assert!(supplier.is_shutdown());
        assert!(matches!(supplier.ssl_context_provider(), Err(SdsError::SupplierShutdown)));
    }

    #[test]
    fn acquires_lazily_and_once() {
        let manager = Arc::new(mock_manager());
        let supplier = SslContextProviderSupplier::new(Some(downstream("a").into()), manager.clone());
        assert_eq!(manager.server_provider_count(), 0);
        let first = supplier.ssl_context_provider().unwrap().unwrap();
        let second = supplier.ssl_context_provider().unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.server_ref_count(&downstream("a")), Some(1));
    }

    #[test]
    fn suppliers_with_equal_context_share_provider() {
        let manager = Arc::new(mock_manager());
        let a = SslContextProviderSupplier::new(Some(downstream("a").into()), manager.clone());
        let b = SslContextProviderSupplier::new(Some(downstream("a").into()), manager.clone());
        let from_a = a.ssl_context_provider().unwrap().unwrap();
        let from_b = b.ssl_context_provider().unwrap().unwrap();
        assert!(Arc::ptr_eq(&from_a, &from_b));
        assert_eq!(manager.server_ref_count(&downstream("a")), Some(2));
        drop(a);
        assert_eq!(manager.server_ref_count(&downstream("a")), Some(1));
        drop(b);
        assert_eq!(manager.server_provider_count(), 0);
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let manager = Arc::new(mock_manager());
        let supplier = SslContextProviderSupplier::new(
            Some(TlsContext::Upstream(UpstreamTlsContext { sni: "backend".into(), ..Default::default() })),
            manager.clone(),
        );
        supplier.ssl_context_provider().unwrap();
        assert_eq!(manager.client_provider_count(), 1);
        supplier.close().unwrap();
        supplier.close().unwrap();
        assert_eq!(manager.client_provider_count(), 0);
        assert!(matches!(supplier.ssl_context_provider(), Err(SdsError::SupplierShutdown)));
    }

    #[test]
    fn close_without_acquire_does_not_touch_manager() {
        let manager = Arc::new(mock_manager());
        let other = manager.find_or_create_server_ssl_context_provider(&downstream("a")).unwrap();
        let supplier = SslContextProviderSupplier::new(Some(downstream("a").into()), manager.clone());
        supplier.close().unwrap();
        assert_eq!(manager.server_ref_count(&downstream("a")), Some(1));
        manager.release_server_ssl_context_provider(&other).unwrap();
    }
}
