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

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
};
use xds_configuration::config::{
    core::DataSource,
    transport::{
        CertificateValidationContext, CommonTlsContext, CommonTlsValidationContext, DownstreamTlsContext,
        TlsCertificate, UpstreamTlsContext,
    },
};
use xds_lib::{
    sds::{ProviderError, RustlsSslContextProvider},
    SslContextProvider, SslContextProviderSupplier, TlsContextManager, TlsContextManagerImpl,
};

const CERTS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/certs");

fn file(name: &str) -> Option<DataSource> {
    Some(DataSource::Path(format!("{CERTS}/{name}").into()))
}

fn server_context(name: &str) -> DownstreamTlsContext {
    DownstreamTlsContext {
        common_tls_context: CommonTlsContext {
            tls_certificates: vec![TlsCertificate {
                certificate_chain: file(&format!("{name}.pem")),
                private_key: file(&format!("{name}.key")),
            }],
            ..Default::default()
        },
        ..Default::default()
    }
}

fn client_context() -> UpstreamTlsContext {
    UpstreamTlsContext {
        common_tls_context: CommonTlsContext {
            validation_context: Some(CommonTlsValidationContext::ValidationContext(CertificateValidationContext {
                trusted_ca: file("ca.pem"),
                ..Default::default()
            })),
            ..Default::default()
        },
        sni: "server1.test.google.fr".into(),
        allow_renegotiation: false,
    }
}

/// Server factory that counts constructions and delegates to the rustls one.
fn counting_manager(created: Arc<AtomicUsize>) -> TlsContextManagerImpl {
    TlsContextManagerImpl::with_factories(
        Box::new(RustlsSslContextProvider::for_client),
        Box::new(move |ctx: &DownstreamTlsContext| -> Result<Arc<dyn SslContextProvider>, ProviderError> {
            created.fetch_add(1, Ordering::SeqCst);
            RustlsSslContextProvider::for_server(ctx)
        }),
    )
}

#[test]
fn key_and_cert_files_a_and_b() {
    let created = Arc::new(AtomicUsize::new(0));
    let manager = counting_manager(Arc::clone(&created));

    let a = manager.find_or_create_server_ssl_context_provider(&server_context("server1")).unwrap();
    let a_again = manager.find_or_create_server_ssl_context_provider(&server_context("server1")).unwrap();
    assert!(Arc::ptr_eq(&a, &a_again));
    assert_eq!(created.load(Ordering::SeqCst), 1);

    let b = manager.find_or_create_server_ssl_context_provider(&server_context("server0")).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert!(a.server_config().is_some());
    assert!(b.server_config().is_some());

    manager.release_server_ssl_context_provider(&a).unwrap();
    manager.release_server_ssl_context_provider(&a_again).unwrap();
    assert_eq!(manager.server_ref_count(&server_context("server1")), None);
    assert_eq!(manager.server_ref_count(&server_context("server0")), Some(1));

    // B is still the tracked instance and releases cleanly
    let b_again = manager.find_or_create_server_ssl_context_provider(&server_context("server0")).unwrap();
    assert!(Arc::ptr_eq(&b, &b_again));
    manager.release_server_ssl_context_provider(&b).unwrap();
    manager.release_server_ssl_context_provider(&b_again).unwrap();
    assert_eq!(manager.server_provider_count(), 0);
}

#[test]
fn client_and_server_maps_are_independent() {
    let manager = TlsContextManagerImpl::new();
    let client = manager.find_or_create_client_ssl_context_provider(&client_context()).unwrap();
    let server = manager.find_or_create_server_ssl_context_provider(&server_context("server1")).unwrap();
    assert!(client.client_config().is_some());
    assert_eq!(manager.client_provider_count(), 1);
    assert_eq!(manager.server_provider_count(), 1);
    assert_eq!(manager.client_ref_count(&client_context()), Some(1));
    assert_eq!(manager.server_ref_count(&server_context("server1")), Some(1));
    assert!(manager.release_server_ssl_context_provider(&client).is_err());
    assert_eq!(manager.client_ref_count(&client_context()), Some(1));
    manager.release_client_ssl_context_provider(&client).unwrap();
    manager.release_server_ssl_context_provider(&server).unwrap();
    assert_eq!(manager.client_provider_count(), 0);
    assert_eq!(manager.server_provider_count(), 0);
}

#[test]
fn concurrent_suppliers_build_one_provider() {
    const THREADS: usize = 16;
    let created = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(counting_manager(Arc::clone(&created)));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager: Arc<dyn TlsContextManager> = manager.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let supplier = SslContextProviderSupplier::new(Some(server_context("server1").into()), manager);
                barrier.wait();
                let provider = supplier.ssl_context_provider().unwrap().unwrap();
                (supplier, provider)
            })
        })
        .collect();
    let suppliers: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    let first = &suppliers[0].1;
    assert!(suppliers.iter().all(|(_, provider)| Arc::ptr_eq(provider, first)));
    assert_eq!(manager.server_ref_count(&server_context("server1")), Some(THREADS));

    drop(suppliers);
    assert_eq!(manager.server_provider_count(), 0);
}
