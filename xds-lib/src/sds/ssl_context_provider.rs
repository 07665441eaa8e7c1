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

use super::reference_counting_map::Closeable;
use compact_str::CompactString;
use rustls::{
    client::WebPkiServerVerifier,
    crypto::CryptoProvider,
    pki_types::{CertificateDer, CertificateRevocationListDer, PrivateKeyDer},
    server::WebPkiClientVerifier,
    version::{TLS12, TLS13},
    CipherSuite, ClientConfig, RootCertStore, ServerConfig, SupportedCipherSuite, SupportedProtocolVersion,
};
use rustls_pemfile::{certs, crls, private_key};
use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, warn};
use xds_configuration::config::{
    core::{DataSource, DataSourceReadError},
    transport::{
        CertificateValidationContext, CommonTlsContext, CommonTlsValidationContext, DownstreamTlsContext,
        TlsCertificate, TlsContext, TlsParameters, TlsVersion, UpstreamTlsContext,
    },
};

/// Shared TLS state built from one [`TlsContext`]. Instances are handed out by
/// the [`TlsContextManager`](super::TlsContextManager) and closed once the last
/// filter chain using them lets go.
pub trait SslContextProvider: Closeable + Send + Sync + Debug {
    /// The configuration this provider was built from. It is also the key the
    /// provider is tracked under.
    fn tls_context(&self) -> &TlsContext;

    fn downstream_tls_context(&self) -> Option<&DownstreamTlsContext> {
        self.tls_context().as_downstream()
    }

    fn upstream_tls_context(&self) -> Option<&UpstreamTlsContext> {
        self.tls_context().as_upstream()
    }

    fn server_config(&self) -> Option<Arc<ServerConfig>> {
        None
    }

    fn client_config(&self) -> Option<Arc<ClientConfig>> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("TLS context refers to SDS secrets {0:?} which are not available")]
    SdsSecretsNotAvailable(Vec<CompactString>),
    #[error("no certificate configured")]
    NoCertificate,
    #[error("only one certificate may be configured, found {0}")]
    TooManyCertificates(usize),
    #[error("certificate has no {0}")]
    IncompleteCertificate(&'static str),
    #[error("no trusted CA configured")]
    MissingTrustedCa,
    #[error("{0} is not supported by this provider")]
    UnsupportedValidation(&'static str),
    #[error("none of the cipher suites {0:?} can be used")]
    NoCipherSuites(Vec<CompactString>),
    #[error("{0} of the trusted CA certificates could not be parsed")]
    InvalidTrustedCa(usize),
    #[error("no PEM encoded {0} found")]
    NoPemItem(&'static str),
    #[error("can't parse PEM data")]
    Pem(#[source] std::io::Error),
    #[error(transparent)]
    DataSource(#[from] DataSourceReadError),
    #[error(transparent)]
    Verifier(#[from] rustls::server::VerifierBuilderError),
    #[error(transparent)]
    Rustls(#[from] rustls::Error),
}

#[derive(Debug, Clone)]
pub enum RustlsConfig {
    Server(Arc<ServerConfig>),
    Client(Arc<ClientConfig>),
}

/// The provider built by the default factories: a ready to use rustls
/// configuration for either side of a connection.
#[derive(Debug)]
pub struct RustlsSslContextProvider {
    tls_context: TlsContext,
    config: RustlsConfig,
    closed: AtomicBool,
}

impl RustlsSslContextProvider {
    pub fn for_server(ctx: &DownstreamTlsContext) -> Result<Arc<dyn SslContextProvider>, ProviderError> {
        let config = build_server_config(ctx)?;
        Ok(Arc::new(Self {
            tls_context: TlsContext::Downstream(ctx.clone()),
            config: RustlsConfig::Server(Arc::new(config)),
            closed: AtomicBool::new(false),
        }))
    }

    pub fn for_client(ctx: &UpstreamTlsContext) -> Result<Arc<dyn SslContextProvider>, ProviderError> {
        let config = build_client_config(ctx)?;
        Ok(Arc::new(Self {
            tls_context: TlsContext::Upstream(ctx.clone()),
            config: RustlsConfig::Client(Arc::new(config)),
            closed: AtomicBool::new(false),
        }))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Closeable for RustlsSslContextProvider {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("closing {} SSL context provider", self.tls_context.role());
        }
    }
}

impl SslContextProvider for RustlsSslContextProvider {
    fn tls_context(&self) -> &TlsContext {
        &self.tls_context
    }

    fn server_config(&self) -> Option<Arc<ServerConfig>> {
        match &self.config {
            RustlsConfig::Server(config) => Some(Arc::clone(config)),
            RustlsConfig::Client(_) => None,
        }
    }

    fn client_config(&self) -> Option<Arc<ClientConfig>> {
        match &self.config {
            RustlsConfig::Client(config) => Some(Arc::clone(config)),
            RustlsConfig::Server(_) => None,
        }
    }
}

fn openssl_name(suite: CipherSuite) -> Option<&'static str> {
    Some(match suite {
        CipherSuite::TLS13_AES_128_GCM_SHA256 => "TLS_AES_128_GCM_SHA256",
        CipherSuite::TLS13_AES_256_GCM_SHA384 => "TLS_AES_256_GCM_SHA384",
        CipherSuite::TLS13_CHACHA20_POLY1305_SHA256 => "TLS_CHACHA20_POLY1305_SHA256",
        CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => "ECDHE-ECDSA-AES128-GCM-SHA256",
        CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => "ECDHE-ECDSA-AES256-GCM-SHA384",
        CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 => "ECDHE-ECDSA-CHACHA20-POLY1305",
        CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => "ECDHE-RSA-AES128-GCM-SHA256",
        CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => "ECDHE-RSA-AES256-GCM-SHA384",
        CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => "ECDHE-RSA-CHACHA20-POLY1305",
        _ => return None,
    })
}

/// The ring provider restricted to the configured cipher suites. TLS 1.3
/// suites are only restricted when at least one of them is named.
fn crypto_provider(params: &TlsParameters) -> Result<Arc<CryptoProvider>, ProviderError> {
    let mut provider = rustls::crypto::ring::default_provider();
    if params.cipher_suites.is_empty() {
        return Ok(Arc::new(provider));
    }
    let requested: Vec<&str> = params
        .cipher_suites
        .iter()
        .flat_map(|entry| entry.trim_start_matches('[').trim_end_matches(']').split('|'))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    for name in &requested {
        if !provider.cipher_suites.iter().any(|suite| openssl_name(suite.suite()) == Some(*name)) {
            warn!("cipher suite \"{name}\" is not available, ignoring it");
        }
    }
    let restrict_tls13 = requested.iter().any(|name| name.starts_with("TLS_"));
    provider.cipher_suites.retain(|suite| match suite {
        SupportedCipherSuite::Tls13(_) if !restrict_tls13 => true,
        _ => openssl_name(suite.suite()).is_some_and(|name| requested.contains(&name)),
    });
    if provider.cipher_suites.is_empty() {
        return Err(ProviderError::NoCipherSuites(params.cipher_suites.clone()));
    }
    Ok(Arc::new(provider))
}

fn protocol_versions(params: &TlsParameters) -> Vec<&'static SupportedProtocolVersion> {
    params
        .supported_version()
        .iter()
        .map(|version| match version {
            TlsVersion::TLSv1_2 => &TLS12,
            TlsVersion::TLSv1_3 => &TLS13,
        })
        .collect()
}

/// Secrets delivered over SDS are never resolved here; a context that names
/// one can't be built.
fn check_no_sds_secrets(common: &CommonTlsContext) -> Result<(), ProviderError> {
    let mut names: Vec<CompactString> =
        common.tls_certificate_sds_secret_configs.iter().map(|sds| sds.name.clone()).collect();
    if let Some(CommonTlsValidationContext::SdsConfig(sds)) = &common.validation_context {
        names.push(sds.name.clone());
    }
    if names.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::SdsSecretsNotAvailable(names))
    }
}

fn read_certificates(source: &DataSource) -> Result<Vec<CertificateDer<'static>>, ProviderError> {
    let pem = source.to_bytes_blocking()?;
    let certificates = certs(&mut pem.as_slice()).collect::<Result<Vec<_>, _>>().map_err(ProviderError::Pem)?;
    if certificates.is_empty() {
        return Err(ProviderError::NoPemItem("certificate"));
    }
    Ok(certificates)
}

fn read_private_key(source: &DataSource) -> Result<PrivateKeyDer<'static>, ProviderError> {
    let pem = source.to_bytes_blocking()?;
    private_key(&mut pem.as_slice()).map_err(ProviderError::Pem)?.ok_or(ProviderError::NoPemItem("private key"))
}

fn read_certified_key(
    certificate: &TlsCertificate,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ProviderError> {
    let chain = certificate.certificate_chain.as_ref().ok_or(ProviderError::IncompleteCertificate("certificate chain"))?;
    let key = certificate.private_key.as_ref().ok_or(ProviderError::IncompleteCertificate("private key"))?;
    Ok((read_certificates(chain)?, read_private_key(key)?))
}

fn read_crls(source: &DataSource) -> Result<Vec<CertificateRevocationListDer<'static>>, ProviderError> {
    let pem = source.to_bytes_blocking()?;
    let crls = crls(&mut pem.as_slice()).collect::<Result<Vec<_>, _>>().map_err(ProviderError::Pem)?;
    if crls.is_empty() {
        return Err(ProviderError::NoPemItem("certificate revocation list"));
    }
    Ok(crls)
}

/// Peer checks beyond chain and revocation verification, which the webpki
/// verifiers don't perform.
fn unsupported_check(validation: &CertificateValidationContext) -> Option<&'static str> {
    if !validation.verify_certificate_hash.is_empty() {
        Some("verify_certificate_hash")
    } else if !validation.verify_certificate_spki.is_empty() {
        Some("verify_certificate_spki")
    } else if !validation.match_subject_alt_names.is_empty() {
        Some("match_subject_alt_names")
    } else if !validation.match_typed_subject_alt_names.is_empty() {
        Some("match_typed_subject_alt_names")
    } else if validation.allow_expired_certificate {
        Some("allow_expired_certificate")
    } else {
        None
    }
}

struct PeerValidation {
    roots: Arc<RootCertStore>,
    crls: Vec<CertificateRevocationListDer<'static>>,
}

fn peer_validation(common: &CommonTlsContext) -> Result<Option<PeerValidation>, ProviderError> {
    let Some(CommonTlsValidationContext::ValidationContext(validation)) = &common.validation_context else {
        return Ok(None);
    };
    if let Some(check) = unsupported_check(validation) {
        return Err(ProviderError::UnsupportedValidation(check));
    }
    let Some(ca) = &validation.trusted_ca else {
        return match validation.crl {
            Some(_) => Err(ProviderError::MissingTrustedCa),
            None => Ok(None),
        };
    };
    let mut store = RootCertStore::empty();
    let (good, bad) = store.add_parsable_certificates(read_certificates(ca)?);
    debug!("added {good} trusted CA certificates, rejected {bad}");
    if bad > 0 {
        return Err(ProviderError::InvalidTrustedCa(bad));
    }
    let crls = validation.crl.as_ref().map(read_crls).transpose()?.unwrap_or_default();
    Ok(Some(PeerValidation { roots: Arc::new(store), crls }))
}

fn alpn_protocols(common: &CommonTlsContext) -> Vec<Vec<u8>> {
    common.alpn_protocols.iter().map(|protocol| protocol.as_bytes().to_vec()).collect()
}

fn build_server_config(ctx: &DownstreamTlsContext) -> Result<ServerConfig, ProviderError> {
    let common = &ctx.common_tls_context;
    check_no_sds_secrets(common)?;
    let (certs, key) = match common.tls_certificates.as_slice() {
        [] => return Err(ProviderError::NoCertificate),
        [certificate] => read_certified_key(certificate)?,
        many => return Err(ProviderError::TooManyCertificates(many.len())),
    };
    let provider = crypto_provider(&common.tls_params)?;
    let versions = protocol_versions(&common.tls_params);
    debug!("DownstreamTlsContext: selected TLS versions {versions:?}");
    let builder = ServerConfig::builder_with_provider(Arc::clone(&provider)).with_protocol_versions(&versions)?;
    let builder = match (ctx.require_client_certificate, peer_validation(common)?) {
        (true, None) => return Err(ProviderError::MissingTrustedCa),
        (true, Some(PeerValidation { roots, crls })) => builder.with_client_cert_verifier(
            WebPkiClientVerifier::builder_with_provider(roots, provider).with_crls(crls).build()?,
        ),
        (false, Some(PeerValidation { roots, crls })) => builder.with_client_cert_verifier(
            WebPkiClientVerifier::builder_with_provider(roots, provider).with_crls(crls).allow_unauthenticated().build()?,
        ),
        (false, None) => builder.with_no_client_auth(),
    };
    let mut config = builder.with_single_cert(certs, key)?;
    config.alpn_protocols = alpn_protocols(common);
    Ok(config)
}

fn build_client_config(ctx: &UpstreamTlsContext) -> Result<ClientConfig, ProviderError> {
    let common = &ctx.common_tls_context;
    check_no_sds_secrets(common)?;
    if ctx.allow_renegotiation {
        debug!("UpstreamTlsContext: renegotiation is not supported, ignoring allow_renegotiation");
    }
    let PeerValidation { roots, crls } = peer_validation(common)?.ok_or(ProviderError::MissingTrustedCa)?;
    let provider = crypto_provider(&common.tls_params)?;
    let verifier = WebPkiServerVerifier::builder_with_provider(roots, Arc::clone(&provider)).with_crls(crls).build()?;
    let versions = protocol_versions(&common.tls_params);
    debug!("UpstreamTlsContext: selected TLS versions {versions:?}");
    let builder =
        ClientConfig::builder_with_provider(provider).with_protocol_versions(&versions)?.with_webpki_verifier(verifier);
    let mut config = match common.tls_certificates.as_slice() {
        [] => builder.with_no_client_auth(),
        [certificate] => {
            let (certs, key) = read_certified_key(certificate)?;
            builder.with_client_auth_cert(certs, key)?
        },
        many => return Err(ProviderError::TooManyCertificates(many.len())),
    };
    config.alpn_protocols = alpn_protocols(common);
    Ok(config)
}
