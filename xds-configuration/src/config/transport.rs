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
    common::is_default,
    core::{DataSource, EncodedMessage},
};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// TLS configuration for the accepting side of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownstreamTlsContext {
    #[serde(skip_serializing_if = "is_default", default)]
    pub common_tls_context: CommonTlsContext,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub require_client_certificate: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub require_sni: bool,
}

/// TLS configuration for the originating side of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpstreamTlsContext {
    #[serde(skip_serializing_if = "is_default", default)]
    pub common_tls_context: CommonTlsContext,
    #[serde(skip_serializing_if = "CompactString::is_empty", default)]
    pub sni: CompactString,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub allow_renegotiation: bool,
}

/// Either side of a TLS configuration. Two values are the same configuration
/// exactly when they compare equal, which is what keys provider caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsContext {
    Downstream(DownstreamTlsContext),
    Upstream(UpstreamTlsContext),
}

impl TlsContext {
    pub fn as_downstream(&self) -> Option<&DownstreamTlsContext> {
        match self {
            Self::Downstream(ctx) => Some(ctx),
            Self::Upstream(_) => None,
        }
    }

    pub fn as_upstream(&self) -> Option<&UpstreamTlsContext> {
        match self {
            Self::Upstream(ctx) => Some(ctx),
            Self::Downstream(_) => None,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::Downstream(_) => "downstream",
            Self::Upstream(_) => "upstream",
        }
    }
}

impl From<DownstreamTlsContext> for TlsContext {
    fn from(value: DownstreamTlsContext) -> Self {
        Self::Downstream(value)
    }
}

impl From<UpstreamTlsContext> for TlsContext {
    fn from(value: UpstreamTlsContext) -> Self {
        Self::Upstream(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommonTlsContext {
    #[serde(skip_serializing_if = "is_default", default)]
    pub tls_params: TlsParameters,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tls_certificates: Vec<TlsCertificate>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tls_certificate_sds_secret_configs: Vec<SdsSecretConfig>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub validation_context: Option<CommonTlsValidationContext>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alpn_protocols: Vec<CompactString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlsParameters {
    pub minimum_protocol_version: TlsVersion,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub maximum_protocol_version: Option<TlsVersion>,
    /// OpenSSL style names, `[A|B]` groups allowed. Empty means the provider's defaults.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub cipher_suites: Vec<CompactString>,
}

impl Default for TlsParameters {
    fn default() -> Self {
        Self { minimum_protocol_version: TlsVersion::TLSv1_2, maximum_protocol_version: None, cipher_suites: Vec::new() }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    TLSv1_2,
    TLSv1_3,
}

impl TlsParameters {
    pub fn supported_version(&self) -> &'static [TlsVersion] {
        match (self.minimum_protocol_version, self.maximum_protocol_version) {
            (TlsVersion::TLSv1_3, _) => &[TlsVersion::TLSv1_3],
            (TlsVersion::TLSv1_2, None | Some(TlsVersion::TLSv1_3)) => &[TlsVersion::TLSv1_2, TlsVersion::TLSv1_3],
            (TlsVersion::TLSv1_2, Some(TlsVersion::TLSv1_2)) => &[TlsVersion::TLSv1_2],
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlsCertificate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub certificate_chain: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub private_key: Option<DataSource>,
}

impl Debug for TlsCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsCertificate")
            .field("certificate_chain", &self.certificate_chain)
            .field(
                "private_key",
                match &self.private_key {
                    Some(DataSource::Path(p)) => p,
                    Some(DataSource::EnvironmentVariable(env)) => env,
                    Some(DataSource::InlineBytes(_) | DataSource::InlineString(_)) => &"[censored]",
                    None => &"None",
                },
            )
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SdsSecretConfig {
    pub name: CompactString,
    /// Where the secret is fetched from. Two configurations naming the same
    /// secret from different sources are different secrets.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sds_config: Option<EncodedMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommonTlsValidationContext {
    #[serde(rename = "validation_context_sds")]
    SdsConfig(SdsSecretConfig),
    ValidationContext(CertificateValidationContext),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertificateValidationContext {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trusted_ca: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub crl: Option<DataSource>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub verify_certificate_hash: Vec<CompactString>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub verify_certificate_spki: Vec<CompactString>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub allow_expired_certificate: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub match_subject_alt_names: Vec<EncodedMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub match_typed_subject_alt_names: Vec<EncodedMessage>,
}

pub use envoy_conversions::downstream_tls_context_from_transport_socket;

mod envoy_conversions {
    use super::{
        CertificateValidationContext, CommonTlsContext, CommonTlsValidationContext, DownstreamTlsContext,
        SdsSecretConfig, TlsCertificate, TlsParameters, TlsVersion, UpstreamTlsContext,
    };
    use crate::config::{
        common::{GenericError, WithNodeOnResult},
        core::{DataSource, EncodedMessage},
    };
    use compact_str::CompactString;
    use tracing::{debug, warn};
    use xds_data_plane_api::{
        decode::{decode_any_type, is_any_of},
        envoy::{
            config::core::v3::{transport_socket::ConfigType, TransportSocket as EnvoyTransportSocket},
            extensions::transport_sockets::tls::v3::{
                common_tls_context::ValidationContextType as EnvoyValidationContextType,
                tls_parameters::TlsProtocol as EnvoyTlsProtocol,
                CertificateValidationContext as EnvoyCertificateValidationContext,
                CommonTlsContext as EnvoyCommonTlsContext, DownstreamTlsContext as EnvoyDownstreamTlsContext,
                SdsSecretConfig as EnvoySdsSecretConfig, TlsCertificate as EnvoyTlsCertificate,
                TlsParameters as EnvoyTlsParameters, UpstreamTlsContext as EnvoyUpstreamTlsContext,
            },
        },
    };

    /// Extracts the downstream TLS context carried by a filter chain's transport
    /// socket. A missing socket or a socket of any other type means plaintext;
    /// only a `DownstreamTlsContext` payload that fails to decode is an error.
    pub fn downstream_tls_context_from_transport_socket(
        transport_socket: Option<EnvoyTransportSocket>,
    ) -> Result<Option<DownstreamTlsContext>, GenericError> {
        let Some(EnvoyTransportSocket { name, config_type }) = transport_socket else {
            return Ok(None);
        };
        let Some(ConfigType::TypedConfig(any)) = config_type else {
            debug!("transport socket \"{name}\" has no typed config, treating it as plaintext");
            return Ok(None);
        };
        if !is_any_of::<EnvoyDownstreamTlsContext>(&any) {
            debug!("transport socket \"{name}\" has unsupported type \"{}\", treating it as plaintext", any.type_url);
            return Ok(None);
        }
        decode_any_type::<EnvoyDownstreamTlsContext>(&any, "DownstreamTlsContext")
            .map(|envoy| Some(DownstreamTlsContext::from(envoy)))
            .map_err(|e| GenericError::from_msg_with_cause(format!("failed to parse protobuf for \"{}\"", any.type_url), e))
            .with_node("typed_config")
    }

    impl From<EnvoyDownstreamTlsContext> for DownstreamTlsContext {
        fn from(envoy: EnvoyDownstreamTlsContext) -> Self {
            let EnvoyDownstreamTlsContext { common_tls_context, require_client_certificate, require_sni } = envoy;
            Self {
                common_tls_context: common_tls_context.map(CommonTlsContext::from).unwrap_or_default(),
                require_client_certificate: require_client_certificate.unwrap_or(false),
                require_sni: require_sni.unwrap_or(false),
            }
        }
    }

    impl From<EnvoyUpstreamTlsContext> for UpstreamTlsContext {
        fn from(envoy: EnvoyUpstreamTlsContext) -> Self {
            let EnvoyUpstreamTlsContext { common_tls_context, sni, allow_renegotiation } = envoy;
            Self {
                common_tls_context: common_tls_context.map(CommonTlsContext::from).unwrap_or_default(),
                sni: sni.into(),
                allow_renegotiation,
            }
        }
    }

    impl From<EnvoyCommonTlsContext> for CommonTlsContext {
        fn from(envoy: EnvoyCommonTlsContext) -> Self {
            let EnvoyCommonTlsContext {
                tls_params,
                tls_certificates,
                tls_certificate_sds_secret_configs,
                alpn_protocols,
                validation_context_type,
            } = envoy;
            Self {
                tls_params: tls_params.map(TlsParameters::from).unwrap_or_default(),
                tls_certificates: tls_certificates.into_iter().map(TlsCertificate::from).collect(),
                tls_certificate_sds_secret_configs: tls_certificate_sds_secret_configs
                    .into_iter()
                    .map(SdsSecretConfig::from)
                    .collect(),
                validation_context: validation_context_type.map(CommonTlsValidationContext::from),
                alpn_protocols: alpn_protocols.into_iter().map(CompactString::from).collect(),
            }
        }
    }

    impl From<EnvoyTlsParameters> for TlsParameters {
        fn from(envoy: EnvoyTlsParameters) -> Self {
            let cipher_suites = envoy.cipher_suites.iter().map(CompactString::from).collect();
            // TLS 1.0 and 1.1 are not offered, a request for them is raised to 1.2
            let minimum_protocol_version = match envoy.tls_minimum_protocol_version() {
                EnvoyTlsProtocol::TlSv13 => TlsVersion::TLSv1_3,
                EnvoyTlsProtocol::TlsAuto
                | EnvoyTlsProtocol::TlSv10
                | EnvoyTlsProtocol::TlSv11
                | EnvoyTlsProtocol::TlSv12 => TlsVersion::TLSv1_2,
            };
            let maximum_protocol_version = match envoy.tls_maximum_protocol_version() {
                EnvoyTlsProtocol::TlsAuto => None,
                EnvoyTlsProtocol::TlSv13 => Some(TlsVersion::TLSv1_3),
                EnvoyTlsProtocol::TlSv10 | EnvoyTlsProtocol::TlSv11 | EnvoyTlsProtocol::TlSv12 => {
                    Some(TlsVersion::TLSv1_2)
                },
            };
            let maximum_protocol_version = match maximum_protocol_version {
                Some(max) if max < minimum_protocol_version => {
                    warn!("maximum TLS version {max:?} is older than the minimum {minimum_protocol_version:?}, ignoring it");
                    None
                },
                other => other,
            };
            Self { minimum_protocol_version, maximum_protocol_version, cipher_suites }
        }
    }

    impl From<EnvoyTlsCertificate> for TlsCertificate {
        fn from(envoy: EnvoyTlsCertificate) -> Self {
            let EnvoyTlsCertificate { certificate_chain, private_key } = envoy;
            Self {
                certificate_chain: certificate_chain.and_then(DataSource::from_envoy),
                private_key: private_key.and_then(DataSource::from_envoy),
            }
        }
    }

    impl From<EnvoySdsSecretConfig> for SdsSecretConfig {
        fn from(envoy: EnvoySdsSecretConfig) -> Self {
            let EnvoySdsSecretConfig { name, sds_config } = envoy;
            Self { name: name.into(), sds_config: sds_config.map(EncodedMessage) }
        }
    }

    impl From<EnvoyCertificateValidationContext> for CertificateValidationContext {
        fn from(envoy: EnvoyCertificateValidationContext) -> Self {
            let EnvoyCertificateValidationContext {
                trusted_ca,
                verify_certificate_hash,
                verify_certificate_spki,
                crl,
                allow_expired_certificate,
                match_subject_alt_names,
                match_typed_subject_alt_names,
            } = envoy;
            Self {
                trusted_ca: trusted_ca.and_then(DataSource::from_envoy),
                crl: crl.and_then(DataSource::from_envoy),
                verify_certificate_hash: verify_certificate_hash.into_iter().map(CompactString::from).collect(),
                verify_certificate_spki: verify_certificate_spki.into_iter().map(CompactString::from).collect(),
                allow_expired_certificate,
                match_subject_alt_names: match_subject_alt_names.into_iter().map(EncodedMessage).collect(),
                match_typed_subject_alt_names: match_typed_subject_alt_names.into_iter().map(EncodedMessage).collect(),
            }
        }
    }

    impl From<EnvoyValidationContextType> for CommonTlsValidationContext {
        fn from(envoy: EnvoyValidationContextType) -> Self {
            match envoy {
                EnvoyValidationContextType::ValidationContext(context) => Self::ValidationContext(context.into()),
                EnvoyValidationContextType::ValidationContextSdsSecretConfig(sds) => Self::SdsConfig(sds.into()),
            }
        }
    }
}
