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

//! Subset of `envoy.extensions.transport_sockets.tls.v3` carried inside a
//! `TransportSocket`'s typed config.

use crate::envoy::config::core::v3::DataSource;

const PACKAGE: &str = "envoy.extensions.transport_sockets.tls.v3";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DownstreamTlsContext {
    #[prost(message, optional, tag = "1")]
    pub common_tls_context: ::core::option::Option<CommonTlsContext>,
    #[prost(message, optional, tag = "2")]
    pub require_client_certificate: ::core::option::Option<bool>,
    #[prost(message, optional, tag = "3")]
    pub require_sni: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpstreamTlsContext {
    #[prost(message, optional, tag = "1")]
    pub common_tls_context: ::core::option::Option<CommonTlsContext>,
    #[prost(string, tag = "2")]
    pub sni: ::prost::alloc::string::String,
    #[prost(bool, tag = "3")]
    pub allow_renegotiation: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommonTlsContext {
    #[prost(message, optional, tag = "1")]
    pub tls_params: ::core::option::Option<TlsParameters>,
    #[prost(message, repeated, tag = "2")]
    pub tls_certificates: ::prost::alloc::vec::Vec<TlsCertificate>,
    #[prost(message, repeated, tag = "6")]
    pub tls_certificate_sds_secret_configs: ::prost::alloc::vec::Vec<SdsSecretConfig>,
    #[prost(string, repeated, tag = "4")]
    pub alpn_protocols: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(oneof = "common_tls_context::ValidationContextType", tags = "3, 7")]
    pub validation_context_type: ::core::option::Option<common_tls_context::ValidationContextType>,
}

pub mod common_tls_context {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ValidationContextType {
        #[prost(message, tag = "3")]
        ValidationContext(super::CertificateValidationContext),
        #[prost(message, tag = "7")]
        ValidationContextSdsSecretConfig(super::SdsSecretConfig),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TlsParameters {
    #[prost(enumeration = "tls_parameters::TlsProtocol", tag = "1")]
    pub tls_minimum_protocol_version: i32,
    #[prost(enumeration = "tls_parameters::TlsProtocol", tag = "2")]
    pub tls_maximum_protocol_version: i32,
    #[prost(string, repeated, tag = "3")]
    pub cipher_suites: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

pub mod tls_parameters {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum TlsProtocol {
        TlsAuto = 0,
        TlSv10 = 1,
        TlSv11 = 2,
        TlSv12 = 3,
        TlSv13 = 4,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TlsCertificate {
    #[prost(message, optional, tag = "1")]
    pub certificate_chain: ::core::option::Option<DataSource>,
    #[prost(message, optional, tag = "2")]
    pub private_key: ::core::option::Option<DataSource>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SdsSecretConfig {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Encoded `envoy.config.core.v3.ConfigSource`.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub sds_config: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CertificateValidationContext {
    #[prost(message, optional, tag = "1")]
    pub trusted_ca: ::core::option::Option<DataSource>,
    #[prost(string, repeated, tag = "2")]
    pub verify_certificate_hash: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "3")]
    pub verify_certificate_spki: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "7")]
    pub crl: ::core::option::Option<DataSource>,
    #[prost(bool, tag = "8")]
    pub allow_expired_certificate: bool,
    /// Encoded `envoy.type.matcher.v3.StringMatcher`s.
    #[prost(bytes = "vec", repeated, tag = "9")]
    pub match_subject_alt_names: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    /// Encoded `SubjectAltNameMatcher`s.
    #[prost(bytes = "vec", repeated, tag = "15")]
    pub match_typed_subject_alt_names: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

impl_name!(PACKAGE; 
    DownstreamTlsContext,
    UpstreamTlsContext,
    CommonTlsContext,
    TlsParameters,
    TlsCertificate,
    SdsSecretConfig,
    CertificateValidationContext
);
