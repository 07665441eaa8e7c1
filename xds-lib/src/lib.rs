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

pub mod listeners;
pub mod sds;

use std::sync::Arc;

pub use listeners::{filter_chain::FilterChain, listener::Listener};
pub use sds::{
    Closeable, ReferenceCountingMap, SdsError, SslContextProvider, SslContextProviderSupplier, TlsContextManager,
    TlsContextManagerImpl,
};
pub use xds_configuration::config::GenericError;

pub type Result<T> = ::core::result::Result<T, GenericError>;

/// A wire object paired with the manager its TLS contexts are bound to.
pub struct ConversionContext<'a, T> {
    envoy_object: T,
    tls_context_manager: &'a Arc<dyn TlsContextManager>,
}

impl<'a, T> ConversionContext<'a, T> {
    pub fn new(ctx: (T, &'a Arc<dyn TlsContextManager>)) -> Self {
        Self { envoy_object: ctx.0, tls_context_manager: ctx.1 }
    }
}
