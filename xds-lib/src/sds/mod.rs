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

pub mod reference_counting_map;
pub mod ssl_context_provider;
pub mod ssl_context_provider_supplier;
pub mod tls_context_manager;

pub use reference_counting_map::{Closeable, FindOrCreateError, ReferenceCountingMap, ReleaseError, ValueFactory};
pub use ssl_context_provider::{ProviderError, RustlsConfig, RustlsSslContextProvider, SslContextProvider};
pub use ssl_context_provider_supplier::SslContextProviderSupplier;
pub use tls_context_manager::{ProviderFactory, TlsContextManager, TlsContextManagerImpl};

#[derive(Debug, thiserror::Error)]
pub enum SdsError {
    #[error("can't get SSL context provider")]
    Provider(#[from] FindOrCreateError<ProviderError>),
    #[error("can't release SSL context provider")]
    Release(#[from] ReleaseError),
    #[error("expected a provider for the {expected} side but got one for the {found} side")]
    WrongRole { expected: &'static str, found: &'static str },
    #[error("SSL context provider supplier is shut down")]
    SupplierShutdown,
}
