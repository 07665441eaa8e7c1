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

use crate::{Error, Result};
use std::{fmt::Display, io::Write, sync::Arc};
use tracing::{debug, info, warn};
use xds_configuration::config::ListenerSource;
use xds_data_plane_api::{decode::decode_message, envoy::config::listener::v3::Listener as EnvoyListener};
use xds_lib::{Listener, TlsContextManager, TlsContextManagerImpl};

/// What one inspection run saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub listeners: usize,
    pub filter_chains: usize,
    pub tls_filter_chains: usize,
    pub acquired: usize,
    pub failed: usize,
    /// Distinct providers live while every filter chain held its share.
    pub shared_providers: usize,
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} listeners, {} filter chains ({} with TLS), {} providers acquired, {} failed, {} distinct providers",
            self.listeners, self.filter_chains, self.tls_filter_chains, self.acquired, self.failed, self.shared_providers
        )
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub fn load_listener(source: &ListenerSource) -> Result<EnvoyListener> {
    let bytes = std::fs::read(&source.path).map_err(|e| Error::Read(source.path.clone(), e))?;
    decode_message(bytes.as_slice(), source.length_delimited).map_err(|e| Error::Decode(source.path.clone(), e))
}

/// Converts every listener against one shared manager, optionally acquires
/// each TLS filter chain's provider and writes the converted model as YAML to
/// `dump`. All providers are released before returning.
pub fn inspect<W: Write>(sources: &[ListenerSource], acquire: bool, dump: Option<&mut W>) -> Result<Report> {
    let manager = Arc::new(TlsContextManagerImpl::new());
    let shared: Arc<dyn TlsContextManager> = manager.clone();

    let listeners = sources
        .iter()
        .map(|source| -> Result<Listener> {
            let envoy = load_listener(source)?;
            let listener =
                Listener::from_envoy_listener(envoy, &shared).map_err(|e| Error::Conversion(source.path.clone(), e))?;
            info!("loaded listener \"{}\" on {} from {}", listener.name(), listener.address(), source.path.display());
            Ok(listener)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut report = Report { listeners: listeners.len(), ..Default::default() };
    for listener in &listeners {
        for chain in listener.all_filter_chains() {
            report.filter_chains += 1;
            let supplier = chain.ssl_context_provider_supplier();
            if supplier.is_plaintext() {
                continue;
            }
            report.tls_filter_chains += 1;
            if !acquire {
                continue;
            }
            match supplier.ssl_context_provider() {
                Ok(_) => {
                    debug!("listener \"{}\" filter chain \"{}\": provider acquired", listener.name(), chain.name());
                    report.acquired += 1;
                },
                Err(e) => {
                    warn!("listener \"{}\" filter chain \"{}\": {}", listener.name(), chain.name(), error_chain(&e));
                    report.failed += 1;
                },
            }
        }
    }
    report.shared_providers = manager.server_provider_count() + manager.client_provider_count();

    if let Some(out) = dump {
        let yaml = serde_yaml::to_string(&listeners).map_err(Error::Dump)?;
        out.write_all(yaml.as_bytes()).map_err(Error::Output)?;
    }

    drop(listeners);
    debug!("{} providers left after release", manager.server_provider_count() + manager.client_provider_count());
    Ok(report)
}
