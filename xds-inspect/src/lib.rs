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

mod inspect;

pub use inspect::{inspect, load_listener, Report};

use std::path::PathBuf;
use xds_configuration::{config::Config, options::Options};

pub type Result<T> = ::core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] xds_configuration::ConfigError),
    #[error("failed to read listener file \"{0}\"")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to decode listener file \"{0}\"")]
    Decode(PathBuf, #[source] xds_data_plane_api::prost::DecodeError),
    #[error("failed to convert listener from \"{0}\"")]
    Conversion(PathBuf, #[source] xds_lib::GenericError),
    #[error("failed to dump listeners")]
    Dump(#[source] serde_yaml::Error),
    #[error("failed to write output")]
    Output(#[source] std::io::Error),
    #[error("failed to reconfigure logging")]
    Tracing(#[from] tracing_subscriber::reload::Error),
}

pub fn run() -> Result<()> {
    let mut tracing_manager = inspect_tracing::TracingManager::new();

    let options = Options::parse_options();
    let Config { logging, listeners, acquire_providers } = Config::new(&options)?;

    tracing_manager.update(logging)?;

    let report = inspect(&listeners, acquire_providers, options.dump.then(std::io::stdout).as_mut())?;
    tracing::info!("{report}");
    Ok(())
}

mod inspect_tracing {
    use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
    use tracing_subscriber::{
        fmt,
        fmt::format::{DefaultFields, Format},
        layer::Layered,
        reload,
        reload::Handle,
        EnvFilter, Registry,
    };

    use crate::Result;
    use xds_configuration::config::LogConfig as LogConf;

    type RegistryLayer =
        fmt::Layer<Layered<reload::Layer<EnvFilter, Registry>, Registry>, DefaultFields, Format, NonBlocking>;
    type FilterReloadHandle = Handle<EnvFilter, Registry>;
    type LayerReloadHandle = Handle<RegistryLayer, Layered<reload::Layer<EnvFilter, Registry>, Registry>>;

    pub struct TracingManager {
        guard: WorkerGuard,
        layer_reload_handle: LayerReloadHandle,
        filter_reload_handle: FilterReloadHandle,
    }

    impl TracingManager {
        pub fn new() -> Self {
            let level = EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .parse_lossy("");
            let (guard, layer_reload_handle, filter_reload_handle) = Self::init_tracing(Registry::default(), level);
            TracingManager { guard, filter_reload_handle, layer_reload_handle }
        }

        pub fn update(&mut self, log_conf: LogConf) -> Result<()> {
            // RUST_LOG wins over the configured level
            self.filter_reload_handle.modify(|filter| {
                *filter = EnvFilter::try_from_default_env().ok().or(log_conf.log_level).unwrap_or_else(|| {
                    EnvFilter::builder()
                        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                        .parse_lossy("")
                });
            })?;

            if let Some(log_file) = log_conf.log_file {
                self.layer_reload_handle.modify(|layer| {
                    let (new_guard, new_layer) = Self::file_layer(&log_file, log_conf.log_directory.as_deref());
                    *layer = new_layer;
                    self.guard = new_guard;
                })?;
            }

            Ok(())
        }

        fn init_tracing(
            registry: Registry,
            log_level: EnvFilter,
        ) -> (WorkerGuard, LayerReloadHandle, FilterReloadHandle) {
            use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

            let env_filter = EnvFilter::try_from_default_env().unwrap_or(log_level);

            // stdout until the configuration names a log file
            let (guard, layer) = Self::stdout_layer();
            let (layer, layer_reload_handle) = reload::Layer::new(layer);
            let (env_filter, filter_reload_handle) = reload::Layer::new(env_filter);

            registry.with(env_filter).with(layer).init();
            (guard, layer_reload_handle, filter_reload_handle)
        }

        fn stdout_layer() -> (WorkerGuard, RegistryLayer) {
            let out = std::io::stdout();
            let is_terminal = std::io::IsTerminal::is_terminal(&out);
            let (non_blocking, guard) = tracing_appender::non_blocking(out);
            let mut std_layer = fmt::layer().with_writer(non_blocking).with_thread_names(true);

            if !is_terminal {
                std_layer = std_layer.with_ansi(false);
            }

            (guard, std_layer)
        }

        fn file_layer(filename: &str, log_directory: Option<&str>) -> (WorkerGuard, RegistryLayer) {
            let file_appender = tracing_appender::rolling::hourly(log_directory.unwrap_or("."), filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking).with_thread_names(true);

            (guard, file_layer)
        }
    }
}
