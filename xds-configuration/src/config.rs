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

pub mod common;
pub mod core;
pub mod listener;
pub mod log;
pub use log::LogConfig;
pub mod transport;

pub use crate::config::common::*;
use crate::options::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};

pub type Result<T> = ::core::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to open \"{0}\"")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to deserialize \"{file}\" at \"{field}\"")]
    Deserialize {
        file: PathBuf,
        field: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("no listener file specified, use a config file or --listener")]
    NoListeners,
}

/// A protobuf-encoded `Listener` on disk.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListenerSource {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub length_delimited: bool,
}

impl ListenerSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), length_delimited: false }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct Config {
    #[serde(skip_serializing_if = "is_default", default)]
    pub logging: LogConfig,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub listeners: Vec<ListenerSource>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub acquire_providers: bool,
}

impl Config {
    fn apply_options(mut self, opt: &Options) -> Result<Self> {
        self.listeners.extend(opt.config_files.listeners.iter().map(ListenerSource::new));
        self.acquire_providers |= opt.acquire;
        if self.listeners.is_empty() {
            return Err(ConfigError::NoListeners);
        }
        Ok(self)
    }

    pub fn new(opt: &Options) -> Result<Self> {
        let config = match &opt.config_files.config {
            Some(path) => deserialize_yaml(path)?,
            None => Self::default(),
        };
        config.apply_options(opt)
    }
}

pub fn deserialize_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
    serde_path_to_error::deserialize(serde_yaml::Deserializer::from_reader(&file)).map_err(|e| {
        ConfigError::Deserialize { file: path.to_owned(), field: e.path().to_string(), source: e.into_inner() }
    })
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError, ListenerSource};
    use crate::options::Options;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn full_config() {
        let file = write_config(
            r#"
logging:
  log_level: info
  log_directory: /var/log/xds
  log_file: inspect.log
listeners:
  - path: conf/listener-8000.pb
    length_delimited: true
acquire_providers: true
"#,
        );
        let config = Config::new(&Options::from_path(file.path())).unwrap();
        assert_eq!(config.logging.log_file.as_deref(), Some("inspect.log"));
        assert_eq!(config.listeners, [ListenerSource { path: "conf/listener-8000.pb".into(), length_delimited: true }]);
        assert!(config.acquire_providers);
    }

    #[test]
    fn command_line_listeners_are_appended() {
        let file = write_config("listeners:\n  - path: a.pb\n");
        let mut options = Options::from_path(file.path());
        options.config_files.listeners.push("b.pb".into());
        options.acquire = true;
        let config = Config::new(&options).unwrap();
        assert_eq!(config.listeners, [ListenerSource::new("a.pb"), ListenerSource::new("b.pb")]);
        assert!(config.acquire_providers);
    }

    #[test]
    fn listeners_only_from_command_line() {
        let config = Config::new(&Options::from_listeners(["listener.pb"])).unwrap();
        assert_eq!(config.listeners, [ListenerSource::new("listener.pb")]);
        assert_eq!(config.logging, Default::default());
    }

    #[test]
    fn no_listeners_at_all() {
        let file = write_config("acquire_providers: true\n");
        assert!(matches!(Config::new(&Options::from_path(file.path())), Err(ConfigError::NoListeners)));
    }

    #[test]
    fn deserialize_error_names_the_field() {
        let file = write_config("listeners:\n  - path: a.pb\n    length_delimited: maybe\n");
        let err = Config::new(&Options::from_path(file.path())).unwrap_err();
        let ConfigError::Deserialize { field, .. } = err else { panic!("unexpected error {err:?}") };
        assert_eq!(field, "listeners[0].length_delimited");
    }

    #[test]
    fn missing_file() {
        let err = Config::new(&Options::from_path("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
