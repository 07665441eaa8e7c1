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

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, clap::Args)]
#[group(required = true, multiple = true)]
pub struct ConfigFiles {
    #[arg(help = "Configuration file", short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[arg(help = "Protobuf-encoded Listener file, may be repeated", short = 'l', long = "listener")]
    pub listeners: Vec<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct Options {
    #[clap(flatten)]
    pub config_files: ConfigFiles,
    #[arg(help = "Acquire the TLS context provider of every filter chain", long = "acquire")]
    pub acquire: bool,
    #[arg(help = "Print the converted listeners as YAML", long = "dump")]
    pub dump: bool,
}

impl Options {
    pub fn parse_options() -> Self {
        Options::parse()
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_files: ConfigFiles { config: Some(path.into()), listeners: Vec::new() },
            acquire: false,
            dump: false,
        }
    }

    pub fn from_listeners<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            config_files: ConfigFiles { config: None, listeners: paths.into_iter().map(Into::into).collect() },
            acquire: false,
            dump: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Options;
    use clap::Parser;

    #[test]
    fn parses_flags() {
        let opt = Options::try_parse_from(["xds-inspect", "-l", "a.pb", "--listener", "b.pb", "--acquire"]).unwrap();
        assert_eq!(opt.config_files.listeners.len(), 2);
        assert!(opt.acquire);
        assert!(!opt.dump);
        assert!(opt.config_files.config.is_none());
    }

    #[test]
    fn needs_a_config_or_a_listener() {
        assert!(Options::try_parse_from(["xds-inspect", "--dump"]).is_err());
        assert!(Options::try_parse_from(["xds-inspect", "-c", "inspect.yaml"]).is_ok());
    }
}
