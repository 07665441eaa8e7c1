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

//! Hand-maintained prost bindings for the parts of the Envoy v3 data plane API
//! that describe listeners, filter chains and TLS transport sockets.
//!
//! Field tags and enum values follow the upstream `.proto` definitions, so
//! payloads produced by a control plane decode unchanged.

pub use prost;
pub use prost_types;

pub mod decode;

const TYPE_URL_PREFIX: &str = "type.googleapis.com";

pub(crate) fn type_url(full_name: &str) -> String {
    format!("{TYPE_URL_PREFIX}/{full_name}")
}

macro_rules! impl_name {
    ($package:ident; $($ty:ident),+ $(,)?) => {
        $(
            impl ::prost::Name for $ty {
                const NAME: &'static str = stringify!($ty);
                const PACKAGE: &'static str = $package;

                fn type_url() -> ::prost::alloc::string::String {
                    crate::type_url(&<Self as ::prost::Name>::full_name())
                }
            }
        )+
    };
}

pub mod envoy;

pub mod google {
    pub mod protobuf {
        pub use prost_types::Any;
    }
}
