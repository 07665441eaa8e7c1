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

use crate::{
    google::protobuf::Any,
    prost::{bytes::Buf, DecodeError, Message, Name},
};

#[derive(Debug, thiserror::Error)]
pub enum DecodeAnyError {
    #[error("expected type url \"{expected}\" but found \"{found}\"")]
    TypeUrlMismatch { expected: String, found: String },
    #[error("failed to decode protobuf extension type ({0})")]
    ProtobufError(&'static str, #[source] DecodeError),
}

/// Returns `true` if `any` carries a payload of type `T`.
pub fn is_any_of<T: Name>(any: &Any) -> bool {
    any.type_url == T::type_url()
}

/// Decode payload from Any type into a generic return type.
///
/// - err_desc is used in the returned error message.
///
/// `.type_url` is not checked, it is up to the caller to verify it
/// matches the output type (see [`unpack_any`] for the checked variant).
pub fn decode_any_type<R>(any: &Any, err_desc: &'static str) -> Result<R, DecodeAnyError>
where
    R: Message + Default,
{
    R::decode(any.value.as_slice()).map_err(|e| DecodeAnyError::ProtobufError(err_desc, e))
}

pub fn unpack_any<R>(any: &Any) -> Result<R, DecodeAnyError>
where
    R: Message + Name + Default,
{
    if !is_any_of::<R>(any) {
        return Err(DecodeAnyError::TypeUrlMismatch { expected: R::type_url(), found: any.type_url.clone() });
    }
    decode_any_type(any, R::NAME)
}

pub fn pack_any<T: Message + Name>(message: &T) -> Any {
    Any { type_url: T::type_url(), value: message.encode_to_vec() }
}

/// Decode a message that was written either as a bare protobuf payload or
/// with a varint length prefix (as produced by `encode_length_delimited`).
pub fn decode_message<T, B>(buf: B, length_delimited: bool) -> Result<T, DecodeError>
where
    T: Message + Default,
    B: Buf,
{
    if length_delimited {
        T::decode_length_delimited(buf)
    } else {
        T::decode(buf)
    }
}
