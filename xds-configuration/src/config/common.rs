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

use std::{
    borrow::Cow,
    error::Error,
    fmt::{Debug, Display},
};

pub(crate) fn is_default<T: PartialEq + Default>(value: &T) -> bool {
    *value == T::default()
}

enum TraceNode {
    Field(Cow<'static, str>),
    Index(usize),
}

impl Display for TraceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceNode::Field(field) => f.write_str(field),
            TraceNode::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Path from the outermost message to the field that failed, pushed
/// innermost-first while the error bubbles up.
pub struct FieldTrace {
    vec: Vec<TraceNode>,
}

impl Display for FieldTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut nodes = self.vec.iter().rev();
        if let Some(first) = nodes.next() {
            Display::fmt(first, f)?;
        }
        for node in nodes {
            match node {
                TraceNode::Field(_) => f.write_str(" / ")?,
                TraceNode::Index(_) => f.write_str(" ")?,
            }
            Display::fmt(node, f)?;
        }
        Ok(())
    }
}

impl Debug for FieldTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GenericError {
    #[error("Error parsing field {0}")]
    TracedError(FieldTrace, #[source] Box<Self>),
    #[error("{0}")]
    MessageWithCause(Cow<'static, str>, #[source] Box<dyn Error + Send + Sync + 'static>),
}

impl GenericError {
    #[must_use]
    pub fn with_node<T: Into<Cow<'static, str>>>(self, node: T) -> Self {
        self.with_trace_node(TraceNode::Field(node.into()))
    }

    #[must_use]
    pub fn with_index(self, index: usize) -> Self {
        self.with_trace_node(TraceNode::Index(index))
    }

    #[must_use]
    fn with_trace_node(self, node: TraceNode) -> Self {
        match self {
            Self::TracedError(mut fields, error) => {
                fields.vec.push(node);
                Self::TracedError(fields, error)
            },
            other => Self::TracedError(FieldTrace { vec: vec![node] }, other.into()),
        }
    }

    pub fn from_msg_with_cause<T: Into<Cow<'static, str>>, E: Error + Send + Sync + 'static>(msg: T, cause: E) -> Self {
        Self::MessageWithCause(msg.into(), cause.into())
    }

    /// The field path, if any, at which this error was raised.
    pub fn trace(&self) -> Option<String> {
        match self {
            Self::TracedError(trace, _) => Some(trace.to_string()),
            Self::MessageWithCause(..) => None,
        }
    }
}

pub trait WithNodeOnResult {
    #[must_use]
    fn with_node<T: Into<Cow<'static, str>>>(self, node: T) -> Self;
    #[must_use]
    fn with_index(self, index: usize) -> Self;
}

impl<T> WithNodeOnResult for Result<T, GenericError> {
    fn with_node<Node: Into<Cow<'static, str>>>(self, node: Node) -> Self {
        self.map_err(|e| e.with_node(node))
    }

    fn with_index(self, index: usize) -> Self {
        self.map_err(|e| e.with_index(index))
    }
}

#[cfg(test)]
mod tests {
    use super::{GenericError, WithNodeOnResult};
    use std::io;

    fn bad_payload() -> GenericError {
        GenericError::from_msg_with_cause("bad payload", io::Error::from(io::ErrorKind::InvalidData))
    }

    #[test]
    fn trace_reads_outermost_first() {
        let result: Result<(), GenericError> = Err(bad_payload());
        let err = result
            .with_node("typed_config")
            .with_node("transport_socket")
            .with_index(2)
            .with_node("filter_chains")
            .unwrap_err();
        assert_eq!(err.trace().as_deref(), Some("filter_chains [2] / transport_socket / typed_config"));
        assert_eq!(err.to_string(), "Error parsing field filter_chains [2] / transport_socket / typed_config");
    }

    #[test]
    fn untraced_error_has_no_path() {
        let err = bad_payload();
        assert!(err.trace().is_none());
        assert_eq!(err.to_string(), "bad payload");
    }
}
