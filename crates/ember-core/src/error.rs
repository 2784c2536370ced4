// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the hierarchy of error types for the engine core.

use crate::resource::ResourceId;
use std::fmt;

/// An error related to the creation or management of a CPU-side resource
/// descriptor.
#[derive(Debug)]
pub enum ResourceError {
    /// The requested descriptor is not (or is no longer) registered.
    NotFound {
        /// The id that was looked up.
        id: ResourceId,
    },
    /// A descriptor was registered with parameters the engine cannot honor.
    InvalidDescriptor {
        /// The offending id.
        id: ResourceId,
        /// What was wrong with it.
        reason: String,
    },
    /// The descriptor exists but has been marked invalid after a failed
    /// driver operation; draws referencing it are skipped.
    Defunct {
        /// The id of the defunct resource.
        id: ResourceId,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound { id } => {
                write!(f, "Resource descriptor not found for ID: {id:?}")
            }
            ResourceError::InvalidDescriptor { id, reason } => {
                write!(f, "Invalid resource descriptor {id:?}: {reason}")
            }
            ResourceError::Defunct { id } => {
                write!(f, "Resource {id:?} was marked invalid by a failed driver operation")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error produced by a concrete graphics driver while creating, updating,
/// or replaying against GPU-side state.
#[derive(Debug)]
pub enum DriverError {
    /// The underlying API reported an error code after an operation.
    ApiError {
        /// The raw error code (e.g. a `glGetError` value).
        code: u32,
        /// The operation that produced it.
        context: String,
    },
    /// A shader stage failed to compile.
    ShaderCompile {
        /// The descriptor id of the program.
        id: ResourceId,
        /// The compiler's info log.
        log: String,
    },
    /// A program failed to link.
    ProgramLink {
        /// The descriptor id of the program.
        id: ResourceId,
        /// The linker's info log.
        log: String,
    },
    /// A framebuffer was incomplete when validated.
    IncompleteFramebuffer {
        /// The descriptor id of the framebuffer.
        id: ResourceId,
        /// The completeness status code.
        status: u32,
    },
    /// The operation is not supported by this driver or platform.
    Unsupported {
        /// Which operation was requested.
        what: &'static str,
    },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::ApiError { code, context } => {
                write!(f, "Graphics API error {code:#06x} during {context}")
            }
            DriverError::ShaderCompile { id, log } => {
                write!(f, "Shader compilation failed for program {id:?}: {log}")
            }
            DriverError::ProgramLink { id, log } => {
                write!(f, "Program link failed for {id:?}: {log}")
            }
            DriverError::IncompleteFramebuffer { id, status } => {
                write!(f, "Framebuffer {id:?} incomplete, status {status:#06x}")
            }
            DriverError::Unsupported { what } => {
                write!(f, "Operation not supported by this driver: {what}")
            }
        }
    }
}

impl std::error::Error for DriverError {}
