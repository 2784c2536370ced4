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

//! # Ember Assets
//!
//! The asynchronous mipmap pipeline: ping a source image on a background
//! worker, optionally generate a block-compressed on-disk cache (DDS with
//! DXT1/3/5 payloads), load individual pyramid levels on demand, serve the
//! best resident level for a requested pixel footprint, and periodically
//! evict levels that have gone cold.

#![warn(missing_docs)]

pub mod cache;
pub mod dds;
pub mod dxt;
mod error;
pub mod mipmap;
pub mod release;

pub use cache::CacheDirs;
pub use error::AssetError;
pub use mipmap::{
    select_level, AssetContext, LevelRequest, LevelSelection, LevelState, Mipmap, Phase,
    ResidentLevel, SourceInfo,
};
pub use release::{spawn_release_task, MipmapRegistry};
