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

use std::fmt;

/// The stable identity of a resource descriptor.
///
/// Ids are handed out monotonically by the [`ResourceManager`] and stay
/// stable for the descriptor's lifetime. They are never recycled while any
/// GPU-side cache could still hold an entry for them.
///
/// [`ResourceManager`]: super::ResourceManager
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u64);

impl ResourceId {
    /// A sentinel id that no registered descriptor ever carries.
    pub const INVALID: Self = Self(0);

    /// The raw id value.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// `true` for the [`INVALID`](Self::INVALID) sentinel.
    pub const fn is_invalid(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}
