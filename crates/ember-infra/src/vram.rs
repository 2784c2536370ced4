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

//! Free-VRAM queries through vendor extensions.
//!
//! Neither extension is core; the first call probes which one the driver
//! answers and later calls query only that path. A GPU exposing neither
//! reports 0, which callers treat as "unknown" rather than "empty".

use gl::types::GLint;

// GL_NVX_gpu_memory_info
const GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX: u32 = 0x9049;
// GL_ATI_meminfo; returns four values, [0] is total free in KiB.
const TEXTURE_FREE_MEMORY_ATI: u32 = 0x87FC;

/// Which vendor path answered the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vendor {
    Unprobed,
    Nvidia,
    Ati,
    Unavailable,
}

/// A cached VRAM probe, owned by the GL backend.
#[derive(Debug)]
pub struct VramProbe {
    vendor: Vendor,
}

impl VramProbe {
    /// An unprobed instance; the first query decides the vendor path.
    pub fn new() -> Self {
        Self {
            vendor: Vendor::Unprobed,
        }
    }

    /// Currently available VRAM in KiB, or 0 when no vendor extension is
    /// supported. Must be called with the GL context current.
    pub fn available_kib(&mut self) -> u64 {
        if self.vendor == Vendor::Unprobed {
            self.vendor = Self::probe();
            if self.vendor == Vendor::Unavailable {
                log::info!("No VRAM query extension available; reporting 0");
            }
        }
        match self.vendor {
            Vendor::Nvidia => {
                Self::query(GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX).unwrap_or(0)
            }
            Vendor::Ati => Self::query(TEXTURE_FREE_MEMORY_ATI).unwrap_or(0),
            _ => 0,
        }
    }

    fn probe() -> Vendor {
        if Self::query(GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX).is_some() {
            Vendor::Nvidia
        } else if Self::query(TEXTURE_FREE_MEMORY_ATI).is_some() {
            Vendor::Ati
        } else {
            Vendor::Unavailable
        }
    }

    // Issues the query and swallows the INVALID_ENUM an unsupported pname
    // raises.
    fn query(pname: u32) -> Option<u64> {
        unsafe {
            while gl::GetError() != gl::NO_ERROR {}
            let mut values: [GLint; 4] = [0; 4];
            gl::GetIntegerv(pname, values.as_mut_ptr());
            if gl::GetError() == gl::NO_ERROR && values[0] > 0 {
                Some(values[0] as u64)
            } else {
                None
            }
        }
    }
}

impl Default for VramProbe {
    fn default() -> Self {
        Self::new()
    }
}
