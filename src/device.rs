//! Compute-device affinity.
//!
//! Every labeler and estimator picks its device once, at construction, and
//! keeps it for its whole lifetime. The engine has no GPU backend; the
//! accelerated path is the rayon worker pool. Mask filters used by result
//! refinements are always row-parallel and do not consult the device.

use std::fmt;
use std::str::FromStr;

use crate::error::LabelError;

/// Where the heavy per-pixel work of an instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// Labeler FFTs and estimator predictions run on the calling thread.
    Cpu,
    /// Row-parallel work is spread over the rayon thread pool.
    Parallel,
}

impl Device {
    /// Pick `Parallel` when rayon has more than one worker, `Cpu` otherwise.
    pub fn detect() -> Self {
        if rayon::current_num_threads() > 1 {
            Device::Parallel
        } else {
            Device::Cpu
        }
    }

    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Device::Parallel)
    }
}

impl Default for Device {
    fn default() -> Self {
        Device::detect()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Parallel => f.write_str("parallel"),
        }
    }
}

impl FromStr for Device {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "parallel" => Ok(Device::Parallel),
            other => Err(LabelError::InvalidArgument(format!("unknown device {other:?}"))),
        }
    }
}
