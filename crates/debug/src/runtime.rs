//! Debug runtime selection

use std::fmt;
use std::str::FromStr;

use crate::DebugError;

/// Debugger integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugRuntime {
    Termdebug,
    Vimspector,
    NvimDap,
}

impl DebugRuntime {
    pub const ALL: [DebugRuntime; 3] = [Self::Termdebug, Self::Vimspector, Self::NvimDap];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Termdebug => "termdebug",
            Self::Vimspector => "vimspector",
            Self::NvimDap => "nvim-dap",
        }
    }
}

impl FromStr for DebugRuntime {
    type Err = DebugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|runtime| runtime.as_str() == s)
            .ok_or_else(|| DebugError::InvalidRuntime(s.to_string()))
    }
}

impl fmt::Display for DebugRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
