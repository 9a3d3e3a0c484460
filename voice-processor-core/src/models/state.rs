use std::fmt;

/// Capture engine state machine.
///
/// State transitions:
/// ```text
/// idle ──start──▶ running ──pause──▶ paused
///   ▲               │  ▲               │
///   │               │  └───resume──────┘
///   └─────stop──────┴──────stop────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl EngineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Whether a hardware session is open (running or paused).
    pub fn is_active(&self) -> bool {
        !self.is_idle()
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
        }
    }
}
