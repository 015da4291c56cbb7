//! Machine configuration.

/// Step budget applied when none is given.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Configuration for one run of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Maximum number of control items popped. None means unlimited.
    pub step_limit: Option<usize>,
}

impl MachineConfig {
    /// Create a configuration that runs until control is drained.
    pub fn unlimited() -> Self {
        MachineConfig { step_limit: None }
    }

    /// Create a configuration that stops after `steps` steps.
    pub fn with_step_limit(steps: usize) -> Self {
        MachineConfig {
            step_limit: Some(steps),
        }
    }

    /// The `target_step` to hand to `evaluate`.
    pub fn target_step(&self) -> usize {
        self.step_limit.unwrap_or(usize::MAX)
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self::with_step_limit(DEFAULT_STEP_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_step() {
        assert_eq!(MachineConfig::default().target_step(), DEFAULT_STEP_LIMIT);
        assert_eq!(MachineConfig::with_step_limit(10).target_step(), 10);
        assert_eq!(MachineConfig::unlimited().target_step(), usize::MAX);
    }
}
