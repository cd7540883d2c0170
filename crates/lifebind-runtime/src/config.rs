#![forbid(unsafe_code)]

//! Per-container options.

use lifebind_core::ViolationPolicy;

use crate::gate::Marshal;

/// Options shared by every container constructor.
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Name used in logs and `Debug` output. Defaults to the container kind.
    pub label: Option<String>,
    /// What to do with contract violations.
    pub policy: ViolationPolicy,
    /// Where operations execute.
    pub marshal: Marshal,
}

impl ContainerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the violation policy read from `LIFEBIND_STRICT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_policy(ViolationPolicy::from_env())
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ViolationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_marshal(mut self, marshal: Marshal) -> Self {
        self.marshal = marshal;
        self
    }
}
