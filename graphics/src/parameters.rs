//! Configuration for creating a [`DeviceContext`](crate::DeviceContext).

use crate::backend::DeviceLimits;

/// Which backend a context should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Use wgpu when it is compiled in and an adapter is available,
    /// otherwise fall back to the dummy backend.
    #[default]
    Auto,
    /// CPU-side dummy backend.
    Dummy,
    /// wgpu backend. Fails if the `wgpu-backend` feature is disabled.
    Wgpu,
}

/// Parameters for creating a device context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextParameters {
    /// Backend selection.
    pub backend: BackendType,
    /// Debug label for the context and its device.
    pub label: String,
    /// Enable backend validation layers.
    pub validation: bool,
    /// Limits for the dummy backend. Real backends report their own.
    pub limits: DeviceLimits,
}

impl Default for ContextParameters {
    fn default() -> Self {
        Self {
            backend: BackendType::Auto,
            label: "Mosaic Device".to_string(),
            validation: cfg!(debug_assertions),
            limits: DeviceLimits::default(),
        }
    }
}

impl ContextParameters {
    /// Create parameters with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Enable or disable validation.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Set the limits used by the dummy backend.
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }
}
