//! Common utilities for graphics integration tests.
//!
//! Provides backend selection for parameterized tests and helpers for
//! inspecting what the dummy backend recorded.

#![allow(dead_code)]

use std::sync::Arc;

use mosaic_graphics::{
    BackendType, ContextParameters, DeviceContext, DummyBackend, DummyEvent, DummyId, DummyProbe,
};

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Dummy backend (no actual GPU operations).
    Dummy,
    /// WebGPU backend (via wgpu).
    WebGpu,
}

impl Backend {
    /// Check if this backend is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => true,
            #[cfg(feature = "wgpu-backend")]
            Backend::WebGpu => true,
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::WebGpu => false,
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// A device context plus, for the dummy backend, a probe into its state.
pub struct TestContext {
    pub context: Arc<DeviceContext>,
    pub probe: Option<DummyProbe>,
}

impl TestContext {
    /// Create a context on `backend`, or `None` if it can't run here.
    pub fn new(backend: Backend) -> Option<Self> {
        init_logging();
        match backend {
            Backend::Dummy => {
                let (context, probe) = dummy_context();
                Some(Self {
                    context,
                    probe: Some(probe),
                })
            }
            Backend::WebGpu => {
                if !backend.is_available() {
                    return None;
                }
                let params = ContextParameters::new()
                    .with_backend(BackendType::Wgpu)
                    .with_label("integration test");
                match DeviceContext::with_parameters(params) {
                    Ok(context) => Some(Self {
                        context,
                        probe: None,
                    }),
                    Err(e) => {
                        eprintln!("wgpu device unavailable: {e}");
                        None
                    }
                }
            }
        }
    }
}

/// Context on a fresh dummy backend, with its probe.
pub fn dummy_context() -> (Arc<DeviceContext>, DummyProbe) {
    init_logging();
    let backend = DummyBackend::new();
    let probe = backend.probe();
    (DeviceContext::from_backend(Box::new(backend)), probe)
}

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Inspection Helpers
// ============================================================================

/// RGBA8 pixel at (x, y) in a tightly packed image of the given width.
pub fn pixel_at(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let at = ((y * width + x) * 4) as usize;
    [pixels[at], pixels[at + 1], pixels[at + 2], pixels[at + 3]]
}

/// Ids released so far, in release order.
pub fn released_ids(probe: &DummyProbe) -> Vec<DummyId> {
    probe
        .events()
        .into_iter()
        .filter_map(|e| match e {
            DummyEvent::Released { id, .. } => Some(id),
            _ => None,
        })
        .collect()
}

/// Index of the first idle wait in the event log.
pub fn first_wait_idle(probe: &DummyProbe) -> Option<usize> {
    probe.events().iter().position(|e| *e == DummyEvent::WaitIdle)
}
