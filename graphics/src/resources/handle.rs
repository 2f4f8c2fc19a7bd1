//! Move-only owning handle for GPU resources.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::backend::{
    GpuBackend, GpuBuffer, GpuComputePipeline, GpuGraphicsPipeline, GpuSampler, GpuShader,
    GpuTexture, GpuTransferBuffer,
};
use crate::device::DeviceContext;

use super::ResourceKind;

/// A raw backend object that can be released through a [`GpuBackend`].
pub trait DeviceResource: fmt::Debug + Send + Sync + 'static {
    /// Kind reported in logs and errors.
    const KIND: ResourceKind;

    /// Return the object to the backend.
    fn release(self, backend: &dyn GpuBackend);
}

macro_rules! device_resource {
    ($raw:ty, $kind:ident, $release:ident) => {
        impl DeviceResource for $raw {
            const KIND: ResourceKind = ResourceKind::$kind;

            fn release(self, backend: &dyn GpuBackend) {
                backend.$release(self);
            }
        }
    };
}

device_resource!(GpuSampler, Sampler, release_sampler);
device_resource!(GpuTexture, Texture, release_texture);
device_resource!(GpuBuffer, Buffer, release_buffer);
device_resource!(GpuShader, Shader, release_shader);
device_resource!(GpuGraphicsPipeline, GraphicsPipeline, release_graphics_pipeline);
device_resource!(GpuComputePipeline, ComputePipeline, release_compute_pipeline);
device_resource!(GpuTransferBuffer, TransferBuffer, release_transfer_buffer);

/// Exclusive owner of one GPU object.
///
/// A handle is either bound (it holds a raw object and knows the
/// [`DeviceContext`] that created it) or empty. Handles can be moved but not
/// copied. When a bound handle is reset or dropped, the raw object is queued
/// on its context and released by the next flush, never immediately.
///
/// The handle keeps only a weak reference to its context. If the context is
/// gone by the time the handle lets go, the object can't be released and a
/// leak warning is logged.
pub struct ResourceHandle<R: DeviceResource> {
    raw: Option<R>,
    context: Weak<DeviceContext>,
    label: Option<String>,
}

impl<R: DeviceResource> ResourceHandle<R> {
    pub(crate) fn new(raw: R, context: Weak<DeviceContext>, label: Option<String>) -> Self {
        Self {
            raw: Some(raw),
            context,
            label,
        }
    }

    /// Wrap a raw object that no context owns.
    ///
    /// The handle can't release the object: dropping it logs a leak warning.
    pub fn unbound(raw: R) -> Self {
        Self {
            raw: Some(raw),
            context: Weak::new(),
            label: None,
        }
    }

    /// The raw backend object, or `None` if the handle is empty.
    pub fn raw(&self) -> Option<&R> {
        self.raw.as_ref()
    }

    /// Whether the handle holds an object.
    pub fn is_valid(&self) -> bool {
        self.raw.is_some()
    }

    /// The debug label given at creation.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The resource kind.
    pub fn kind(&self) -> ResourceKind {
        R::KIND
    }

    /// The owning context, if it is still alive.
    pub fn context(&self) -> Option<Arc<DeviceContext>> {
        self.context.upgrade()
    }

    /// Give up the object, queueing it for deferred release.
    ///
    /// The handle is empty afterwards. Resetting an empty handle does nothing.
    pub fn reset(&mut self) {
        let Some(raw) = self.raw.take() else {
            return;
        };
        match self.context.upgrade() {
            Some(context) => context.defer_release(raw, self.label.take()),
            None => log::warn!(
                "{} {:?} destroyed without an associated DeviceContext; it will leak",
                R::KIND,
                self.label.as_deref().unwrap_or("<unlabeled>"),
            ),
        }
        self.context = Weak::new();
    }
}

impl<R: DeviceResource> Default for ResourceHandle<R> {
    fn default() -> Self {
        Self {
            raw: None,
            context: Weak::new(),
            label: None,
        }
    }
}

impl<R: DeviceResource> Drop for ResourceHandle<R> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<R: DeviceResource> fmt::Debug for ResourceHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &R::KIND)
            .field("label", &self.label)
            .field("raw", &self.raw)
            .finish()
    }
}

// Ensure handles are Send + Sync
static_assertions::assert_impl_all!(ResourceHandle<GpuTexture>: Send, Sync);
static_assertions::assert_not_impl_any!(ResourceHandle<GpuTexture>: Clone);
