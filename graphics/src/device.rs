//! Device context.
//!
//! The [`DeviceContext`] owns the backend device, creates resources, and owns
//! the deferred release queue that every [`ResourceHandle`] it creates feeds
//! into.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::backend::{self, GpuBackend};
use crate::deferred::DeferredReleaseQueue;
use crate::error::GraphicsError;
use crate::parameters::ContextParameters;
use crate::resources::{
    Buffer, ComputePipeline, DeviceResource, GraphicsPipeline, ResourceHandle, Sampler, Shader,
    Texture, TransferBuffer,
};
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, GraphicsPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, TextureDescriptor, TransferBufferDescriptor,
};

/// Owner of a GPU device and of every resource created on it.
///
/// Resources are released in two steps. Dropping or resetting a handle only
/// queues the raw object; [`flush`](Self::flush) waits for the device to go
/// idle and then releases everything queued. [`shutdown`](Self::shutdown)
/// flushes one last time and destroys the device. It runs automatically when
/// the last `Arc` to the context is dropped.
///
/// # Thread Safety
///
/// `DeviceContext` is `Send + Sync`. Handles may be dropped on any thread.
///
/// # Example
///
/// ```
/// use mosaic_graphics::{BackendType, ContextParameters, DeviceContext, SamplerDescriptor};
///
/// let context = DeviceContext::with_parameters(
///     ContextParameters::new().with_backend(BackendType::Dummy),
/// )
/// .unwrap();
///
/// let mut sampler = context.create_sampler(&SamplerDescriptor::linear()).unwrap();
/// sampler.reset();
/// assert_eq!(context.pending_releases(), 1);
/// assert_eq!(context.flush().unwrap(), 1);
/// ```
pub struct DeviceContext {
    backend: Box<dyn GpuBackend>,
    label: String,
    releases: DeferredReleaseQueue,
    live_resources: AtomicUsize,
    shut_down: AtomicBool,
}

impl DeviceContext {
    /// Create a context with default parameters.
    pub fn new() -> Result<Arc<Self>, GraphicsError> {
        Self::with_parameters(ContextParameters::default())
    }

    /// Create a context with custom parameters.
    pub fn with_parameters(params: ContextParameters) -> Result<Arc<Self>, GraphicsError> {
        let backend = backend::create_backend(&params)?;
        Ok(Self::from_backend_labeled(backend, params.label))
    }

    /// Create a context around an existing backend.
    pub fn from_backend(backend: Box<dyn GpuBackend>) -> Arc<Self> {
        Self::from_backend_labeled(backend, ContextParameters::default().label)
    }

    fn from_backend_labeled(backend: Box<dyn GpuBackend>, label: String) -> Arc<Self> {
        log::info!("DeviceContext {label:?} created on {}", backend.name());
        Arc::new(Self {
            backend,
            label,
            releases: DeferredReleaseQueue::new(),
            live_resources: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Get the context label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the backend.
    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    /// Number of handles created by this context that still own their object.
    pub fn live_resources(&self) -> usize {
        self.live_resources.load(Ordering::Acquire)
    }

    /// Number of objects waiting for the next flush.
    pub fn pending_releases(&self) -> usize {
        self.releases.len()
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Create a resource with a backend creation function.
    ///
    /// `factory` calls one of the backend's creation functions. A `None`
    /// result becomes [`GraphicsError::ResourceCreationFailed`] carrying the
    /// backend's last error message.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::DeviceLost`] after shutdown.
    pub fn create<R, F>(
        self: &Arc<Self>,
        label: Option<&str>,
        factory: F,
    ) -> Result<ResourceHandle<R>, GraphicsError>
    where
        R: DeviceResource,
        F: FnOnce(&dyn GpuBackend) -> Option<R>,
    {
        if self.is_shut_down() {
            return Err(GraphicsError::DeviceLost);
        }
        let Some(raw) = factory(self.backend.as_ref()) else {
            let reason = self.backend.last_error();
            log::error!("Failed to create {} {:?}: {reason}", R::KIND, label);
            return Err(GraphicsError::ResourceCreationFailed {
                kind: R::KIND,
                reason,
            });
        };
        self.live_resources.fetch_add(1, Ordering::AcqRel);
        log::trace!("DeviceContext: created {} {:?}", R::KIND, label);
        Ok(ResourceHandle::new(
            raw,
            Arc::downgrade(self),
            label.map(str::to_owned),
        ))
    }

    /// Create a sampler.
    pub fn create_sampler(
        self: &Arc<Self>,
        descriptor: &SamplerDescriptor,
    ) -> Result<Sampler, GraphicsError> {
        self.create(descriptor.label.as_deref(), |b| b.create_sampler(descriptor))
    }

    /// Create a texture.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> Result<Texture, GraphicsError> {
        self.create(descriptor.label.as_deref(), |b| b.create_texture(descriptor))
    }

    /// Create a buffer.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> Result<Buffer, GraphicsError> {
        self.create(descriptor.label.as_deref(), |b| b.create_buffer(descriptor))
    }

    /// Compile a shader module.
    pub fn create_shader(
        self: &Arc<Self>,
        descriptor: &ShaderDescriptor,
    ) -> Result<Shader, GraphicsError> {
        self.create(descriptor.label.as_deref(), |b| b.create_shader(descriptor))
    }

    /// Create a graphics pipeline.
    pub fn create_graphics_pipeline(
        self: &Arc<Self>,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> Result<GraphicsPipeline, GraphicsError> {
        self.create(descriptor.label.as_deref(), |b| {
            b.create_graphics_pipeline(descriptor)
        })
    }

    /// Create a compute pipeline.
    pub fn create_compute_pipeline(
        self: &Arc<Self>,
        descriptor: &ComputePipelineDescriptor<'_>,
    ) -> Result<ComputePipeline, GraphicsError> {
        self.create(descriptor.label.as_deref(), |b| {
            b.create_compute_pipeline(descriptor)
        })
    }

    /// Create a transfer buffer.
    pub fn create_transfer_buffer(
        self: &Arc<Self>,
        descriptor: &TransferBufferDescriptor,
    ) -> Result<TransferBuffer, GraphicsError> {
        self.create(descriptor.label.as_deref(), |b| {
            b.create_transfer_buffer(descriptor)
        })
    }

    /// Take ownership of a raw object given up by a handle.
    pub(crate) fn defer_release<R: DeviceResource>(&self, raw: R, label: Option<String>) {
        self.live_resources.fetch_sub(1, Ordering::AcqRel);
        if self.is_shut_down() {
            log::warn!(
                "{} {:?} dropped after DeviceContext {:?} shut down; it will leak",
                R::KIND,
                label,
                self.label
            );
            return;
        }
        self.releases.enqueue(raw, label);
    }

    /// Wait until the device is idle, then release every object queued
    /// before the call.
    ///
    /// Returns the number of objects released. With nothing queued this does
    /// not touch the device. Objects queued while the wait is in progress are
    /// left for the next flush.
    ///
    /// # Errors
    ///
    /// If the idle wait fails nothing is released and the queue is kept.
    pub fn flush(&self) -> Result<usize, GraphicsError> {
        if self.is_shut_down() {
            return Ok(0);
        }
        let batch = self.releases.take();
        if batch.is_empty() {
            log::debug!("DeviceContext {:?}: flush with nothing queued", self.label);
            return Ok(0);
        }
        if let Err(e) = self.backend.wait_idle() {
            self.releases.restore(batch);
            return Err(e);
        }
        Ok(batch.release(self.backend.as_ref()))
    }

    /// Like [`flush`](Self::flush), but gives up if the device is not idle
    /// within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::Timeout`] and keeps the queue intact if the
    /// device stays busy.
    pub fn flush_timeout(&self, timeout: Duration) -> Result<usize, GraphicsError> {
        if self.is_shut_down() {
            return Ok(0);
        }
        let batch = self.releases.take();
        if batch.is_empty() {
            log::debug!("DeviceContext {:?}: flush with nothing queued", self.label);
            return Ok(0);
        }
        if !self.backend.wait_idle_timeout(timeout) {
            log::warn!(
                "DeviceContext {:?}: device still busy after {timeout:?}, {} releases postponed",
                self.label,
                batch.len()
            );
            self.releases.restore(batch);
            return Err(GraphicsError::Timeout(timeout));
        }
        Ok(batch.release(self.backend.as_ref()))
    }

    /// Flush pending releases and destroy the device.
    ///
    /// Runs once; later calls do nothing. Resources still owned by handles at
    /// this point are reported as leaks.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("DeviceContext {:?} shutting down", self.label);

        let batch = self.releases.take();
        match self.backend.wait_idle() {
            Ok(()) => {
                batch.release(self.backend.as_ref());
            }
            Err(e) => {
                log::error!("Failed to wait for device idle during shutdown: {e}");
                batch.abandon();
            }
        }
        // Anything that slipped in during the wait is never released.
        self.releases.take().abandon();

        let live = self.live_resources();
        if live > 0 {
            log::warn!("DeviceContext {:?}: {live} resources still alive at shutdown", self.label);
        }
        self.backend.destroy_device();
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("label", &self.label)
            .field("backend", &self.backend.name())
            .field("live_resources", &self.live_resources())
            .field("pending_releases", &self.pending_releases())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

// Ensure DeviceContext is Send + Sync
static_assertions::assert_impl_all!(DeviceContext: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyBackend, DummyEvent, DummyProbe};
    use crate::resources::ResourceKind;
    use crate::types::{TextureFormat, TextureUsage};

    fn dummy_context() -> (Arc<DeviceContext>, DummyProbe) {
        let backend = DummyBackend::new();
        let probe = backend.probe();
        (DeviceContext::from_backend(Box::new(backend)), probe)
    }

    fn small_texture() -> TextureDescriptor {
        TextureDescriptor::new_2d(8, 8, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLER)
            .with_label("small")
    }

    #[test]
    fn test_create_counts_live_resources() {
        let (context, probe) = dummy_context();
        let texture = context.create_texture(&small_texture()).unwrap();
        assert!(texture.is_valid());
        assert_eq!(texture.label(), Some("small"));
        assert_eq!(context.live_resources(), 1);
        assert_eq!(probe.created_count(ResourceKind::Texture), 1);
    }

    #[test]
    fn test_failed_creation_reports_backend_error() {
        let (context, _probe) = dummy_context();
        let desc =
            TextureDescriptor::new_2d(0, 8, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLER);
        let err = context.create_texture(&desc).unwrap_err();
        match err {
            GraphicsError::ResourceCreationFailed { kind, reason } => {
                assert_eq!(kind, ResourceKind::Texture);
                assert!(reason.contains("non-zero"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(context.live_resources(), 0);
    }

    #[test]
    fn test_factory_returning_none() {
        let (context, probe) = dummy_context();
        probe.fail_next_creation("no memory");
        let result: Result<Sampler, _> =
            context.create(None, |b| b.create_sampler(&SamplerDescriptor::linear()));
        assert_eq!(
            result.unwrap_err(),
            GraphicsError::ResourceCreationFailed {
                kind: ResourceKind::Sampler,
                reason: "no memory".to_string(),
            }
        );
    }

    #[test]
    fn test_flush_waits_before_releasing() {
        let (context, probe) = dummy_context();
        let mut texture = context.create_texture(&small_texture()).unwrap();
        texture.reset();
        assert!(!texture.is_valid());
        assert_eq!(context.pending_releases(), 1);
        assert_eq!(probe.total_released(), 0);

        assert_eq!(context.flush().unwrap(), 1);
        let events = probe.events();
        let wait = events.iter().position(|e| *e == DummyEvent::WaitIdle).unwrap();
        let release = events
            .iter()
            .position(|e| matches!(e, DummyEvent::Released { .. }))
            .unwrap();
        assert!(wait < release);
    }

    #[test]
    fn test_flush_with_empty_queue_is_noop() {
        let (context, probe) = dummy_context();
        assert_eq!(context.flush().unwrap(), 0);
        assert_eq!(context.flush_timeout(Duration::from_millis(1)).unwrap(), 0);
        assert!(probe.events().is_empty());
    }

    #[test]
    fn test_double_flush_does_not_wait_again() {
        let (context, probe) = dummy_context();
        drop(context.create_texture(&small_texture()).unwrap());
        assert_eq!(context.flush().unwrap(), 1);
        let events = probe.events().len();

        assert_eq!(context.flush().unwrap(), 0);
        assert_eq!(probe.events().len(), events);
    }

    #[test]
    fn test_flush_keeps_queue_when_wait_fails() {
        let (context, probe) = dummy_context();
        drop(context.create_texture(&small_texture()).unwrap());
        probe.set_hung(true);
        assert_eq!(context.flush(), Err(GraphicsError::DeviceLost));
        assert_eq!(context.pending_releases(), 1);

        probe.set_hung(false);
        assert_eq!(context.flush().unwrap(), 1);
    }

    #[test]
    fn test_flush_timeout() {
        let (context, probe) = dummy_context();
        drop(context.create_texture(&small_texture()).unwrap());
        probe.set_hung(true);
        let timeout = Duration::from_millis(1);
        assert_eq!(
            context.flush_timeout(timeout),
            Err(GraphicsError::Timeout(timeout))
        );
        assert_eq!(context.pending_releases(), 1);
        assert_eq!(probe.total_released(), 0);

        probe.set_hung(false);
        assert_eq!(context.flush_timeout(timeout).unwrap(), 1);
    }

    #[test]
    fn test_shutdown_flushes_and_destroys() {
        let (context, probe) = dummy_context();
        drop(context.create_texture(&small_texture()).unwrap());
        context.shutdown();
        assert!(context.is_shut_down());
        assert_eq!(probe.total_released(), 1);
        assert_eq!(probe.events().last(), Some(&DummyEvent::DeviceDestroyed));

        context.shutdown();
        let destroyed = probe
            .events()
            .iter()
            .filter(|e| **e == DummyEvent::DeviceDestroyed)
            .count();
        assert_eq!(destroyed, 1);
    }

    #[test]
    fn test_create_after_shutdown_fails() {
        let (context, _probe) = dummy_context();
        context.shutdown();
        assert_eq!(
            context.create_texture(&small_texture()).unwrap_err(),
            GraphicsError::DeviceLost
        );
    }

    #[test]
    fn test_drop_after_shutdown_leaks() {
        let (context, probe) = dummy_context();
        let texture = context.create_texture(&small_texture()).unwrap();
        context.shutdown();
        drop(texture);
        assert_eq!(context.pending_releases(), 0);
        assert_eq!(probe.total_released(), 0);
        assert_eq!(context.live_resources(), 0);
    }

    #[test]
    fn test_dropping_context_shuts_down() {
        let (context, probe) = dummy_context();
        drop(context.create_sampler(&SamplerDescriptor::linear()).unwrap());
        drop(context);
        assert!(probe.is_destroyed());
        assert_eq!(probe.released_count(ResourceKind::Sampler), 1);
    }
}
