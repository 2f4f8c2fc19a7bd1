//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It keeps every created object in a
//! table, stores texture and transfer buffer contents in memory, and records
//! an event log so tests can observe creation, submission, idle waits and
//! releases through a [`DummyProbe`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mosaic_core::Rect;
use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::resources::{ResourceKind, Shader};
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, GraphicsPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, ShaderFormat, ShaderStage, TextureDescriptor, TextureTransferInfo,
    TransferBufferDescriptor,
};

use super::{
    DeviceLimits, GpuBackend, GpuBuffer, GpuComputePipeline, GpuGraphicsPipeline, GpuSampler,
    GpuShader, GpuTexture, GpuTransferBuffer,
};

/// Identifier of an object owned by a [`DummyBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DummyId(u64);

impl fmt::Display for DummyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something observable that happened on a dummy device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DummyEvent {
    /// An object was created.
    Created { kind: ResourceKind, id: DummyId },
    /// An object was released.
    Released { kind: ResourceKind, id: DummyId },
    /// A transfer buffer was copied into a texture region.
    Uploaded { texture: DummyId, region: Rect },
    /// The device was waited on until idle.
    WaitIdle,
    /// The device was destroyed.
    DeviceDestroyed,
}

#[derive(Debug)]
enum DummyObject {
    Texture {
        width: u32,
        height: u32,
        block_size: u32,
        pixels: Vec<u8>,
    },
    Transfer {
        bytes: Vec<u8>,
    },
    Shader {
        stage: ShaderStage,
    },
    Opaque,
}

#[derive(Debug)]
struct LiveObject {
    kind: ResourceKind,
    object: DummyObject,
}

/// Callback run from inside an idle wait.
struct WaitHook(Box<dyn FnOnce() + Send>);

impl fmt::Debug for WaitHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WaitHook")
    }
}

#[derive(Debug, Default)]
struct DummyState {
    next_id: u64,
    objects: HashMap<DummyId, LiveObject>,
    events: Vec<DummyEvent>,
    last_error: String,
    pending_submissions: usize,
    hung: bool,
    injected_failure: Option<String>,
    on_wait_idle: Option<WaitHook>,
    destroyed: bool,
}

impl DummyState {
    fn fail<T>(&mut self, message: impl Into<String>) -> Option<T> {
        let message = message.into();
        log::debug!("DummyBackend: {message}");
        self.last_error = message;
        None
    }

    /// Consume a failure queued by [`DummyProbe::fail_next_creation`].
    fn check_creation(&mut self) -> Result<(), ()> {
        if self.destroyed {
            self.last_error = "device has been destroyed".to_string();
            return Err(());
        }
        match self.injected_failure.take() {
            Some(reason) => {
                self.last_error = reason;
                Err(())
            }
            None => Ok(()),
        }
    }

    fn register(&mut self, kind: ResourceKind, object: DummyObject) -> DummyId {
        self.next_id += 1;
        let id = DummyId(self.next_id);
        self.objects.insert(id, LiveObject { kind, object });
        self.events.push(DummyEvent::Created { kind, id });
        log::trace!("DummyBackend: created {kind} {id}");
        id
    }

    fn release(&mut self, kind: ResourceKind, id: Option<DummyId>) {
        let Some(id) = id else {
            log::warn!("DummyBackend: asked to release a {kind} owned by another backend");
            return;
        };
        match self.objects.remove(&id) {
            Some(live) if live.kind == kind => {
                self.events.push(DummyEvent::Released { kind, id });
                log::trace!("DummyBackend: released {kind} {id}");
            }
            Some(live) => {
                log::warn!(
                    "DummyBackend: released {id} as a {kind}, but it is a {}",
                    live.kind
                );
                self.objects.insert(id, live);
            }
            None => log::warn!("DummyBackend: {kind} {id} is unknown or already released"),
        }
    }

    fn shader_stage(&self, shader: &Shader) -> Option<ShaderStage> {
        let id = shader.raw()?.dummy_id()?;
        match self.objects.get(&id)?.object {
            DummyObject::Shader { stage } => Some(stage),
            _ => None,
        }
    }
}

/// Observer for the state of a [`DummyBackend`].
///
/// The probe shares state with the backend, so it stays usable after the
/// backend has been moved into a [`DeviceContext`](crate::DeviceContext).
#[derive(Clone)]
pub struct DummyProbe {
    state: Arc<Mutex<DummyState>>,
}

impl DummyProbe {
    /// All events recorded so far, oldest first.
    pub fn events(&self) -> Vec<DummyEvent> {
        self.state.lock().events.clone()
    }

    /// Number of objects of `kind` that have been created.
    pub fn created_count(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, DummyEvent::Created { kind: k, .. } if *k == kind))
            .count()
    }

    /// Number of objects of `kind` that have been released.
    pub fn released_count(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, DummyEvent::Released { kind: k, .. } if *k == kind))
            .count()
    }

    /// Total number of releases of any kind.
    pub fn total_released(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, DummyEvent::Released { .. }))
            .count()
    }

    /// Number of objects created and not yet released.
    pub fn live_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Whether the object is still alive on the device.
    pub fn is_live(&self, id: DummyId) -> bool {
        self.state.lock().objects.contains_key(&id)
    }

    /// Copy of a texture's contents, tightly packed.
    pub fn texture_pixels(&self, id: DummyId) -> Option<Vec<u8>> {
        match &self.state.lock().objects.get(&id)?.object {
            DummyObject::Texture { pixels, .. } => Some(pixels.clone()),
            _ => None,
        }
    }

    /// Submissions not yet waited on.
    pub fn pending_submissions(&self) -> usize {
        self.state.lock().pending_submissions
    }

    /// Simulate a device that never finishes its submitted work.
    pub fn set_hung(&self, hung: bool) {
        self.state.lock().hung = hung;
    }

    /// Run `hook` once, from inside the next idle wait, before the device
    /// reports idle. Simulates another thread working while a flush waits.
    pub fn on_next_wait_idle(&self, hook: impl FnOnce() + Send + 'static) {
        self.state.lock().on_wait_idle = Some(WaitHook(Box::new(hook)));
    }

    /// Make the next creation call fail with `reason`.
    pub fn fail_next_creation(&self, reason: impl Into<String>) {
        self.state.lock().injected_failure = Some(reason.into());
    }

    /// Whether the device has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

impl fmt::Debug for DummyProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DummyProbe")
            .field("live", &state.objects.len())
            .field("events", &state.events.len())
            .finish()
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    state: Arc<Mutex<DummyState>>,
    limits: DeviceLimits,
    row_alignment: u32,
}

impl DummyBackend {
    /// Create a new dummy backend with default limits.
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits::default())
    }

    /// Create a new dummy backend with custom limits.
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            state: Arc::new(Mutex::new(DummyState::default())),
            limits,
            row_alignment: 1,
        }
    }

    /// Require `bytes_per_row` of texture uploads to be a multiple of `alignment`.
    pub fn with_row_alignment(mut self, alignment: u32) -> Self {
        self.row_alignment = alignment.max(1);
        self
    }

    /// Get a probe observing this backend.
    pub fn probe(&self) -> DummyProbe {
        DummyProbe {
            state: Arc::clone(&self.state),
        }
    }

    /// The hook runs without the state lock held so it can use the backend.
    fn run_wait_hook(&self) {
        let hook = self.state.lock().on_wait_idle.take();
        if let Some(WaitHook(hook)) = hook {
            hook();
        }
    }

    fn check_size(&self, state: &mut DummyState, what: &str, size: u64) -> Result<(), ()> {
        if size == 0 {
            state.last_error = format!("{what} size must be non-zero");
            return Err(());
        }
        if size > self.limits.max_buffer_size {
            state.last_error = format!(
                "{what} size {size} exceeds the maximum of {}",
                self.limits.max_buffer_size
            );
            return Err(());
        }
        Ok(())
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn last_error(&self) -> String {
        self.state.lock().last_error.clone()
    }

    fn copy_row_alignment(&self) -> u32 {
        self.row_alignment
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Option<GpuSampler> {
        let mut state = self.state.lock();
        state.check_creation().ok()?;
        log::trace!("DummyBackend: sampler {:?}", descriptor.label);
        let id = state.register(ResourceKind::Sampler, DummyObject::Opaque);
        Some(GpuSampler::Dummy(id))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<GpuTexture> {
        let mut state = self.state.lock();
        state.check_creation().ok()?;
        let (width, height) = (descriptor.width, descriptor.height);
        if width == 0 || height == 0 || descriptor.depth_or_layers == 0 {
            return state.fail(format!(
                "texture size {width}x{height}x{} must be non-zero",
                descriptor.depth_or_layers
            ));
        }
        let max = self.limits.max_texture_dimension_2d;
        if width > max || height > max {
            return state.fail(format!(
                "texture size {width}x{height} exceeds the maximum dimension {max}"
            ));
        }
        if descriptor.mip_level_count == 0 {
            return state.fail("texture mip level count must be at least 1");
        }
        if descriptor.usage.is_empty() {
            return state.fail("texture usage must not be empty");
        }
        let pixels = vec![0; descriptor.byte_size() as usize];
        let id = state.register(
            ResourceKind::Texture,
            DummyObject::Texture {
                width,
                height,
                block_size: descriptor.format.block_size(),
                pixels,
            },
        );
        Some(GpuTexture::Dummy(id))
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Option<GpuBuffer> {
        let mut state = self.state.lock();
        state.check_creation().ok()?;
        self.check_size(&mut state, "buffer", descriptor.size).ok()?;
        if descriptor.usage.is_empty() {
            return state.fail("buffer usage must not be empty");
        }
        let id = state.register(ResourceKind::Buffer, DummyObject::Opaque);
        Some(GpuBuffer::Dummy(id))
    }

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Option<GpuShader> {
        let mut state = self.state.lock();
        state.check_creation().ok()?;
        if descriptor.code.is_empty() {
            return state.fail("shader code is empty");
        }
        if descriptor.entry_point.is_empty() {
            return state.fail("shader entry point is empty");
        }
        if descriptor.format == ShaderFormat::Wgsl && std::str::from_utf8(&descriptor.code).is_err()
        {
            return state.fail("WGSL source is not valid UTF-8");
        }
        let id = state.register(
            ResourceKind::Shader,
            DummyObject::Shader {
                stage: descriptor.stage,
            },
        );
        Some(GpuShader::Dummy(id))
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> Option<GpuGraphicsPipeline> {
        let mut state = self.state.lock();
        state.check_creation().ok()?;
        if state.shader_stage(descriptor.vertex_shader) != Some(ShaderStage::Vertex) {
            return state.fail("vertex shader is not a live vertex stage module");
        }
        if let Some(fragment) = descriptor.fragment_shader
            && state.shader_stage(fragment) != Some(ShaderStage::Fragment)
        {
            return state.fail("fragment shader is not a live fragment stage module");
        }
        if descriptor.color_formats.is_empty() && descriptor.depth_format.is_none() {
            return state.fail("pipeline has no render targets");
        }
        if descriptor.color_formats.iter().any(|f| f.is_depth()) {
            return state.fail("depth format used as a color target");
        }
        if let Some(depth) = descriptor.depth_format
            && !depth.is_depth()
        {
            return state.fail(format!("{depth:?} is not a depth format"));
        }
        let id = state.register(ResourceKind::GraphicsPipeline, DummyObject::Opaque);
        Some(GpuGraphicsPipeline::Dummy(id))
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor<'_>,
    ) -> Option<GpuComputePipeline> {
        let mut state = self.state.lock();
        state.check_creation().ok()?;
        if state.shader_stage(descriptor.shader) != Some(ShaderStage::Compute) {
            return state.fail("compute shader is not a live compute stage module");
        }
        let id = state.register(ResourceKind::ComputePipeline, DummyObject::Opaque);
        Some(GpuComputePipeline::Dummy(id))
    }

    fn create_transfer_buffer(
        &self,
        descriptor: &TransferBufferDescriptor,
    ) -> Option<GpuTransferBuffer> {
        let mut state = self.state.lock();
        state.check_creation().ok()?;
        self.check_size(&mut state, "transfer buffer", descriptor.size)
            .ok()?;
        let bytes = vec![0; descriptor.size as usize];
        let id = state.register(ResourceKind::TransferBuffer, DummyObject::Transfer { bytes });
        Some(GpuTransferBuffer::Dummy(id))
    }

    fn release_sampler(&self, sampler: GpuSampler) {
        self.state
            .lock()
            .release(ResourceKind::Sampler, sampler.dummy_id());
    }

    fn release_texture(&self, texture: GpuTexture) {
        self.state
            .lock()
            .release(ResourceKind::Texture, texture.dummy_id());
    }

    fn release_buffer(&self, buffer: GpuBuffer) {
        self.state
            .lock()
            .release(ResourceKind::Buffer, buffer.dummy_id());
    }

    fn release_shader(&self, shader: GpuShader) {
        self.state
            .lock()
            .release(ResourceKind::Shader, shader.dummy_id());
    }

    fn release_graphics_pipeline(&self, pipeline: GpuGraphicsPipeline) {
        self.state
            .lock()
            .release(ResourceKind::GraphicsPipeline, pipeline.dummy_id());
    }

    fn release_compute_pipeline(&self, pipeline: GpuComputePipeline) {
        self.state
            .lock()
            .release(ResourceKind::ComputePipeline, pipeline.dummy_id());
    }

    fn release_transfer_buffer(&self, buffer: GpuTransferBuffer) {
        self.state
            .lock()
            .release(ResourceKind::TransferBuffer, buffer.dummy_id());
    }

    fn write_transfer_buffer(
        &self,
        buffer: &GpuTransferBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let id = buffer.dummy_id().ok_or_else(|| {
            GraphicsError::InvalidParameter("transfer buffer belongs to another backend".into())
        })?;
        let Some(DummyObject::Transfer { bytes }) =
            state.objects.get_mut(&id).map(|live| &mut live.object)
        else {
            return Err(GraphicsError::InvalidParameter(format!(
                "{id} is not a live transfer buffer"
            )));
        };
        let start = offset as usize;
        let end = start
            .checked_add(data.len())
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "write of {} bytes at offset {offset} overruns a {} byte transfer buffer",
                    data.len(),
                    bytes.len()
                ))
            })?;
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn upload_to_texture(
        &self,
        source: &GpuTransferBuffer,
        layout: TextureTransferInfo,
        destination: &GpuTexture,
        region: Rect,
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let (Some(src_id), Some(dst_id)) = (source.dummy_id(), destination.dummy_id()) else {
            return Err(GraphicsError::InvalidParameter(
                "upload handles belong to another backend".into(),
            ));
        };

        let Some(DummyObject::Texture {
            width,
            height,
            block_size,
            ..
        }) = state.objects.get(&dst_id).map(|live| &live.object)
        else {
            return Err(GraphicsError::InvalidParameter(format!(
                "{dst_id} is not a live texture"
            )));
        };
        let (tex_width, block_size) = (*width as usize, *block_size as usize);
        if !Rect::from_size(*width, *height).contains_rect(&region) {
            return Err(GraphicsError::InvalidParameter(format!(
                "region {region:?} is outside the {width}x{height} texture"
            )));
        }

        let row_bytes = region.width as usize * block_size;
        let stride = layout.bytes_per_row as usize;
        if stride < row_bytes || stride % self.row_alignment as usize != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "bytes_per_row {stride} is invalid for rows of {row_bytes} bytes"
            )));
        }

        let Some(DummyObject::Transfer { bytes }) =
            state.objects.get(&src_id).map(|live| &live.object)
        else {
            return Err(GraphicsError::InvalidParameter(format!(
                "{src_id} is not a live transfer buffer"
            )));
        };
        let rows = region.height as usize;
        let start = layout.offset as usize;
        let needed = if rows == 0 {
            0
        } else {
            (rows - 1) * stride + row_bytes
        };
        if start + needed > bytes.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "upload reads {needed} bytes at offset {start} from a {} byte buffer",
                bytes.len()
            )));
        }
        let staged: Vec<u8> = (0..rows)
            .flat_map(|row| {
                let at = start + row * stride;
                bytes[at..at + row_bytes].iter().copied()
            })
            .collect();

        if let Some(DummyObject::Texture { pixels, .. }) =
            state.objects.get_mut(&dst_id).map(|live| &mut live.object)
        {
            for (row, chunk) in staged.chunks_exact(row_bytes.max(1)).enumerate() {
                let at = ((region.y as usize + row) * tex_width + region.x as usize) * block_size;
                pixels[at..at + row_bytes].copy_from_slice(chunk);
            }
        }

        state.pending_submissions += 1;
        state.events.push(DummyEvent::Uploaded {
            texture: dst_id,
            region,
        });
        log::trace!("DummyBackend: uploaded {region:?} into texture {dst_id}");
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.run_wait_hook();
        let mut state = self.state.lock();
        if state.hung {
            state.last_error = "device stopped responding".to_string();
            return Err(GraphicsError::DeviceLost);
        }
        state.pending_submissions = 0;
        state.events.push(DummyEvent::WaitIdle);
        Ok(())
    }

    fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        self.run_wait_hook();
        if self.state.lock().hung {
            std::thread::sleep(timeout);
            return false;
        }
        let mut state = self.state.lock();
        state.pending_submissions = 0;
        state.events.push(DummyEvent::WaitIdle);
        true
    }

    fn destroy_device(&self) {
        let mut state = self.state.lock();
        if !state.objects.is_empty() {
            log::warn!(
                "DummyBackend: device destroyed with {} live objects",
                state.objects.len()
            );
        }
        state.destroyed = true;
        state.events.push(DummyEvent::DeviceDestroyed);
    }
}
