//! Headless wgpu backend: shader compilation, off-screen render targets, PNG export.

use std::path::Path;
use std::sync::Arc;

use image::{ImageBuffer, Rgba};
use wgpu::util::DeviceExt;

use crate::config::ShaderConfig;
use crate::error::{FractalError, Result};
use crate::formula::Formula;
use crate::probe::{Framebuffer, Pixel, ShaderCompiler};
use crate::shader::{fractal_shader, uniform_data};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Device and queue shared by the compiler and every render target.
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    options: ShaderConfig,
}

/// A compiled fractal pipeline.
pub struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
}

impl GpuContext {
    /// Create a context on the best available adapter.
    pub fn new(options: ShaderConfig) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }))
        .ok_or_else(|| FractalError::backend("no GPU adapter found"))?;
        log::info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("fractals"),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| FractalError::backend(format!("device request failed: {e}")))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            options,
        })
    }

    /// An off-screen render target sharing this context's device.
    pub fn target(&self, width: u32, height: u32) -> GpuTarget {
        GpuTarget::new(Arc::clone(&self.device), Arc::clone(&self.queue), width, height)
    }
}

impl ShaderCompiler for GpuContext {
    type Program = GpuProgram;

    fn compile(&mut self, fractal_a: &str, fractal_b: &str) -> Result<GpuProgram> {
        let wgsl = fractal_shader(&Formula::from(fractal_a), &Formula::from(fractal_b), &self.options);

        // Shader and pipeline validation errors are reported through the scope.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fractal-shader"),
            source: wgpu::ShaderSource::Wgsl(wgsl.as_str().into()),
        });
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fractal-pipeline"),
            layout: None,
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(FractalError::backend(format!("shader rejected: {err}")));
        }

        let layout = pipeline.get_bind_group_layout(0);
        Ok(GpuProgram { pipeline, layout })
    }
}

/// An `Rgba8Unorm` texture plus a CPU copy of its last render.
pub struct GpuTarget {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    uniforms: wgpu::Buffer,
    readback: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    pixels: Vec<u8>,
}

impl GpuTarget {
    fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("fractal-target"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniforms"),
            contents: &floats_to_bytes(&uniform_data(width, height, 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Rows are copied out with 256-byte alignment.
        let padded_bytes_per_row = (width * 4).div_ceil(256) * 256;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            texture,
            view,
            uniforms,
            readback,
            width,
            height,
            padded_bytes_per_row,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    /// Tightly packed RGBA8 rows of the last render.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        save_png(&self.pixels, self.width, self.height, path)
    }

    fn read_back(&mut self) -> Result<()> {
        let slice = self.readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| FractalError::backend(format!("map recv error: {e}")))?
            .map_err(|e| FractalError::backend(format!("map error: {e}")))?;

        {
            let data = slice.get_mapped_range();
            let row_bytes = (self.width * 4) as usize;
            for row in 0..self.height as usize {
                let start = row * self.padded_bytes_per_row as usize;
                self.pixels[row * row_bytes..(row + 1) * row_bytes]
                    .copy_from_slice(&data[start..start + row_bytes]);
            }
        }
        self.readback.unmap();
        Ok(())
    }
}

impl Framebuffer<GpuProgram> for GpuTarget {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render_into(&mut self, program: &GpuProgram, mix: f32) -> Result<()> {
        self.queue.write_buffer(
            &self.uniforms,
            0,
            &floats_to_bytes(&uniform_data(self.width, self.height, mix)),
        );
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fractal-bind"),
            layout: &program.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniforms.as_entire_binding(),
            }],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fractal-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..4, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
        );
        self.queue.submit(Some(encoder.finish()));

        self.read_back()
    }

    fn read_pixel(&self, x: u32, y: u32) -> Pixel {
        let i = ((y * self.width + x) * 4) as usize;
        Pixel::from_rgba8([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }
}

/// Save RGBA8 pixel data as a PNG file.
pub fn save_png(pixels: &[u8], width: u32, height: u32, path: &Path) -> Result<()> {
    let img: ImageBuffer<Rgba<u8>, _> = ImageBuffer::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| FractalError::backend("invalid pixel dimensions"))?;
    img.save(path)
        .map_err(|e| FractalError::backend(format!("PNG save error: {e}")))
}

fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    floats.iter().flat_map(|f| f.to_le_bytes()).collect()
}
