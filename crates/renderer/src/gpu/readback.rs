use std::fmt;
use std::sync::mpsc;

/// Why an offscreen frame could not be read back.
#[derive(Debug)]
pub enum RenderCaptureError {
    Map(wgpu::BufferAsyncError),
    Poll(wgpu::PollError),
    CallbackDropped,
    Truncated { expected: usize, actual: usize },
}

impl fmt::Display for RenderCaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderCaptureError::Map(err) => write!(f, "failed to map readback buffer: {err}"),
            RenderCaptureError::Poll(err) => write!(f, "failed to wait for the GPU: {err}"),
            RenderCaptureError::CallbackDropped => {
                write!(f, "readback buffer mapping was dropped before completing")
            }
            RenderCaptureError::Truncated { expected, actual } => write!(
                f,
                "mapped frame too small: expected at least {expected} bytes, got {actual}"
            ),
        }
    }
}

impl std::error::Error for RenderCaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderCaptureError::Map(err) => Some(err),
            RenderCaptureError::Poll(err) => Some(err),
            _ => None,
        }
    }
}

pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

/// Row pitch of a texture-to-buffer copy for a tightly packed RGBA8 row.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    align_to(width * 4, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

pub(crate) fn copy_tight_rows(
    mapped: &[u8],
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    height: u32,
) -> Result<Vec<u8>, RenderCaptureError> {
    let required_len = padded_bytes_per_row as usize * height as usize;
    if mapped.len() < required_len {
        return Err(RenderCaptureError::Truncated {
            expected: required_len,
            actual: mapped.len(),
        });
    }

    let row = unpadded_bytes_per_row as usize;
    let pitch = padded_bytes_per_row as usize;
    let mut frame = Vec::with_capacity(row * height as usize);
    for row_index in 0..height as usize {
        let start = row_index * pitch;
        frame.extend_from_slice(&mapped[start..start + row]);
    }
    Ok(frame)
}

/// Copies an RGBA8 texture into a mappable buffer and returns tightly
/// packed rows. Blocks until the GPU has finished.
pub(crate) fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, RenderCaptureError> {
    let unpadded = width * 4;
    let padded = padded_bytes_per_row(width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture readback"),
        size: u64::from(padded) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("capture readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(RenderCaptureError::Poll)?;
    receiver
        .recv()
        .map_err(|_| RenderCaptureError::CallbackDropped)?
        .map_err(RenderCaptureError::Map)?;

    let mapped = slice.get_mapped_range();
    let frame = copy_tight_rows(&mapped, unpadded, padded, height);
    drop(mapped);
    buffer.unmap();
    frame
}
