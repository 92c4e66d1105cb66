use std::borrow::Cow;

/// Builds a shader module from WGSL chunks concatenated in order.
pub(crate) fn create_module(
    device: &wgpu::Device,
    label: &str,
    chunks: &[&str],
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(compose(chunks))),
    })
}

pub(crate) fn compose(chunks: &[&str]) -> String {
    let mut source = String::with_capacity(chunks.iter().map(|chunk| chunk.len() + 1).sum());
    for chunk in chunks {
        source.push_str(chunk);
        if !chunk.ends_with('\n') {
            source.push('\n');
        }
    }
    source
}

/// Unlit textured geometry with exponential-squared fog and optional
/// view-space billboarding.
///
/// `FrameUniforms` and `ObjectUniforms` must match the structs in
/// `gpu::uniforms`.
pub(crate) const SCENE: &str = r"
struct FrameUniforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    camera_position: vec4<f32>,
    // rgb colour, density in w
    fog: vec4<f32>,
};

struct ObjectUniforms {
    model: mat4x4<f32>,
    // rgb colour, opacity in w
    color: vec4<f32>,
    // repeat in xy, offset in zw
    uv_transform: vec4<f32>,
    // x: billboard, z: fog
    flags: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: FrameUniforms;

@group(1) @binding(0) var<uniform> object: ObjectUniforms;
@group(1) @binding(1) var base_texture: texture_2d<f32>;
@group(1) @binding(2) var base_sampler: sampler;

struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) view_depth: f32,
};

@vertex
fn vs_scene(in: VertexIn) -> VertexOut {
    var view_position: vec4<f32>;
    if (object.flags.x > 0.5) {
        let centre = frame.view * object.model * vec4<f32>(0.0, 0.0, 0.0, 1.0);
        let scale = vec2<f32>(length(object.model[0].xyz), length(object.model[1].xyz));
        view_position = centre + vec4<f32>(in.position.xy * scale, 0.0, 0.0);
    } else {
        view_position = frame.view * object.model * vec4<f32>(in.position, 1.0);
    }

    var out: VertexOut;
    out.clip = frame.projection * view_position;
    out.uv = in.uv;
    out.view_depth = -view_position.z;
    return out;
}

@fragment
fn fs_scene(in: VertexOut) -> @location(0) vec4<f32> {
    let uv = in.uv * object.uv_transform.xy + object.uv_transform.zw;
    // surfaces are stored top row first
    let texel = textureSample(base_texture, base_sampler, vec2<f32>(uv.x, 1.0 - uv.y));
    var color = object.color.rgb * texel.rgb;
    let alpha = object.color.a * texel.a;

    if (object.flags.z > 0.5) {
        let amount = frame.fog.w * in.view_depth;
        let fog = clamp(1.0 - exp(-amount * amount), 0.0, 1.0);
        color = mix(color, frame.fog.rgb, fog);
    }
    return vec4<f32>(color, alpha);
}
";

/// Oversized triangle covering the viewport; uv (0, 0) is the top-left.
pub(crate) const FULLSCREEN: &str = r"
struct FullscreenOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOut {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -3.0),
        vec2<f32>(3.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let p = positions[index];
    var out: FullscreenOut;
    out.position = vec4<f32>(p, 0.0, 1.0);
    out.uv = p * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5, 0.5);
    return out;
}
";

/// Shared bindings of the single-input post stages.
pub(crate) const POST_BINDINGS: &str = r"
@group(0) @binding(0) var source_texture: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
";

/// Replicates each low-resolution texel over a `pixel_size` block.
pub(crate) const PIXELATE: &str = r"
struct PixelateParams {
    source_size: vec2<f32>,
    pixel_size: f32,
    _pad: f32,
};

@group(0) @binding(2) var<uniform> params: PixelateParams;

@fragment
fn fs_pixelate(in: FullscreenOut) -> @location(0) vec4<f32> {
    let block = floor(in.position.xy / params.pixel_size);
    let texel = vec2<i32>(clamp(block, vec2<f32>(0.0), params.source_size - vec2<f32>(1.0)));
    return textureLoad(source_texture, texel, 0);
}
";

pub(crate) const HIGH_PASS: &str = r"
struct HighPassParams {
    threshold: f32,
    smooth_width: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(2) var<uniform> params: HighPassParams;

@fragment
fn fs_high_pass(in: FullscreenOut) -> @location(0) vec4<f32> {
    let texel = textureSampleLevel(source_texture, source_sampler, in.uv, 0.0);
    let luma = dot(texel.rgb, vec3<f32>(0.299, 0.587, 0.114));
    let keep = smoothstep(params.threshold, params.threshold + params.smooth_width, luma);
    return mix(vec4<f32>(0.0), texel, keep);
}
";

/// One direction of a separable Gaussian. `direction` is pre-scaled by the
/// texel size.
pub(crate) const BLUR: &str = r"
struct BlurParams {
    direction: vec2<f32>,
    kernel_radius: u32,
    _pad: u32,
    weights: array<vec4<f32>, 3>,
};

@group(0) @binding(2) var<uniform> params: BlurParams;

fn weight(tap: u32) -> f32 {
    return params.weights[tap / 4u][tap % 4u];
}

@fragment
fn fs_blur(in: FullscreenOut) -> @location(0) vec4<f32> {
    var weight_sum = weight(0u);
    var sum = textureSampleLevel(source_texture, source_sampler, in.uv, 0.0).rgb * weight_sum;
    for (var tap = 1u; tap < params.kernel_radius; tap = tap + 1u) {
        let w = weight(tap);
        let offset = params.direction * f32(tap);
        let left = textureSampleLevel(source_texture, source_sampler, in.uv - offset, 0.0).rgb;
        let right = textureSampleLevel(source_texture, source_sampler, in.uv + offset, 0.0).rgb;
        sum = sum + (left + right) * w;
        weight_sum = weight_sum + 2.0 * w;
    }
    return vec4<f32>(sum / weight_sum, 1.0);
}
";

/// Adds the weighted blur levels onto the pixelated frame.
pub(crate) const COMPOSITE: &str = r"
struct CompositeParams {
    factors: vec4<f32>,
    last_factor: f32,
    strength: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(2) var<uniform> params: CompositeParams;
@group(0) @binding(3) var bloom_0: texture_2d<f32>;
@group(0) @binding(4) var bloom_1: texture_2d<f32>;
@group(0) @binding(5) var bloom_2: texture_2d<f32>;
@group(0) @binding(6) var bloom_3: texture_2d<f32>;
@group(0) @binding(7) var bloom_4: texture_2d<f32>;

@fragment
fn fs_composite(in: FullscreenOut) -> @location(0) vec4<f32> {
    let base = textureSampleLevel(source_texture, source_sampler, in.uv, 0.0);
    let bloom = params.factors.x * textureSampleLevel(bloom_0, source_sampler, in.uv, 0.0).rgb
        + params.factors.y * textureSampleLevel(bloom_1, source_sampler, in.uv, 0.0).rgb
        + params.factors.z * textureSampleLevel(bloom_2, source_sampler, in.uv, 0.0).rgb
        + params.factors.w * textureSampleLevel(bloom_3, source_sampler, in.uv, 0.0).rgb
        + params.last_factor * textureSampleLevel(bloom_4, source_sampler, in.uv, 0.0).rgb;
    return vec4<f32>(base.rgb + params.strength * bloom, 1.0);
}
";

/// ACES filmic tone mapping followed by sRGB encoding when the target
/// format does not encode on write.
pub(crate) const OUTPUT: &str = r"
struct OutputParams {
    exposure: f32,
    encode_srgb: u32,
    _pad: vec2<u32>,
};

@group(0) @binding(2) var<uniform> params: OutputParams;

fn rrt_and_odt_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn aces_filmic(hdr: vec3<f32>) -> vec3<f32> {
    let input_mat = mat3x3<f32>(
        vec3<f32>(0.59719, 0.07600, 0.02840),
        vec3<f32>(0.35458, 0.90834, 0.13383),
        vec3<f32>(0.04823, 0.01566, 0.83777),
    );
    let output_mat = mat3x3<f32>(
        vec3<f32>(1.60475, -0.10208, -0.00327),
        vec3<f32>(-0.53108, 1.10813, -0.07276),
        vec3<f32>(-0.07367, -0.00605, 1.07602),
    );
    var color = hdr * (params.exposure / 0.6);
    color = input_mat * color;
    color = rrt_and_odt_fit(color);
    color = output_mat * color;
    return clamp(color, vec3<f32>(0.0), vec3<f32>(1.0));
}

fn linear_to_srgb(color: vec3<f32>) -> vec3<f32> {
    let low = color * 12.92;
    let high = 1.055 * pow(color, vec3<f32>(1.0 / 2.4)) - vec3<f32>(0.055);
    return select(high, low, color <= vec3<f32>(0.0031308));
}

@fragment
fn fs_output(in: FullscreenOut) -> @location(0) vec4<f32> {
    let texel = textureSampleLevel(source_texture, source_sampler, in.uv, 0.0);
    var color = aces_filmic(texel.rgb);
    if (params.encode_srgb != 0u) {
        color = linear_to_srgb(color);
    }
    return vec4<f32>(color, 1.0);
}
";
