/// WGSL shader for lit scene meshes.
///
/// Light `position.w` carries the kind (0 point, 1 directional, 2 spot).
/// For spots, `direction.w` and `diffuse.w` hold the cosines of the inner
/// and outer half-angles.
pub const SCENE_SHADER: &str = r#"
struct Light {
    position: vec4<f32>,
    direction: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
};

struct Uniforms {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    ambient: vec4<f32>,
    light_count: vec4<u32>,
    lights: array<Light, 8>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
    @location(7) diffuse: vec4<f32>,
    @location(8) specular: vec4<f32>,
    @location(9) params: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) diffuse: vec4<f32>,
    @location(4) specular: vec4<f32>,
    @location(5) params: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_pos = world_pos.xyz;
    out.world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    out.diffuse = instance.diffuse;
    out.specular = instance.specular;
    out.params = instance.params;
    return out;
}

fn tile_pattern(uv: vec2<f32>) -> f32 {
    let cell = floor(uv * 4.0);
    let noise = fract(sin(dot(cell, vec2<f32>(12.9898, 78.233))) * 43758.5453);
    let t = fract(uv * 4.0);
    let edge = min(min(t.x, 1.0 - t.x), min(t.y, 1.0 - t.y));
    let grout = smoothstep(0.0, 0.06, edge);
    return (0.75 + 0.25 * noise) * mix(0.45, 1.0, grout);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var n = in.world_normal;
    let len = length(n);
    if (len > 0.0) {
        n = n / len;
    }
    let v = normalize(uniforms.camera_pos.xyz - in.world_pos);

    var colour = uniforms.ambient.rgb * in.diffuse.rgb;
    let count = min(uniforms.light_count.x, 8u);
    for (var i = 0u; i < count; i = i + 1u) {
        let light = uniforms.lights[i];
        let kind = light.position.w;

        var l: vec3<f32>;
        if (kind == 1.0) {
            l = -light.direction.xyz;
        } else {
            l = normalize(light.position.xyz - in.world_pos);
        }

        var factor = 1.0;
        if (kind == 2.0) {
            let cos_angle = dot(-l, light.direction.xyz);
            factor = smoothstep(light.diffuse.w, light.direction.w, cos_angle);
        }

        let ndotl = max(dot(n, l), 0.0);
        colour += light.diffuse.rgb * in.diffuse.rgb * ndotl * factor;
        if (ndotl > 0.0) {
            let h = normalize(l + v);
            let highlight = pow(max(dot(n, h), 0.0), in.specular.w);
            colour += light.specular.rgb * in.specular.rgb * highlight * factor;
        }
    }

    let pattern = mix(1.0, tile_pattern(in.uv), in.params.x);
    return vec4<f32>(colour * pattern, in.diffuse.a);
}
"#;
