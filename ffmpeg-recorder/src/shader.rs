use std::io;
use std::path::{Path, PathBuf};

use config_manager::{FrameConfig, ShaderConfig};

/// Deterministic file name for a shader parameter set
pub fn shader_file_name(shader: &ShaderConfig, frame: FrameConfig) -> String {
    format!(
        "motion_s{:.2}_r{}_t{:.4}_{}x{}.glsl",
        shader.sigma, shader.radius, shader.motion_threshold, frame.width, frame.height
    )
}

/// Write the libplacebo motion shader into `dir` and return its path.
///
/// The shader converts to luma, applies a separable gaussian blur, and emits
/// 1.0 for every pixel that changed by more than the threshold since the
/// previous frame. An existing file with the same parameters is reused.
pub async fn generate_motion_shader(
    dir: &Path,
    shader: &ShaderConfig,
    frame: FrameConfig,
) -> io::Result<PathBuf> {
    let path = dir.join(shader_file_name(shader, frame));
    if tokio::fs::try_exists(&path).await? {
        return Ok(path);
    }

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, render(shader, frame)).await?;
    tracing::debug!("Generated motion shader {}", path.display());
    Ok(path)
}

fn render(shader: &ShaderConfig, frame: FrameConfig) -> String {
    let ShaderConfig {
        sigma,
        radius,
        motion_threshold,
    } = shader;
    let (width, height) = (frame.width, frame.height);

    format!(
        r#"//!HOOK MAIN
//!BIND HOOKED
//!BIND PREV
//!DESC motion-recorder: luma blur + frame difference

// generated by motion-recorder: sigma={sigma:.3} radius={radius} threshold={motion_threshold:.6} size={width}x{height}

#define SIGMA {sigma:.6}
#define RADIUS {radius}.0
#define MOTION_THRESHOLD {motion_threshold:.6}

#define get_weight(x) (exp(-(x)*(x)/(2.0*SIGMA*SIGMA)))

vec4 hook() {{
    vec4 curr = linearize(textureLod(HOOKED_raw, HOOKED_pos, 0.0) * HOOKED_mul);
    float luma = dot(curr.rgb, vec3(0.2126, 0.7152, 0.0722));

    vec4 csum = vec4(luma, luma, luma, 0.0);
    float wsum = 1.0;
    for (float i = 1.0; i <= RADIUS; ++i) {{
        float w = get_weight(i);
        csum += (textureLod(HOOKED_raw, HOOKED_pos + vec2(0.0, -i)/HOOKED_size.xy, 0.0)
              + textureLod(HOOKED_raw, HOOKED_pos + vec2(0.0,  i)/HOOKED_size.xy, 0.0)) * w;
        wsum += 2.0 * w;
    }}
    vec4 blur_y = csum / wsum;

    csum = blur_y;
    wsum = 1.0;
    for (float i = 1.0; i <= RADIUS; ++i) {{
        float w = get_weight(i);
        csum += (textureLod(HOOKED_raw, HOOKED_pos + vec2(-i, 0.0)/HOOKED_size.xy, 0.0)
              + textureLod(HOOKED_raw, HOOKED_pos + vec2( i, 0.0)/HOOKED_size.xy, 0.0)) * w;
        wsum += 2.0 * w;
    }}
    vec4 blur = csum / wsum;

    ivec3 pos = ivec3(HOOKED_pos * HOOKED_size, 0);
    vec4 prev = imageLoad(PREV, pos);
    float moved = abs(blur.r - prev.r) > MOTION_THRESHOLD ? 1.0 : 0.0;
    imageStore(PREV, pos, blur);

    return vec4(moved);
}}

//!TEXTURE PREV
//!SIZE {width} {height} 1
//!FORMAT r8
//!STORAGE
"#
    )
}
