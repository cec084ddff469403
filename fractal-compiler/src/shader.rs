//! WGSL fractal shader assembly.
//!
//! The shader iterates `z = fa(z, c) + (fb(z, c) - fa(z, c)) * mix` per pixel,
//! where `fa` / `fb` are the two spliced formulas. Orbits that blow up to NaN
//! or Inf are painted with low-alpha sentinel colours so the probe can tell
//! them apart from ordinary escape-time colouring.
//!
//! Uniform layout (16 bytes):
//!   [0] resolution.x
//!   [1] resolution.y
//!   [2] mix_ab
//!   [3] padding

use crate::config::ShaderConfig;
use crate::formula::{Formula, RUNTIME_LITERAL_FN};

pub const UNIFORM_FLOATS: usize = 4;

/// Sentinel colour for NaN orbits.
pub const NAN_COLOR: [f32; 4] = [1.0, 0.0, 0.5, 0.1];
/// Sentinel colour for infinite orbits.
pub const INF_COLOR: [f32; 4] = [0.0, 1.0, 0.5, 0.1];

/// Uniform buffer contents for one draw.
pub fn uniform_data(width: u32, height: u32, mix: f32) -> [f32; UNIFORM_FLOATS] {
    [width as f32, height as f32, mix, 0.0]
}

/// Build the complete shader with `fractal_a` / `fractal_b` returning the two formulas.
pub fn fractal_shader(fractal_a: &Formula, fractal_b: &Formula, options: &ShaderConfig) -> String {
    let mut gen = WgslWriter::default();
    gen.emit_header(options);
    gen.emit_vertex();
    gen.emit_helpers();
    gen.emit_fractal("fractal_a", fractal_a);
    gen.emit_fractal("fractal_b", fractal_b);
    gen.emit_fragment();
    gen.output
}

fn wgsl_float(v: f32) -> String {
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn vec4_literal(c: [f32; 4]) -> String {
    let parts: Vec<String> = c.iter().map(|&v| wgsl_float(v)).collect();
    format!("vec4f({})", parts.join(", "))
}

#[derive(Default)]
struct WgslWriter {
    output: String,
    indent: usize,
}

impl WgslWriter {
    fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn blank(&mut self) {
        self.output.push('\n');
    }

    /// Emit a one-statement function.
    fn func(&mut self, signature: &str, body: &[&str]) {
        self.line(&format!("{signature} {{"));
        self.indent += 1;
        for stmt in body {
            self.line(stmt);
        }
        self.indent -= 1;
        self.line("}");
        self.blank();
    }

    // ── Header ─────────────────────────────────────────────────────────

    fn emit_header(&mut self, options: &ShaderConfig) {
        self.line("// Generated fractal shader. fractal_a/fractal_b are spliced formulas.");
        self.blank();
        self.line("struct Uniforms {");
        self.indent += 1;
        self.line("resolution: vec2f,");
        self.line("mix_ab: f32,");
        self.line("pad: f32,");
        self.indent -= 1;
        self.line("}");
        self.blank();
        self.line("@group(0) @binding(0) var<uniform> u: Uniforms;");
        self.blank();
        self.line("const PI: f32 = 3.1415927;");
        self.line(&format!("const MAX_ITER: i32 = {};", options.max_iter));
        self.line(&format!(
            "const ESCAPE_RADIUS: f32 = {};",
            wgsl_float(options.escape_radius)
        ));
        self.line(&format!("const ZOOM: f32 = {};", wgsl_float(options.zoom)));
        self.line(&format!("const NAN_COLOR: vec4f = {};", vec4_literal(NAN_COLOR)));
        self.line(&format!("const INF_COLOR: vec4f = {};", vec4_literal(INF_COLOR)));
        self.blank();
        self.line("struct VertexOutput {");
        self.indent += 1;
        self.line("@builtin(position) position: vec4f,");
        self.line("@location(0) pos: vec2f,");
        self.indent -= 1;
        self.line("}");
        self.blank();
    }

    // ── Vertex stage ───────────────────────────────────────────────────

    fn emit_vertex(&mut self) {
        self.line("@vertex");
        self.line("fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOutput {");
        self.indent += 1;
        self.line("var corners = array<vec2f, 4>(");
        self.indent += 1;
        self.line("vec2f(-1.0, -1.0),");
        self.line("vec2f( 1.0, -1.0),");
        self.line("vec2f(-1.0,  1.0),");
        self.line("vec2f( 1.0,  1.0),");
        self.indent -= 1;
        self.line(");");
        self.line("let corner = corners[vi];");
        self.line("let aspect = u.resolution.x / u.resolution.y;");
        self.line("var out: VertexOutput;");
        self.line("out.position = vec4f(corner, 0.0, 1.0);");
        self.line("out.pos = corner * vec2f(aspect, 1.0) * ZOOM;");
        self.line("return out;");
        self.indent -= 1;
        self.line("}");
        self.blank();
    }

    // ── Complex helpers ────────────────────────────────────────────────

    fn emit_helpers(&mut self) {
        self.func(
            &format!("fn {RUNTIME_LITERAL_FN}(x: f32) -> f32"),
            &["return x;"],
        );
        self.func(
            "fn cx_mul(a: vec2f, b: vec2f) -> vec2f",
            &["return vec2f(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x);"],
        );
        self.func(
            "fn cx_div(a: vec2f, b: vec2f) -> vec2f",
            &[
                "let denom = 1.0 / (b.x * b.x + b.y * b.y);",
                "return vec2f(a.x * b.x + a.y * b.y, a.y * b.x - a.x * b.y) * denom;",
            ],
        );
        self.func(
            "fn cx_sqr(a: vec2f) -> vec2f",
            &["return vec2f(a.x * a.x - a.y * a.y, 2.0 * a.x * a.y);"],
        );
        self.func(
            "fn cx_cube(a: vec2f) -> vec2f",
            &[
                "let x2 = a.x * a.x;",
                "let y2 = a.y * a.y;",
                "let d = x2 - y2;",
                "return vec2f(a.x * (d - y2 * 2.0), a.y * (x2 * 2.0 + d));",
            ],
        );
        self.func(
            "fn cx_exp(a: vec2f) -> vec2f",
            &["return exp(a.x) * vec2f(cos(a.y), sin(a.y));"],
        );
        self.func(
            "fn cx_sin(a: vec2f) -> vec2f",
            &["return vec2f(sin(a.x) * cosh(a.y), cos(a.x) * sinh(a.y));"],
        );
        self.func(
            "fn cx_cos(a: vec2f) -> vec2f",
            &["return vec2f(cos(a.x) * cosh(a.y), -sin(a.x) * sinh(a.y));"],
        );
        self.func(
            "fn mandelbrot(z: vec2f, c: vec2f) -> vec2f",
            &["return cx_mul(z, z) + c;"],
        );
        self.func(
            "fn burning_ship(z: vec2f, c: vec2f) -> vec2f",
            &["return mandelbrot(abs(z), c);"],
        );

        // WGSL has no isnan/isinf, so inspect the bits.
        self.func(
            "fn is_nan_f(x: f32) -> bool",
            &[
                "let bits = bitcast<u32>(x);",
                "return (bits & 0x7f800000u) == 0x7f800000u && (bits & 0x007fffffu) != 0u;",
            ],
        );
        self.func(
            "fn is_inf_f(x: f32) -> bool",
            &["return (bitcast<u32>(x) & 0x7fffffffu) == 0x7f800000u;"],
        );
        self.func(
            "fn is_nan2(v: vec2f) -> bool",
            &["return is_nan_f(v.x) || is_nan_f(v.y);"],
        );
        self.func(
            "fn is_inf2(v: vec2f) -> bool",
            &["return is_inf_f(v.x) || is_inf_f(v.y);"],
        );
    }

    fn emit_fractal(&mut self, name: &str, formula: &Formula) {
        let ret = format!("return {formula};");
        self.func(
            &format!("fn {name}(z: vec2f, c: vec2f) -> vec2f"),
            &[ret.as_str()],
        );
    }

    // ── Fragment stage ─────────────────────────────────────────────────

    fn emit_fragment(&mut self) {
        self.line("@fragment");
        self.line("fn fs_main(input: VertexOutput) -> @location(0) vec4f {");
        self.indent += 1;
        self.line("let c = input.pos;");
        self.line("var z = vec2f(0.0);");
        self.line("var iter: i32 = 0;");
        self.line("for (; iter < MAX_ITER; iter += 1) {");
        self.indent += 1;
        self.line("if (dot(z, z) > ESCAPE_RADIUS * ESCAPE_RADIUS) {");
        self.line("    break;");
        self.line("}");
        self.line("let za = fractal_a(z, c);");
        self.line("let zb = fractal_b(z, c);");
        self.line("z = za + (zb - za) * u.mix_ab;");
        self.line("if (is_nan2(z)) {");
        self.line("    return NAN_COLOR;");
        self.line("}");
        self.line("if (is_inf2(z)) {");
        self.line("    return INF_COLOR;");
        self.line("}");
        self.indent -= 1;
        self.line("}");
        self.blank();
        self.line("if (iter == MAX_ITER) {");
        self.line("    return vec4f(0.0, 0.0, 0.0, 1.0);");
        self.line("}");
        self.line("let d = f32(iter) * 0.25 + 3.5;");
        self.line("return vec4f(cos(d + vec2f(0.0, PI / 2.0)) * 0.5 + 0.5, 1.0, 1.0);");
        self.indent -= 1;
        self.line("}");
    }
}
