//! Rendering collaborators and render-and-sample quality checks.

use crate::config::ProbeConfig;
use crate::error::Result;

/// Turns a pair of formulas into a runnable fractal program.
pub trait ShaderCompiler {
    type Program;

    /// Compile a shader iterating `fractal_a` blended towards `fractal_b` by `mix`.
    fn compile(&mut self, fractal_a: &str, fractal_b: &str) -> Result<Self::Program>;
}

/// A render target that can draw a program and read pixels back.
pub trait Framebuffer<P> {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Render `program` at blend `mix`, replacing the previous contents.
    fn render_into(&mut self, program: &P, mix: f32) -> Result<()>;

    /// RGBA of the last render, each channel in [0, 1].
    fn read_pixel(&self, x: u32, y: u32) -> Pixel;
}

/// One RGBA pixel with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Pixel {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        let [r, g, b, a] = rgba.map(|c| c as f32 / 255.0);
        Self { r, g, b, a }
    }
}

/// Where the sampled pixels came from, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: u32,
    pub y: u32,
    pub pixel: Pixel,
}

/// Outcome of inspecting one rendered checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// A sampled pixel carries the NaN/Inf sentinel alpha.
    Divergent(Sample),
    /// Every sampled pixel equals the anchor.
    Boring,
    /// Usable output.
    Lively,
}

/// Reads an anchor pixel plus random interior pixels and judges the render.
///
/// Edge pixels are never sampled: the anchor is (1, 1) and random samples
/// come from `[1, extent - 1)` on both axes.
pub struct Sampler {
    rng: fastrand::Rng,
    samples: usize,
    alpha_threshold: f32,
}

impl Sampler {
    pub fn new(config: &ProbeConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            rng,
            samples: config.samples,
            alpha_threshold: config.alpha_threshold,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    fn is_divergent(&self, pixel: &Pixel) -> bool {
        pixel.a < self.alpha_threshold
    }

    /// Inspect the framebuffer's current contents.
    ///
    /// Divergence short-circuits: the first sentinel pixel decides.
    pub fn inspect<P, F>(&mut self, framebuffer: &F) -> Verdict
    where
        F: Framebuffer<P> + ?Sized,
    {
        let (width, height) = framebuffer.size();
        let (ax, ay) = (1.min(width.saturating_sub(1)), 1.min(height.saturating_sub(1)));
        let anchor = framebuffer.read_pixel(ax, ay);
        if self.is_divergent(&anchor) {
            return Verdict::Divergent(Sample { x: ax, y: ay, pixel: anchor });
        }

        let mut boring = true;
        for _ in 0..self.samples {
            let x = interior(&mut self.rng, width);
            let y = interior(&mut self.rng, height);
            let pixel = framebuffer.read_pixel(x, y);
            if self.is_divergent(&pixel) {
                return Verdict::Divergent(Sample { x, y, pixel });
            }
            if pixel != anchor {
                boring = false;
            }
        }

        if boring {
            Verdict::Boring
        } else {
            Verdict::Lively
        }
    }
}

/// A coordinate in `[1, extent - 1)`, falling back to the last pixel for tiny extents.
fn interior(rng: &mut fastrand::Rng, extent: u32) -> u32 {
    if extent > 2 {
        rng.u32(1..extent - 1)
    } else {
        extent.saturating_sub(1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A framebuffer filled by a closure of (x, y).
    pub(crate) struct Painted<F: Fn(u32, u32) -> Pixel> {
        pub width: u32,
        pub height: u32,
        pub paint: F,
    }

    impl<P, F: Fn(u32, u32) -> Pixel> Framebuffer<P> for Painted<F> {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn render_into(&mut self, _program: &P, _mix: f32) -> Result<()> {
            Ok(())
        }

        fn read_pixel(&self, x: u32, y: u32) -> Pixel {
            assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
            (self.paint)(x, y)
        }
    }

    fn sampler() -> Sampler {
        Sampler::new(&ProbeConfig::default()).with_seed(1)
    }

    #[test]
    fn constant_output_is_boring() {
        let fb = Painted { width: 64, height: 64, paint: |_, _| Pixel::new(1.0, 1.0, 1.0, 1.0) };
        assert_eq!(sampler().inspect::<(), _>(&fb), Verdict::Boring);
    }

    #[test]
    fn varied_output_is_lively() {
        let fb = Painted {
            width: 64,
            height: 64,
            paint: |x, y| Pixel::new(x as f32 / 64.0, y as f32 / 64.0, 0.0, 1.0),
        };
        assert_eq!(sampler().inspect::<(), _>(&fb), Verdict::Lively);
    }

    #[test]
    fn low_alpha_anywhere_is_divergent() {
        let fb = Painted {
            width: 64,
            height: 64,
            paint: |x, _| {
                if x == 1 {
                    Pixel::new(0.2, 0.4, 0.6, 1.0)
                } else {
                    Pixel::new(1.0, 0.0, 0.5, 0.15)
                }
            },
        };
        // Column 1 holds the anchor; every other sampled column is divergent.
        // With 10 draws from [1, 63) at least one lands off column 1.
        assert!(matches!(sampler().inspect::<(), _>(&fb), Verdict::Divergent(s) if s.pixel.a < 0.2));
    }

    #[test]
    fn divergent_anchor_short_circuits() {
        let fb = Painted { width: 8, height: 8, paint: |_, _| Pixel::new(0.0, 1.0, 0.5, 0.1) };
        assert!(matches!(
            sampler().inspect::<(), _>(&fb),
            Verdict::Divergent(Sample { x: 1, y: 1, .. })
        ));
    }

    #[test]
    fn samples_avoid_edges() {
        let fb = Painted {
            width: 5,
            height: 4,
            paint: |x, y| {
                assert!((1..4).contains(&x) && (1..3).contains(&y), "edge pixel ({x}, {y}) sampled");
                Pixel::new(0.0, 0.0, 0.0, 1.0)
            },
        };
        let mut s = sampler();
        for _ in 0..100 {
            s.inspect::<(), _>(&fb);
        }
    }

    #[test]
    fn tiny_framebuffers_do_not_panic() {
        let fb = Painted { width: 1, height: 1, paint: |_, _| Pixel::new(0.0, 0.0, 0.0, 1.0) };
        assert_eq!(sampler().inspect::<(), _>(&fb), Verdict::Boring);
    }

    #[test]
    fn rgba8_conversion() {
        let p = Pixel::from_rgba8([255, 0, 51, 255]);
        assert_eq!(p, Pixel::new(1.0, 0.0, 0.2, 1.0));
        assert!(Pixel::from_rgba8([255, 0, 128, 25]).a < 0.2);
    }
}
