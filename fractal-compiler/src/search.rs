//! The generate → compile → probe → evaluate → accept loop.
//!
//! A candidate is compiled as `fractal_b` against the cycle's current formula
//! as `fractal_a`, rendered off-screen at each probe checkpoint, and sampled.
//! Rejections are recoverable and only show up in the [`SearchReport`].

use std::fmt;

use crate::config::{BoringPolicy, Config};
use crate::cycle::FractalCycle;
use crate::error::Result;
use crate::formula::{render_for_shader, Formula};
use crate::generator::Generator;
use crate::probe::{Framebuffer, Sample, Sampler, ShaderCompiler, Verdict};
use crate::registry::Registry;
use crate::types::ValueType;

/// Why a candidate was thrown away.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The shader did not compile.
    Compile(String),
    /// A sampled pixel carried the NaN/Inf sentinel.
    Divergent { mix: f32, sample: Sample },
    /// The render was constant at the checkpoints the policy looks at.
    Boring,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Compile(msg) => write!(f, "compile error: {msg}"),
            Rejection::Divergent { mix, sample } => write!(
                f,
                "divergent at mix {mix} pixel ({}, {}) alpha {:.3}",
                sample.x, sample.y, sample.pixel.a
            ),
            Rejection::Boring => write!(f, "boring"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A candidate passed and became the current formula.
    Accepted,
    /// The attempt cap was hit; the cycle kept its current formula.
    Exhausted,
}

/// Per-reason rejection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rejections {
    pub compile: usize,
    pub divergent: usize,
    pub boring: usize,
}

impl Rejections {
    fn record(&mut self, rejection: &Rejection) {
        match rejection {
            Rejection::Compile(_) => self.compile += 1,
            Rejection::Divergent { .. } => self.divergent += 1,
            Rejection::Boring => self.boring += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.compile + self.divergent + self.boring
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub outcome: Outcome,
    /// Candidates generated, including the accepted one.
    pub attempts: usize,
    pub rejections: Rejections,
    /// The formula the cycle now fades towards.
    pub formula: Formula,
}

/// A finished search: the program to draw next and how it was found.
pub struct Searched<P> {
    pub program: P,
    pub report: SearchReport,
}

pub struct Search<'r> {
    generator: Generator<'r>,
    sampler: Sampler,
    complexity: f64,
    drop_off: f64,
    checkpoints: Vec<f32>,
    policy: BoringPolicy,
    max_attempts: usize,
}

impl<'r> Search<'r> {
    pub fn new(registry: &'r Registry, config: &Config) -> Self {
        Self {
            generator: Generator::from_config(registry, &config.generator),
            sampler: Sampler::new(&config.probe),
            complexity: config.generator.complexity,
            drop_off: config.generator.regen_drop_off,
            checkpoints: config.probe.checkpoints.clone(),
            policy: config.probe.boring_policy,
            max_attempts: config.search.max_attempts,
        }
    }

    /// Reseed both the generator and the pixel sampler.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generator = self.generator.with_seed(seed);
        self.sampler = self.sampler.with_seed(seed.wrapping_add(1));
        self
    }

    /// Search until a candidate passes or the attempt cap is reached.
    ///
    /// On success the cycle accepts the candidate. On exhaustion it keeps its
    /// current formula and the returned program fades that formula into itself.
    /// Only backend failures outside compilation are returned as errors.
    pub fn run<C, F>(
        &mut self,
        cycle: &mut FractalCycle,
        compiler: &mut C,
        framebuffer: &mut F,
    ) -> Result<Searched<C::Program>>
    where
        C: ShaderCompiler,
        F: Framebuffer<C::Program> + ?Sized,
    {
        let mut rejections = Rejections::default();
        let mut attempts = 0;

        while self.max_attempts == 0 || attempts < self.max_attempts {
            attempts += 1;
            let tree = self
                .generator
                .generate_with(ValueType::Complex, self.complexity, self.drop_off);
            let candidate = render_for_shader(&tree);
            log::debug!("candidate {attempts}: {tree}");

            let program = match compiler.compile(cycle.current().as_str(), candidate.as_str()) {
                Ok(program) => program,
                Err(e) => {
                    let rejection = Rejection::Compile(e.to_string());
                    log::debug!("rejected candidate {attempts}: {rejection}");
                    rejections.record(&rejection);
                    continue;
                }
            };

            match self.probe(&program, framebuffer)? {
                Some(rejection) => {
                    log::debug!("rejected candidate {attempts}: {rejection}");
                    rejections.record(&rejection);
                }
                None => {
                    log::info!(
                        "accepted after {attempts} attempt(s) ({} rejected): {tree}",
                        rejections.total()
                    );
                    cycle.accept(candidate.clone());
                    return Ok(Searched {
                        program,
                        report: SearchReport {
                            outcome: Outcome::Accepted,
                            attempts,
                            rejections,
                            formula: candidate,
                        },
                    });
                }
            }
        }

        log::warn!(
            "no acceptable formula in {attempts} attempts (compile {}, divergent {}, boring {}); keeping {}",
            rejections.compile,
            rejections.divergent,
            rejections.boring,
            cycle.current()
        );
        cycle.keep();
        let program = compiler.compile(cycle.last().as_str(), cycle.current().as_str())?;
        Ok(Searched {
            program,
            report: SearchReport {
                outcome: Outcome::Exhausted,
                attempts,
                rejections,
                formula: cycle.current().clone(),
            },
        })
    }

    /// Render every checkpoint and judge the candidate. `None` means accept.
    fn probe<P, F>(&mut self, program: &P, framebuffer: &mut F) -> Result<Option<Rejection>>
    where
        F: Framebuffer<P> + ?Sized,
    {
        let mut boring = 0;
        for &mix in &self.checkpoints {
            framebuffer.render_into(program, mix)?;
            match self.sampler.inspect::<P, F>(&*framebuffer) {
                Verdict::Divergent(sample) => return Ok(Some(Rejection::Divergent { mix, sample })),
                Verdict::Boring if self.policy == BoringPolicy::Any => return Ok(Some(Rejection::Boring)),
                Verdict::Boring => boring += 1,
                Verdict::Lively => {}
            }
        }
        if boring == self.checkpoints.len() {
            return Ok(Some(Rejection::Boring));
        }
        Ok(None)
    }
}
