//! Per-frame driver: draw the crossfade, regenerate when the cycle is due.

use crate::config::Config;
use crate::cycle::FractalCycle;
use crate::error::Result;
use crate::probe::{Framebuffer, ShaderCompiler};
use crate::registry::Registry;
use crate::search::{Search, SearchReport};

/// One running fractal sketch.
///
/// `probe` is the off-screen target the acceptance loop renders candidates
/// into; `screen` is what the viewer sees.
pub struct Sketch<'r, C: ShaderCompiler, P, S> {
    cycle: FractalCycle,
    search: Search<'r>,
    compiler: C,
    probe: P,
    screen: S,
    program: C::Program,
    frame: u64,
}

impl<'r, C, P, S> Sketch<'r, C, P, S>
where
    C: ShaderCompiler,
    P: Framebuffer<C::Program>,
    S: Framebuffer<C::Program>,
{
    /// Compile the seed formulas and get ready to draw.
    pub fn new(registry: &'r Registry, config: &Config, mut compiler: C, probe: P, screen: S) -> Result<Self> {
        let cycle = FractalCycle::from_config(&config.cycle);
        let program = compiler.compile(cycle.last().as_str(), cycle.current().as_str())?;
        Ok(Self {
            cycle,
            search: Search::new(registry, config),
            compiler,
            probe,
            screen,
            program,
            frame: 0,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.search = self.search.with_seed(seed);
        self
    }

    /// Draw one frame, `dt` seconds after the previous one.
    ///
    /// Returns the search report on frames that ran the acceptance loop.
    pub fn frame(&mut self, dt: f32) -> Result<Option<SearchReport>> {
        self.screen.render_into(&self.program, self.cycle.mix())?;

        let report = if self.cycle.is_due() {
            let found = self
                .search
                .run(&mut self.cycle, &mut self.compiler, &mut self.probe)?;
            self.program = found.program;
            Some(found.report)
        } else {
            None
        };

        self.cycle.finish_frame(dt);
        self.frame += 1;
        Ok(report)
    }

    pub fn cycle(&self) -> &FractalCycle {
        &self.cycle
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frame
    }
}
