use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fractal_compiler::config::Config;
use fractal_compiler::error::FractalError;
use fractal_compiler::formula::{render, render_for_shader, Formula};
use fractal_compiler::shader::fractal_shader;
use fractal_compiler::{parser, Generator, Registry, ValueType};

#[derive(Parser)]
#[command(name = "fractals", version)]
#[command(about = "Random well-typed fractal formulas for WGSL shaders")]
struct Cli {
    /// JSON config file (every field optional)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print random Complex formulas
    Generate {
        /// Number of formulas
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// Probability of expanding the root (overrides config)
        #[arg(long)]
        complexity: Option<f64>,

        /// Per-level complexity decay (overrides config)
        #[arg(long)]
        drop_off: Option<f64>,

        /// Also print the op-call notation and tree size
        #[arg(long)]
        tree: bool,
    },

    /// Parse and type-check op-call notation
    Check {
        /// Notation, e.g. "add_cx(sqr_cx(z), c)"
        notation: String,
    },

    /// List the operator catalog
    Ops,

    /// Emit the full WGSL shader for two formulas
    Shader {
        /// Formula A (defaults to the cycle's initial last formula)
        #[arg(long)]
        a: Option<String>,

        /// Formula B (defaults to the cycle's initial current formula)
        #[arg(long)]
        b: Option<String>,

        /// Treat --a/--b as op-call notation instead of WGSL expressions
        #[arg(long)]
        notation: bool,

        /// Write output to file instead of stdout
        #[arg(short)]
        o: Option<PathBuf>,
    },

    /// Run one acceptance search on the GPU and print the result
    #[cfg(feature = "gpu")]
    Search {
        /// Off-screen probe size in pixels
        #[arg(long, default_value_t = 128)]
        size: u32,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Drive the sketch headlessly and write frames as PNGs
    #[cfg(feature = "gpu")]
    Run {
        /// Frames to draw
        #[arg(long, default_value_t = 600)]
        frames: u32,

        /// Save every Nth frame
        #[arg(long, default_value_t = 30)]
        every: u32,

        /// Screen size in pixels
        #[arg(long, default_value_t = 512)]
        size: u32,

        /// Probe size in pixels
        #[arg(long, default_value_t = 128)]
        probe_size: u32,

        /// Seconds per frame
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,

        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for PNG frames
        #[arg(long, default_value = "out")]
        outdir: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("cannot load config '{}'", path.display()))?,
        None => Config::default(),
    };
    let registry = config.registry().context("invalid operator catalog")?;

    match cli.command {
        Commands::Generate {
            count,
            seed,
            complexity,
            drop_off,
            tree,
        } => {
            let mut gen_config = config.generator.clone();
            gen_config.seed = seed.or(gen_config.seed);
            if let Some(d) = drop_off {
                gen_config.drop_off = d;
            }
            if let Some(c) = complexity {
                gen_config.complexity = c;
            }
            gen_config.validate().context("invalid generator options")?;

            let mut gen = Generator::from_config(&registry, &gen_config);
            for _ in 0..count {
                let expr = gen.generate(ValueType::Complex, gen_config.complexity);
                if tree {
                    println!("{expr}");
                    println!("  depth {}, {} nodes", expr.depth(), expr.node_count());
                    println!("  {}", render(&expr));
                } else {
                    println!("{}", render(&expr));
                }
            }
        }

        Commands::Check { notation } => match parser::parse(&notation, &registry) {
            Ok(expr) => {
                println!("type:   {}", expr.value_type());
                println!("depth:  {}", expr.depth());
                println!("nodes:  {}", expr.node_count());
                println!("wgsl:   {}", render(&expr));
                if expr.value_type() != ValueType::Complex {
                    eprintln!("warning: root is {}, fractal formulas must be complex", expr.value_type());
                }
            }
            Err(e) => {
                print_error(&e, &notation);
                process::exit(1);
            }
        },

        Commands::Ops => {
            for ty in ValueType::ALL {
                println!("-> {ty} ({})", ty.wgsl());
                for op in registry.lookup(ty) {
                    println!("  {:<40} {}", op.to_string(), op.template().source());
                }
            }
        }

        Commands::Shader { a, b, notation, o } => {
            let a = a.unwrap_or_else(|| config.cycle.initial_last.clone());
            let b = b.unwrap_or_else(|| config.cycle.initial_current.clone());
            let (fa, fb) = if notation {
                (notation_formula(&a, &registry)?, notation_formula(&b, &registry)?)
            } else {
                (Formula::new(a), Formula::new(b))
            };
            let wgsl = fractal_shader(&fa, &fb, &config.shader);
            write_output(o.as_deref(), &wgsl, "WGSL")?;
        }

        #[cfg(feature = "gpu")]
        Commands::Search { size, seed } => gpu_cmd::search(&registry, &config, size, seed)?,

        #[cfg(feature = "gpu")]
        Commands::Run {
            frames,
            every,
            size,
            probe_size,
            dt,
            seed,
            outdir,
        } => gpu_cmd::run(
            &registry,
            &config,
            gpu_cmd::RunArgs {
                frames,
                every: every.max(1),
                size,
                probe_size,
                dt,
                seed,
                outdir,
            },
        )?,
    }

    Ok(())
}

fn notation_formula(source: &str, registry: &Registry) -> Result<Formula> {
    match parser::parse_typed(source, registry, ValueType::Complex) {
        Ok(expr) => Ok(render_for_shader(&expr)),
        Err(e) => {
            print_error(&e, source);
            anyhow::bail!("invalid notation '{source}'")
        }
    }
}

fn write_output(path: Option<&Path>, text: &str, kind: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("cannot write '{}'", path.display()))?;
            eprintln!("wrote {kind} to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn print_error(e: &FractalError, source: &str) {
    eprintln!("error: {e}");

    if let Some(span) = &e.span {
        if span.start <= source.len() {
            let col = source[..span.start].chars().count();
            let width = source[span.start..span.end.min(source.len())].chars().count().max(1);
            eprintln!();
            eprintln!("  {source}");
            eprintln!("  {}{}", " ".repeat(col), "^".repeat(width));
        }
    }
}

#[cfg(feature = "gpu")]
mod gpu_cmd {
    use std::fs;
    use std::path::PathBuf;

    use anyhow::{Context, Result};

    use fractal_compiler::config::Config;
    use fractal_compiler::cycle::FractalCycle;
    use fractal_compiler::gpu::GpuContext;
    use fractal_compiler::probe::ShaderCompiler;
    use fractal_compiler::search::Search;
    use fractal_compiler::sketch::Sketch;
    use fractal_compiler::Registry;

    pub struct RunArgs {
        pub frames: u32,
        pub every: u32,
        pub size: u32,
        pub probe_size: u32,
        pub dt: f32,
        pub seed: Option<u64>,
        pub outdir: PathBuf,
    }

    pub fn search(registry: &Registry, config: &Config, size: u32, seed: Option<u64>) -> Result<()> {
        let mut context = GpuContext::new(config.shader.clone())?;
        let mut probe = context.target(size, size);
        let mut cycle = FractalCycle::from_config(&config.cycle);
        // Fail early if the seed formulas themselves do not compile.
        context
            .compile(cycle.last().as_str(), cycle.current().as_str())
            .context("seed formulas do not compile")?;

        let mut search = Search::new(registry, config);
        if let Some(seed) = seed {
            search = search.with_seed(seed);
        }
        let found = search.run(&mut cycle, &mut context, &mut probe)?;
        let r = &found.report;
        println!("outcome:    {:?}", r.outcome);
        println!("attempts:   {}", r.attempts);
        println!(
            "rejected:   {} compile, {} divergent, {} boring",
            r.rejections.compile, r.rejections.divergent, r.rejections.boring
        );
        println!("formula:    {}", r.formula);
        Ok(())
    }

    pub fn run(registry: &Registry, config: &Config, args: RunArgs) -> Result<()> {
        fs::create_dir_all(&args.outdir)
            .with_context(|| format!("cannot create '{}'", args.outdir.display()))?;

        let context = GpuContext::new(config.shader.clone())?;
        let probe = context.target(args.probe_size, args.probe_size);
        let screen = context.target(args.size, args.size);
        let mut sketch = Sketch::new(registry, config, context, probe, screen)?;
        if let Some(seed) = args.seed {
            sketch = sketch.with_seed(seed);
        }

        for frame in 0..args.frames {
            if let Some(report) = sketch.frame(args.dt)? {
                eprintln!(
                    "frame {frame}: {:?} after {} attempt(s): {}",
                    report.outcome, report.attempts, report.formula
                );
            }
            if frame % args.every == 0 {
                let path = args.outdir.join(format!("frame_{frame:05}.png"));
                sketch.screen().save_png(&path)?;
            }
        }
        eprintln!("wrote {} frames to {}", args.frames.div_ceil(args.every), args.outdir.display());
        Ok(())
    }
}
