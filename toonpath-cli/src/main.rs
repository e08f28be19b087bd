mod trace;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use toonpath_core::config::{self, SceneConfig};
use toonpath_core::presets;
use toonpath_core::renderer::FrameRecorder;
use toonpath_core::scene::NodeKind;
use toonpath_core::scheduler::{FixedStepClock, FrameClock, FrameScheduler, RealtimeClock, ViewportState};
use toonpath_core::stage::{Animation, Stage};
use toonpath_core::VERSION;

#[derive(Parser, Debug)]
#[command(name = "toonpath", version = VERSION, about = "Outlined toy scenes and path animation, headless")]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct SceneSource {
    /// Scene YAML file
    path: Option<String>,
    /// Built-in scene instead of a file
    #[arg(long, conflicts_with = "path")]
    preset: Option<String>,
}

impl SceneSource {
    fn load(&self) -> Result<SceneConfig> {
        match (&self.preset, &self.path) {
            (Some(name), _) => presets::load(name),
            (None, Some(path)) => config::load_from_path(path),
            (None, None) => bail!("pass a scene file or --preset <name> (see `toonpath presets`)"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in scenes
    Presets,
    /// Build a scene, run the outline pass and print what came out
    Inspect {
        #[command(flatten)]
        scene: SceneSource,
    },
    /// Run the frame loop headless and report what each frame drew
    Simulate {
        #[command(flatten)]
        scene: SceneSource,
        #[arg(long, default_value_t = 240)]
        frames: u64,
        #[arg(long, default_value_t = 60.0)]
        fps: f64,
        /// Pace frames by the wall clock instead of stepping instantly
        #[arg(long)]
        realtime: bool,
        /// Write per-frame records as JSON ("-" for stdout)
        #[arg(long)]
        json: Option<String>,
    },
    /// Draw a top-down PNG of the shapes and the paths animated nodes take
    Trace {
        #[command(flatten)]
        scene: SceneSource,
        #[arg(long, default_value_t = 512)]
        size: u32,
        #[arg(long, default_value_t = 8.0)]
        seconds: f64,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
        #[arg(long, default_value = "trace.png")]
        out: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Presets => {
            for p in presets::PRESETS {
                println!("{:<10} {}", p.name, p.summary);
            }
        }
        Command::Inspect { scene } => {
            let cfg = scene.load()?;
            let stage = Stage::from_config(&cfg)?;
            let outline = stage.outline_report();
            println!("Scene: {}", stage.name);
            println!("  viewport: {}x{}", cfg.viewport.width, cfg.viewport.height);
            println!("  camera: fov={:.0}°, at {:?} -> {:?}", stage.camera.fov_y_deg, stage.camera.position, stage.camera.target);
            println!("  nodes: {} ({} meshes, {} shells)", stage.scene.len(), stage.scene.mesh_count(), stage.scene.shell_count());
            println!("  outline: +{} shells, {} untinted", outline.shells_added, outline.missing_color.len());
            for id in stage.scene.walk() {
                let Some(node) = stage.scene.node(id) else { continue };
                let what = match node.kind() {
                    NodeKind::Group => "group".to_string(),
                    NodeKind::Mesh(b) => {
                        let color = b.material.color.map(|c| c.to_string()).unwrap_or_else(|| "-".into());
                        format!("{} {:?} {} {:?}", b.geometry.kind(), b.geometry.dims(), color, b.material.side)
                    }
                };
                println!("    {id:>4} {:<22} {what}", node.name);
            }
            for binding in &stage.bindings {
                let name = stage.scene.node(binding.target).map(|n| n.name.as_str()).unwrap_or("?");
                match &binding.animation {
                    Animation::Path(a) => println!(
                        "  path -> {name}: {} points, {:.1}s {:?}, length {:.2}",
                        a.path().points().len(),
                        a.timing().duration(),
                        a.timing().loop_mode(),
                        a.path().length()
                    ),
                    Animation::Spin(_) => println!("  spin -> {name}"),
                }
            }
        }
        Command::Simulate { scene, frames, fps, realtime, json } => {
            let cfg = scene.load()?;
            let mut stage = Stage::from_config(&cfg)?;
            let mut recorder = FrameRecorder::new(cfg.viewport.width, cfg.viewport.height);
            for (name, _) in stage.tracked_positions() {
                recorder = recorder.track(name);
            }
            let mut clock: Box<dyn FrameClock> = if realtime {
                Box::new(RealtimeClock::new(fps).limit(frames))
            } else {
                Box::new(FixedStepClock::new(fps, frames))
            };
            let mut scheduler = FrameScheduler::new(ViewportState::new(cfg.viewport.width, cfg.viewport.height)?);
            let report = scheduler.run(&mut stage, &mut recorder, clock.as_mut());
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(last) = recorder.last() {
                for node in &last.nodes {
                    println!("  {} ends at {:?}", node.name, node.position);
                }
            }
            match json.as_deref() {
                Some("-") => println!("{}", recorder.to_json()?),
                Some(path) => {
                    std::fs::write(path, recorder.to_json()?)?;
                    println!("Wrote {} frames to {}", recorder.frames().len(), path);
                }
                None => {}
            }
        }
        Command::Trace { scene, size, seconds, fps, out } => {
            let cfg = scene.load()?;
            let mut stage = Stage::from_config(&cfg)?;
            let img = trace::render(&mut stage, &trace::TraceOptions { size, seconds, fps })?;
            img.save(&out)?;
            println!("Wrote {}x{} trace of `{}` to {}", size, size, stage.name, out);
        }
    }
    Ok(())
}
