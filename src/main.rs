use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use orrery::config::SceneConfig;
use orrery::display::{save_png, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use orrery::error::AppError;
use orrery::history::{pick_fresh, LastChoice, DEFAULT_STATE_FILE};
use orrery::logging::init_logging;
use orrery::math3d::Vec2;
use orrery::scene::Scene;
use orrery::util::FpsCounter;

#[derive(Parser, Debug)]
#[command(name = "orrery", version, about = "Procedural planets, lit and spinning")]
struct Cli {
    /// Scene JSON file; without it the earth/moon/mars preset is used
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Frame rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// Render worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Pixels per render chunk side
    #[arg(long)]
    chunk_size: Option<u32>,

    /// Show a single random planet, not the one shown last time
    #[arg(long)]
    pick: bool,

    /// Render without a window and write the last frame to --snapshot
    #[arg(long)]
    headless: bool,

    /// Frames to render in headless mode
    #[arg(long, default_value_t = 1)]
    frames: u64,

    #[arg(long, default_value = "orrery.png")]
    snapshot: PathBuf,

    /// Where --pick remembers its last choice
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    state_file: PathBuf,

    /// Window pixels per scene pixel
    #[arg(long, default_value_t = 5)]
    scale: u32,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

fn load_scene(cli: &Cli) -> Result<SceneConfig, AppError> {
    let mut scene = match &cli.config {
        Some(path) => {
            let mut scene = SceneConfig::load(path)?;
            if let Some(width) = cli.width {
                scene.width = width;
            }
            if let Some(height) = cli.height {
                scene.height = height;
            }
            scene
        },
        None => SceneConfig::preset(
            cli.width.unwrap_or(DEFAULT_WIDTH),
            cli.height.unwrap_or(DEFAULT_HEIGHT),
        ),
    };
    if let Some(fps) = cli.fps {
        scene.fps = fps;
    }
    if cli.threads.is_some() {
        scene.threads = cli.threads;
    }
    if cli.chunk_size.is_some() {
        scene.chunk_size = cli.chunk_size;
    }
    if cli.pick {
        pick_one(&mut scene, &LastChoice::new(&cli.state_file));
    }
    Ok(scene)
}

/// Keep one planet, centred, and remember it for next time
fn pick_one(scene: &mut SceneConfig, history: &LastChoice) {
    let last = history.read();
    let names: Vec<&str> = scene.planets.iter().map(|p| p.name.as_str()).collect();
    let Some(choice) = pick_fresh(&names, last.as_deref(), &mut rand::rng()).map(str::to_string)
    else {
        warn!("--pick given but the scene has no planets");
        return;
    };

    scene.planets.retain(|p| p.name == choice);
    scene.planets.truncate(1);
    let centre = Vec2::new((scene.width / 2) as f64, (scene.height / 2) as f64);
    for planet in &mut scene.planets {
        planet.position = centre;
    }
    history.write(&choice);
    info!(planet = %choice, previous = ?last, "picked planet");
}

fn run_headless(cli: &Cli, scene: &mut Scene) -> Result<(), AppError> {
    let mut rng = rand::rng();
    let mut fps = FpsCounter::new(60);
    for _ in 0..cli.frames.max(1) {
        fps.tick();
        scene.render_frame(&mut rng)?;
    }
    save_png(scene.screen(), &cli.snapshot)?;
    info!(
        frames = scene.frame(),
        path = %cli.snapshot.display(),
        fps = format!("{:.2}", fps.session_fps()),
        "snapshot written"
    );
    Ok(())
}

#[cfg(feature = "window")]
fn run_window(cli: &Cli, config: &SceneConfig, scene: &mut Scene) -> Result<(), AppError> {
    use orrery::display::{Display, InputEvent, RenderTarget};
    use tracing::error;

    let (mut display, texture_creator) =
        Display::with_options("orrery", config.width, config.height, cli.scale, false)
            .map_err(AppError::Display)?;
    let mut target = RenderTarget::with_size(&texture_creator, config.width, config.height)
        .map_err(AppError::Display)?;

    let mut rng = rand::rng();
    let mut fps = FpsCounter::new(60);

    'main: loop {
        fps.tick();
        for event in display.poll_events() {
            if event == InputEvent::Quit {
                break 'main;
            }
        }

        // A failed frame is dropped unpresented and the next one retries
        match scene.render_frame(&mut rng) {
            Ok(()) => display
                .present(&mut target, scene.screen())
                .map_err(AppError::Display)?,
            Err(e) => error!(error = %e, frame = scene.frame(), "frame dropped"),
        }

        std::thread::sleep(fps.remaining(config.fps));
    }

    info!("{:.2} fps on average", fps.session_fps());
    Ok(())
}

#[cfg(not(feature = "window"))]
fn run_window(_cli: &Cli, _config: &SceneConfig, _scene: &mut Scene) -> Result<(), AppError> {
    Err(AppError::Display(
        "built without the `window` feature, use --headless".to_string(),
    ))
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = load_scene(&cli)?;
    info!(
        "{}x{} {}fps, {} planets",
        config.width,
        config.height,
        config.fps,
        config.planets.len()
    );

    let mut scene = Scene::from_config(&config, &mut rand::rng())?;
    if cli.headless {
        run_headless(&cli, &mut scene)
    } else {
        run_window(&cli, &config, &mut scene)
    }
}
