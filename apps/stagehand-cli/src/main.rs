use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use stagehand_assets::MaterialLibrary;
use stagehand_common::AppConfig;
use stagehand_input::{FrameController, InputState, Key, MouseButton, SceneBinding};
use stagehand_render::{DebugTextRenderer, RenderView, Renderer};
use stagehand_scene::{Stage, build_stage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stagehand-cli", about = "Headless stagehand tool")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file of extra materials
    #[arg(long, global = true)]
    materials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Build the stage and print a text dump of it
    Dump,
    /// Run the frame controller over a scripted input sequence
    Simulate {
        /// YAML list of frames: { dt, repeat, keys, buttons }
        #[arg(short, long)]
        script: PathBuf,
    },
}

/// One scripted step, held for `repeat` consecutive frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptFrame {
    dt: f32,
    #[serde(default = "one")]
    repeat: u32,
    #[serde(default)]
    keys: Vec<Key>,
    #[serde(default)]
    buttons: Vec<MouseButton>,
}

fn one() -> u32 {
    1
}

fn parse_script(text: &str) -> anyhow::Result<Vec<ScriptFrame>> {
    let frames: Vec<ScriptFrame> = serde_yaml::from_str(text)?;
    if let Some(bad) = frames.iter().find(|f| !f.dt.is_finite() || f.dt < 0.0) {
        anyhow::bail!("frame time must be a non-negative number, got {}", bad.dt);
    }
    Ok(frames)
}

/// Run every scripted frame against the stage. Returns the number of light toggles.
fn simulate(
    stage: &mut Stage,
    controller: &mut FrameController,
    frames: &[ScriptFrame],
) -> anyhow::Result<u64> {
    let h = stage.handles;
    let mut toggles = 0u64;
    let mut count = 0u64;
    for frame in frames {
        let input = InputState::holding(&frame.keys, &frame.buttons);
        for _ in 0..frame.repeat {
            let mut target = SceneBinding::new(&mut stage.scene, h.entity_node, h.spotlight);
            let actions = controller.frame(&input, frame.dt, &mut target)?;
            toggles += actions.iter().filter(|a| a.is_toggle()).count() as u64;
            count += 1;
        }
    }
    let events = stage.scene.drain_events();
    tracing::debug!("simulated {count} frames, {} scene events", events.len());
    Ok(toggles)
}

fn load_stage(config: &AppConfig, materials: Option<&Path>) -> anyhow::Result<Stage> {
    let mut library = MaterialLibrary::with_builtins();
    if let Some(path) = materials {
        library
            .load_json(path)
            .with_context(|| format!("loading materials from {}", path.display()))?;
    }
    let stage = build_stage(library, config.window.width, config.window.height)?;
    Ok(stage)
}

fn dump(stage: &Stage) -> anyhow::Result<String> {
    let h = stage.handles;
    let camera = stage.scene.camera(h.camera)?;
    let viewport = stage.scene.viewport(h.viewport)?;
    let view = RenderView::from_camera(camera, viewport);
    Ok(DebugTextRenderer::new().render(&stage.scene, &view))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load_or_default(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Commands::Info => {
            println!("stagehand-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("assets: {}", stagehand_assets::crate_info());
            println!("scene: {}", stagehand_scene::crate_info());
            println!("input: {}", stagehand_input::crate_info());
            println!("render: {}", stagehand_render::crate_info());
        }
        Commands::Dump => {
            let stage = load_stage(&config, cli.materials.as_deref())?;
            print!("{}", dump(&stage)?);
        }
        Commands::Simulate { script } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let frames = parse_script(&text)
                .with_context(|| format!("parsing {}", script.display()))?;

            let mut stage = load_stage(&config, cli.materials.as_deref())?;
            let mut controller = FrameController::new(config.controls);
            let toggles = simulate(&mut stage, &mut controller, &frames)?;

            print!("{}", dump(&stage)?);
            println!("Light toggles: {toggles}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> Stage {
        load_stage(&AppConfig::default(), None).unwrap()
    }

    #[test]
    fn parses_script_with_defaults() {
        let frames = parse_script(
            "- { dt: 0.1, keys: [I, LShift] }\n- { dt: 0.05, repeat: 3, buttons: [Right] }\n",
        )
        .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].repeat, 1);
        assert_eq!(frames[0].keys, vec![Key::I, Key::LShift]);
        assert!(frames[0].buttons.is_empty());
        assert_eq!(frames[1].repeat, 3);
        assert_eq!(frames[1].buttons, vec![MouseButton::Right]);
    }

    #[test]
    fn rejects_bad_scripts() {
        assert!(parse_script("- { dt: -1.0 }").is_err());
        assert!(parse_script("- { dt: 0.1, keys: [Q] }").is_err());
        assert!(parse_script("- { dt: 0.1, speed: 2 }").is_err());
    }

    #[test]
    fn right_button_respects_cooldown() {
        let mut stage = stage();
        let mut controller = FrameController::default();
        // 1 s of right button at 0.1 s frames: toggles at t=0 and t=0.5.
        let frames = parse_script("- { dt: 0.1, repeat: 10, buttons: [Right] }").unwrap();
        let toggles = simulate(&mut stage, &mut controller, &frames).unwrap();
        assert_eq!(toggles, 2);
        let h = stage.handles;
        assert!(stage.scene.is_light_visible(h.spotlight).unwrap());
    }

    #[test]
    fn held_left_button_toggles_once() {
        let mut stage = stage();
        let mut controller = FrameController::default();
        let frames = parse_script("- { dt: 0.016, repeat: 30, buttons: [Left] }").unwrap();
        assert_eq!(simulate(&mut stage, &mut controller, &frames).unwrap(), 1);
    }

    #[test]
    fn dump_reflects_simulation() {
        let mut stage = stage();
        let mut controller = FrameController::default();
        let frames = parse_script("- { dt: 0.2, keys: [L] }").unwrap();
        simulate(&mut stage, &mut controller, &frames).unwrap();
        let text = dump(&stage).unwrap();
        assert!(text.contains("[entityNode] pos=(50.00, 25.00, 0.00)"));
        assert!(text.contains("light SpotLight (spot) on"));
    }

    #[test]
    fn extra_materials_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materials.json");
        let mut library = MaterialLibrary::new();
        library.insert(stagehand_assets::Material {
            name: "Custom/Blue".into(),
            ..Default::default()
        });
        library.save_json(&path).unwrap();

        let stage = load_stage(&AppConfig::default(), Some(&path)).unwrap();
        assert!(stage.materials.contains("Custom/Blue"));
        assert!(stage.materials.contains("Examples/Rockwall"));
    }
}
