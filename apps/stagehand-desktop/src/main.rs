use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use stagehand_assets::MaterialLibrary;
use stagehand_common::AppConfig;
use stagehand_input::{FrameController, InputState, Key, MouseButton, SceneBinding};
use stagehand_render_wgpu::{CameraMan, FrameStats, MoveIntent, WgpuRenderer};
use stagehand_scene::{Stage, build_stage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "stagehand-desktop", about = "Stagehand desktop application")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file of extra materials
    #[arg(long)]
    materials: Option<PathBuf>,
}

fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyI => Key::I,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyL => Key::L,
        KeyCode::ShiftLeft => Key::LShift,
        KeyCode::ShiftRight => Key::RShift,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

fn map_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Camera keys: WASD or arrows, page up/down for height, either shift for speed.
fn move_intent(input: &InputState) -> MoveIntent {
    MoveIntent {
        forward: input.is_key_down(Key::W) || input.is_key_down(Key::Up),
        back: input.is_key_down(Key::S) || input.is_key_down(Key::Down),
        left: input.is_key_down(Key::A) || input.is_key_down(Key::Left),
        right: input.is_key_down(Key::D) || input.is_key_down(Key::Right),
        up: input.is_key_down(Key::PageUp),
        down: input.is_key_down(Key::PageDown),
        fast: input.shift(),
    }
}

/// Application state.
struct AppState {
    config: AppConfig,
    stage: Stage,
    controller: FrameController,
    camera_man: CameraMan,
    input: InputState,
    show_stats: bool,
    show_details: bool,
    last_frame: Instant,
    frame_time: f32,
    stats: FrameStats,
    toggles: u64,
}

impl AppState {
    fn new(config: AppConfig, materials: MaterialLibrary) -> Result<Self> {
        let stage = build_stage(materials, config.window.width, config.window.height)
            .context("building the stage")?;
        Ok(Self {
            controller: FrameController::new(config.controls),
            camera_man: CameraMan::new(config.camera),
            config,
            stage,
            input: InputState::new(),
            show_stats: true,
            show_details: false,
            last_frame: Instant::now(),
            frame_time: 0.0,
            stats: FrameStats::default(),
            toggles: 0,
        })
    }

    fn update(&mut self, dt: f32) -> Result<()> {
        let h = self.stage.handles;
        self.frame_time = dt;

        let camera = self.stage.scene.camera_mut(h.camera)?;
        self.camera_man.update(camera, move_intent(&self.input), dt);

        let mut target = SceneBinding::new(&mut self.stage.scene, h.entity_node, h.spotlight);
        let actions = self.controller.frame(&self.input, dt, &mut target)?;
        self.toggles += actions.iter().filter(|a| a.is_toggle()).count() as u64;

        for event in self.stage.scene.drain_events() {
            tracing::trace!(?event, "scene");
        }
        Ok(())
    }

    /// Record a key change. Returns true when the app should quit.
    fn handle_key(&mut self, key: Key, pressed: bool, repeat: bool) -> bool {
        self.input.set_key(key, pressed);
        if !pressed || repeat {
            return false;
        }
        match key {
            Key::Escape => return true,
            Key::F => self.show_stats = !self.show_stats,
            Key::G => self.show_details = !self.show_details,
            _ => {}
        }
        false
    }

    /// Apply button and key releases. Called before egui sees the event, so
    /// a release over a panel still clears the held state.
    fn record_release(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button,
                ..
            } => {
                if let Some(button) = map_button(*button) {
                    self.input.set_button(button, false);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Released,
                        ..
                    },
                ..
            } => {
                if let Some(key) = map_key(*code) {
                    self.input.set_key(key, false);
                }
            }
            _ => {}
        }
    }

    fn looking(&self) -> bool {
        self.input.is_button_down(MouseButton::Middle)
    }

    fn look(&mut self, dx: f32, dy: f32) -> Result<()> {
        let camera = self.stage.scene.camera_mut(self.stage.handles.camera)?;
        self.camera_man.look(camera, dx, dy);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.stage
            .scene
            .resize_viewport(self.stage.handles.viewport, width, height)?;
        Ok(())
    }

    fn draw_ui(&self, ctx: &EguiContext) {
        let h = self.stage.handles;

        if self.show_stats {
            let fps = if self.frame_time > 0.0 {
                1.0 / self.frame_time
            } else {
                0.0
            };
            egui::Window::new("Frame stats")
                .anchor(egui::Align2::LEFT_BOTTOM, [8.0, -8.0])
                .resizable(false)
                .collapsible(false)
                .show(ctx, |ui| {
                    ui.label(format!("FPS: {fps:.1}"));
                    ui.label(format!("Frame: {:.2} ms", self.frame_time * 1000.0));
                    ui.label(format!("Draws: {}", self.stats.draws));
                    ui.label(format!("Triangles: {}", self.stats.triangles));
                    ui.label(format!("Lights: {}", self.stats.lights));
                });
        }

        if !self.show_details {
            return;
        }

        let scene = &self.stage.scene;
        egui::SidePanel::right("details")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading(self.config.window.title.as_str());
                ui.separator();

                if let Ok(camera) = scene.camera(h.camera) {
                    let p = camera.position;
                    ui.label(format!("Camera: ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z));
                    ui.label(format!(
                        "Yaw {:.1}°  Pitch {:.1}°",
                        camera.yaw.to_degrees(),
                        camera.pitch.to_degrees()
                    ));
                }
                if let Ok(p) = scene.node_position(h.entity_node) {
                    ui.label(format!("Entity node: ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z));
                }

                ui.separator();
                ui.heading("Lights");
                for (id, light) in scene.lights() {
                    let state = if light.visible { "on" } else { "off" };
                    let marker = if id == h.spotlight { " *" } else { "" };
                    ui.label(format!("{} ({}) {state}{marker}", light.name, light.kind.label()));
                }
                ui.label(format!("Toggles: {}", self.toggles));
                ui.label(format!("Cooldown: {:.2} s", self.controller.toggle_timer()));

                ui.separator();
                ui.small("IJKL/UO: move | Shift+J/L: turn | LMB/RMB: spotlight");
                ui.small("WASD/PgUp/PgDn: camera | MMB: look | F/G: panels | Esc: quit");
            });
    }
}

struct GpuApp {
    state: AppState,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    renderer: Option<WgpuRenderer>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    /// First fault raised inside the event loop; ends the run.
    fault: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            renderer: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
            fault: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::debug!("stopping event loop: {error:#}");
        if self.fault.is_none() {
            self.fault = Some(error);
        }
        event_loop.exit();
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let settings = &self.state.config.window;
        let attrs = Window::default_attributes()
            .with_title(settings.title.as_str())
            .with_inner_size(PhysicalSize::new(settings.width, settings.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("creating the window")?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the render surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable graphics adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("stagehand_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("creating the graphics device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .context("surface reports no alpha modes")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        self.state.resize(config.width, config.height)?;

        let renderer = WgpuRenderer::new(
            &device,
            surface_format,
            config.width,
            config.height,
            &self.state.stage.meshes,
        );

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        self.renderer = Some(renderer);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
        self.state.last_frame = now;
        self.state.update(dt)?;

        let (
            Some(window),
            Some(surface),
            Some(device),
            Some(queue),
            Some(config),
            Some(renderer),
            Some(egui_winit),
            Some(egui_renderer),
        ) = (
            &self.window,
            &self.surface,
            &self.device,
            &self.queue,
            &self.config,
            &self.renderer,
            &mut self.egui_winit,
            &mut self.egui_renderer,
        )
        else {
            return Ok(());
        };

        let output = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(device, config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out; frame skipped");
                return Ok(());
            }
            Err(e) => return Err(e).context("acquiring the next frame"),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let stage = &self.state.stage;
        self.state.stats = renderer.render(
            device,
            queue,
            &view,
            &stage.scene,
            &stage.materials,
            stage.handles.viewport,
        )?;

        let raw_input = egui_winit.take_egui_input(window);
        let state = &self.state;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            state.draw_ui(ctx);
        });
        egui_winit.handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        egui_renderer.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        output.present();
        window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.state.record_release(&event);

        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                if matches!(event, WindowEvent::MouseInput { .. }) {
                    window.set_cursor_visible(!self.state.looking());
                }
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Focused(false) => {
                self.state.input.clear();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(device, config.width, config.height);
                    }
                    let (width, height) = (config.width, config.height);
                    if let Err(e) = self.state.resize(width, height) {
                        self.fail(event_loop, e);
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let Some(key) = map_key(code) else {
                    return;
                };
                let pressed = key_state == ElementState::Pressed;
                if self.state.handle_key(key, pressed, repeat) {
                    tracing::info!("quit requested");
                    event_loop.exit();
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button) = map_button(button) {
                    self.state
                        .input
                        .set_button(button, state == ElementState::Pressed);
                }
                if let Some(window) = &self.window {
                    window.set_cursor_visible(!self.state.looking());
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.state.looking() {
                if let Err(e) = self.state.look(delta.0 as f32, delta.1 as f32) {
                    self.fail(event_loop, e);
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load_or_default(cli.config.as_deref()).context("loading settings")?;

    let mut materials = MaterialLibrary::with_builtins();
    if let Some(path) = &cli.materials {
        materials
            .load_json(path)
            .with_context(|| format!("loading materials from {}", path.display()))?;
    }

    let state = AppState::new(config, materials)?;

    let event_loop = EventLoop::new().context("creating the event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state);
    event_loop.run_app(&mut app)?;

    match app.fault.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("stagehand-desktop starting");

    // Faults end the run but never the process status.
    if let Err(e) = run(cli) {
        tracing::error!("{e:#}");
        eprintln!("An exception has occurred: {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(AppConfig::default(), MaterialLibrary::with_builtins()).unwrap()
    }

    #[test]
    fn maps_stage_keys() {
        assert_eq!(map_key(KeyCode::KeyI), Some(Key::I));
        assert_eq!(map_key(KeyCode::ShiftLeft), Some(Key::LShift));
        assert_eq!(map_key(KeyCode::PageDown), Some(Key::PageDown));
        assert_eq!(map_key(KeyCode::KeyZ), None);
        assert_eq!(
            map_button(winit::event::MouseButton::Middle),
            Some(MouseButton::Middle)
        );
        assert_eq!(map_button(winit::event::MouseButton::Back), None);
    }

    #[test]
    fn camera_keys_build_intent() {
        let input = InputState::holding(&[Key::Up, Key::D, Key::RShift], &[]);
        let intent = move_intent(&input);
        assert!(intent.forward && intent.right && intent.fast);
        assert!(!intent.back && !intent.left && !intent.up && !intent.down);
    }

    #[test]
    fn panel_keys_toggle_on_fresh_press_only() {
        let mut app = state();
        assert!(app.show_stats);
        assert!(!app.handle_key(Key::F, true, false));
        assert!(!app.show_stats);
        app.handle_key(Key::F, true, true);
        assert!(!app.show_stats);
        app.handle_key(Key::F, false, false);
        app.handle_key(Key::G, true, false);
        assert!(app.show_details);
    }

    #[test]
    fn escape_requests_quit() {
        let mut app = state();
        assert!(app.handle_key(Key::Escape, true, false));
        assert!(!app.handle_key(Key::Escape, false, false));
    }

    #[test]
    fn update_moves_entity_and_counts_toggles() {
        let mut app = state();
        let h = app.stage.handles;
        app.input.set_key(Key::U, true);
        app.input.set_button(MouseButton::Left, true);
        app.update(0.1).unwrap();

        let p = app.stage.scene.node_position(h.entity_node).unwrap();
        assert!((p.y - 50.0).abs() < 1e-3);
        assert_eq!(app.toggles, 1);
        assert!(!app.stage.scene.is_light_visible(h.spotlight).unwrap());
        assert!(app.stage.scene.events().is_empty());
    }

    fn button_event(button: winit::event::MouseButton, state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state,
            button,
        }
    }

    #[test]
    fn release_over_a_panel_still_clears_the_button() {
        let mut app = state();
        app.input.set_button(MouseButton::Right, true);
        app.update(0.1).unwrap();
        assert_eq!(app.toggles, 1);

        app.record_release(&button_event(
            winit::event::MouseButton::Right,
            ElementState::Released,
        ));
        assert!(!app.input.is_button_down(MouseButton::Right));

        // Well past the cooldown: no further toggles once released.
        for _ in 0..20 {
            app.update(0.1).unwrap();
        }
        assert_eq!(app.toggles, 1);
    }

    #[test]
    fn release_recording_ignores_presses() {
        let mut app = state();
        app.record_release(&button_event(
            winit::event::MouseButton::Left,
            ElementState::Pressed,
        ));
        assert!(!app.input.is_button_down(MouseButton::Left));

        app.input.set_button(MouseButton::Middle, true);
        app.record_release(&button_event(
            winit::event::MouseButton::Middle,
            ElementState::Released,
        ));
        assert!(!app.looking());
    }

    #[test]
    fn resize_updates_camera_aspect() {
        let mut app = state();
        app.resize(1000, 500).unwrap();
        let camera = app.stage.scene.camera(app.stage.handles.camera).unwrap();
        assert!((camera.aspect - 2.0).abs() < 1e-6);
    }
}
