use std::any::Any;
use std::env;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{info, warn};
use pollster::block_on;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use phong_sandbox::{
    FrameProgram, FrameSummary, InputState, KeyCode, MouseButton, NamedKey, Renderer, Scene,
    SceneState, UniformLayout, DEFAULT_SCENE,
};

/// Aspect ratio used when no window exists.
const HEADLESS_ASPECT: f32 = 1280.0 / 720.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let scene = match &options.path {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read scene {path}"))?;
            Scene::from_xml(&xml).with_context(|| format!("failed to parse scene {path}"))?
        }
        None => {
            info!("no scene given, using the built-in scene");
            Scene::from_xml(DEFAULT_SCENE).context("failed to parse built-in scene")?
        }
    };

    if !options.json {
        println!(
            "Loaded scene with {} objects ({} lights)",
            scene.objects.len(),
            scene.lights.len()
        );
        for object in &scene.objects {
            println!(" - {} ({})", object.name, object.object_type);
        }
    }

    let program = FrameProgram::new(UniformLayout::phong(scene.settings.max_lights));
    let state = SceneState::new(&scene, &program).context("failed to set up scene")?;

    if options.summary_only {
        return run_headless(state, program, options.json);
    }

    let headless_state = state.clone();
    let headless_program = program.clone();
    match run_interactive(state, program, options.json) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install a GPU driver to enable rendering)."
                );
                run_headless(headless_state, headless_program, options.json)
            } else {
                Err(err)
            }
        }
    }
}

fn run_headless(state: SceneState, mut program: FrameProgram, json: bool) -> Result<()> {
    program.begin_frame();
    state.record_frame(&mut program, HEADLESS_ASPECT);
    print_summary(&state.summary(&program), json)
}

fn run_interactive(state: SceneState, program: FrameProgram, json: bool) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        state,
        program,
        renderer: None,
        input: InputState::new(),
        last_frame: Instant::now(),
        init_error: None,
        last_error: None,
    };
    event_loop.run_app(&mut app).context("event loop failed")?;

    if let Some(err) = app.init_error {
        return Err(err.into());
    }
    if let Some(err) = app.last_error {
        return Err(err);
    }
    print_summary(&app.state.summary(&app.program), json)
}

fn print_summary(summary: &FrameSummary, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(summary).context("failed to encode summary")?;
        println!("{text}");
    } else {
        for line in summary.lines() {
            println!("{line}");
        }
    }
    Ok(())
}

struct App {
    state: SceneState,
    program: FrameProgram,
    renderer: Option<Renderer>,
    input: InputState,
    last_frame: Instant,
    init_error: Option<WindowInitError>,
    last_error: Option<anyhow::Error>,
}

impl App {
    fn redraw(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.state.handle_input(&self.program, &self.input, dt);
        self.program.begin_frame();
        self.state.record_frame(&mut self.program, renderer.aspect());

        match renderer.render(&self.program) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(err) => warn!("surface error: {err}; retrying next frame"),
        }
        self.input.end_frame();
        Ok(())
    }

    fn fail_init(&mut self, event_loop: &ActiveEventLoop, err: WindowInitError) {
        self.init_error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Phong Sandbox")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.fail_init(event_loop, WindowInitError::from_error("window", err));
                return;
            }
        };

        let renderer = match block_on(Renderer::new(Arc::clone(&window), self.program.layout())) {
            Ok(renderer) => renderer,
            Err(err) => {
                self.fail_init(
                    event_loop,
                    WindowInitError::from_error("renderer", format!("{err:#}")),
                );
                return;
            }
        };

        let size = window.inner_size();
        self.input.set_viewport(size.width, size.height);
        self.last_frame = Instant::now();
        window.request_redraw();
        self.renderer = Some(renderer);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window_id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                renderer.resize(size);
                self.input.set_viewport(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(key) = map_keycode(code) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed if key == KeyCode::Named(NamedKey::Escape) => {
                        event_loop.exit();
                    }
                    ElementState::Pressed => self.input.set_key_down(key),
                    ElementState::Released => self.input.set_key_up(key),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let index = match button {
                    WinitMouseButton::Left => 0,
                    WinitMouseButton::Right => 1,
                    WinitMouseButton::Middle => 2,
                    WinitMouseButton::Back => 3,
                    WinitMouseButton::Forward => 4,
                    WinitMouseButton::Other(value) => value.min(u8::MAX as u16) as u8,
                };
                let button = MouseButton::new(index);
                match state {
                    ElementState::Pressed => self.input.set_mouse_button_down(button),
                    ElementState::Released => self.input.set_mouse_button_up(button),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_cursor_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.input.cursor_left(),
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.last_error = Some(err);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl std::fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn map_keycode(code: WinitKeyCode) -> Option<KeyCode> {
    use WinitKeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Enter | Key::NumpadEnter => KeyCode::Named(NamedKey::Enter),
        Key::Tab => KeyCode::Named(NamedKey::Tab),
        Key::ArrowLeft => KeyCode::Named(NamedKey::Left),
        Key::ArrowRight => KeyCode::Named(NamedKey::Right),
        Key::ArrowUp => KeyCode::Named(NamedKey::Up),
        Key::ArrowDown => KeyCode::Named(NamedKey::Down),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::Backspace => KeyCode::Named(NamedKey::Backspace),
        Key::Home => KeyCode::Named(NamedKey::Home),
        Key::End => KeyCode::Named(NamedKey::End),
        Key::PageUp => KeyCode::Named(NamedKey::PageUp),
        Key::PageDown => KeyCode::Named(NamedKey::PageDown),
        Key::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        Key::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        Key::ControlLeft => KeyCode::Named(NamedKey::LeftCtrl),
        Key::ControlRight => KeyCode::Named(NamedKey::RightCtrl),
        Key::AltLeft => KeyCode::Named(NamedKey::LeftAlt),
        Key::AltRight => KeyCode::Named(NamedKey::RightAlt),
        Key::Equal | Key::NumpadAdd => KeyCode::Named(NamedKey::Plus),
        Key::Minus | Key::NumpadSubtract => KeyCode::Named(NamedKey::Minus),
        Key::Digit0 => KeyCode::Digit(0),
        Key::Digit1 => KeyCode::Digit(1),
        Key::Digit2 => KeyCode::Digit(2),
        Key::Digit3 => KeyCode::Digit(3),
        Key::Digit4 => KeyCode::Digit(4),
        Key::Digit5 => KeyCode::Digit(5),
        Key::Digit6 => KeyCode::Digit(6),
        Key::Digit7 => KeyCode::Digit(7),
        Key::Digit8 => KeyCode::Digit(8),
        Key::Digit9 => KeyCode::Digit(9),
        Key::KeyA => KeyCode::Character('A'),
        Key::KeyB => KeyCode::Character('B'),
        Key::KeyC => KeyCode::Character('C'),
        Key::KeyD => KeyCode::Character('D'),
        Key::KeyE => KeyCode::Character('E'),
        Key::KeyF => KeyCode::Character('F'),
        Key::KeyG => KeyCode::Character('G'),
        Key::KeyH => KeyCode::Character('H'),
        Key::KeyI => KeyCode::Character('I'),
        Key::KeyJ => KeyCode::Character('J'),
        Key::KeyK => KeyCode::Character('K'),
        Key::KeyL => KeyCode::Character('L'),
        Key::KeyM => KeyCode::Character('M'),
        Key::KeyN => KeyCode::Character('N'),
        Key::KeyO => KeyCode::Character('O'),
        Key::KeyP => KeyCode::Character('P'),
        Key::KeyQ => KeyCode::Character('Q'),
        Key::KeyR => KeyCode::Character('R'),
        Key::KeyS => KeyCode::Character('S'),
        Key::KeyT => KeyCode::Character('T'),
        Key::KeyU => KeyCode::Character('U'),
        Key::KeyV => KeyCode::Character('V'),
        Key::KeyW => KeyCode::Character('W'),
        Key::KeyX => KeyCode::Character('X'),
        Key::KeyY => KeyCode::Character('Y'),
        Key::KeyZ => KeyCode::Character('Z'),
        Key::F1 => KeyCode::Function(1),
        Key::F2 => KeyCode::Function(2),
        Key::F3 => KeyCode::Function(3),
        Key::F4 => KeyCode::Function(4),
        Key::F5 => KeyCode::Function(5),
        Key::F6 => KeyCode::Function(6),
        Key::F7 => KeyCode::Function(7),
        Key::F8 => KeyCode::Function(8),
        Key::F9 => KeyCode::Function(9),
        Key::F10 => KeyCode::Function(10),
        Key::F11 => KeyCode::Function(11),
        Key::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

struct CliOptions {
    path: Option<String>,
    summary_only: bool,
    json: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut path = None;
        let mut summary_only = false;
        let mut json = false;
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--json" => json = true,
                other if other.starts_with("--") => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Usage: phong-sandbox [scene.xml] [--summary-only] [--json]"
                    ));
                }
                other => {
                    if path.replace(other.to_string()).is_some() {
                        return Err(anyhow!(
                            "Usage: phong-sandbox [scene.xml] [--summary-only] [--json]"
                        ));
                    }
                }
            }
        }
        Ok(Self {
            path,
            summary_only,
            json,
        })
    }
}
