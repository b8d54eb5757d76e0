use clap::Parser;
use splat_lib::wgpu;
use splat_lib::{
    decode, CameraController, OrbitCamera, PointerButton, PointerEvent, SplatCloud, SplatRenderer,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

/// One wheel line in pixel-like units, matching typical wheel hardware.
const WHEEL_LINE_PX: f32 = 100.0;

#[derive(Parser, Debug)]
#[command(
    name = "Splat Viewer",
    version = "1.0",
    about = "Renders Gaussian splat PLY files with an orbiting camera"
)]
struct Cli {
    #[arg(
        short = 'i',
        long = "input",
        value_name = "INPUT",
        required = true,
        help = "Path to the input PLY file."
    )]
    input: PathBuf,

    #[arg(long, default_value = "1280", help = "Initial window width in pixels.")]
    width: u32,

    #[arg(long, default_value = "720", help = "Initial window height in pixels.")]
    height: u32,
}

struct App {
    cli: Cli,
    cloud: SplatCloud,
    window: Option<Arc<Window>>,
    renderer: Option<SplatRenderer>,
    camera: OrbitCamera,
    controller: CameraController,
    cursor: (f32, f32),
}

impl App {
    fn new(cli: Cli, cloud: SplatCloud) -> Self {
        Self {
            cli,
            cloud,
            window: None,
            renderer: None,
            camera: OrbitCamera::default(),
            controller: CameraController::new(),
            cursor: (0.0, 0.0),
        }
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.controller.handle(event, &mut self.camera);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        let title = format!(
            "Splat Viewer - {}",
            self.cli.input.file_name().unwrap_or_default().to_string_lossy()
        );
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(title)
                    .with_inner_size(PhysicalSize::new(self.cli.width, self.cli.height)),
            )
            .unwrap_or_else(|e| {
                eprintln!("Error creating window: {}", e);
                process::exit(1);
            });
        let window = Arc::new(window);
        let size = window.inner_size();

        let mut renderer = SplatRenderer::new(window.clone(), size.width, size.height)
            .unwrap_or_else(|e| {
                eprintln!("Error initializing renderer: {}", e);
                process::exit(1);
            });
        renderer.load(&self.cloud).unwrap_or_else(|e| {
            eprintln!("Error uploading splats: {}", e);
            process::exit(1);
        });

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                self.pointer(PointerEvent::Moved {
                    x: self.cursor.0,
                    y: self.cursor.1,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => PointerButton::Primary,
                    MouseButton::Right => PointerButton::Secondary,
                    _ => return,
                };
                let event = match state {
                    ElementState::Pressed => PointerEvent::Pressed {
                        button,
                        x: self.cursor.0,
                        y: self.cursor.1,
                    },
                    ElementState::Released => PointerEvent::Released { button },
                };
                self.pointer(event);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // Positive wheel travel zooms out, as on the web.
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE_PX,
                    MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                };
                self.pointer(PointerEvent::Wheel { delta });
            }
            WindowEvent::RedrawRequested => {
                let Some(renderer) = &mut self.renderer else {
                    return;
                };
                match renderer.render(&self.camera) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (w, h) = renderer.size();
                        renderer.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        eprintln!("Error: the GPU ran out of memory.");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("dropped frame: {}", e),
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let raw_data = std::fs::read(&cli.input).unwrap_or_else(|e| {
        eprintln!("Error reading input file {}: {}", cli.input.display(), e);
        process::exit(1);
    });

    let start = Instant::now();
    let cloud = decode(&raw_data).unwrap_or_else(|e| {
        eprintln!("Error decoding {}: {}", cli.input.display(), e);
        process::exit(1);
    });
    println!(
        "Decoded {} splats in {} ms",
        cloud.num_points,
        start.elapsed().as_millis()
    );

    let event_loop = EventLoop::new().unwrap_or_else(|e| {
        eprintln!("Error creating event loop: {}", e);
        process::exit(1);
    });
    let mut app = App::new(cli, cloud);
    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {}", e);
        process::exit(1);
    }
}
