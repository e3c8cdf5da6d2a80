use crate::Args;
use crate::input::{self, Command};
use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use vsearch_core::Phase;
use vsearch_experiment::{
    ExperimentConfig, ExperimentEvent, ExperimentStateMachine, ExperimentView,
};
use vsearch_render::SkiaRenderer;
use vsearch_timing::{HighPrecisionTimer, Timer};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

/// Deadlines closer than this are waited out inside the frame so that
/// onsets and timeouts are not rounded up to the next redraw.
const PRECISE_WAIT: Duration = Duration::from_millis(2);

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    experiment: ExperimentStateMachine<HighPrecisionTimer, StdRng>,
    renderer: Option<SkiaRenderer>,

    output_dir: PathBuf,
    windowed: bool,
    /// Participant id typed on the setup screen.
    entry: String,

    should_exit: bool,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let config = ExperimentConfig::default();
        let timer = HighPrecisionTimer::new();
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut experiment = ExperimentStateMachine::new(config, timer, rng);

        let mut entry = String::new();
        if let Some(participant) = args.participant {
            if let Err(e) = experiment.start(&participant) {
                warn!("{e}; enter an id on the setup screen");
            }
            entry = participant;
        }

        Ok(Self {
            window: None,
            pixels: None,
            experiment,
            renderer: None,
            output_dir: args.output_dir,
            windowed: args.windowed,
            entry,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "visual search experiment"
        );
        info!("F = target present, J = target absent, ESC exits");

        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;

        let mut window_attributes = Window::default_attributes()
            .with_title("Visual Search")
            .with_resizable(self.windowed);
        window_attributes = if self.windowed {
            window_attributes.with_inner_size(LogicalSize::new(1024.0, 768.0))
        } else {
            window_attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
        };

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        info!(
            width = physical_size.width,
            height = physical_size.height,
            scale_factor = window.scale_factor(),
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            self.experiment.config().grid_size,
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };
        renderer.set_entry_len(self.entry.chars().count());

        let view = self.experiment.view();
        let stats = renderer.render_frame(&view, pixels.frame_mut(), self.experiment.timer())?;
        pixels.render()?;

        trace!(
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            total_ms = stats.total.as_secs_f64() * 1e3,
            "frame"
        );
        Ok(())
    }

    fn update(&mut self) {
        if let Some(deadline) = self.experiment.next_deadline_ns() {
            let timer = self.experiment.timer();
            let remaining = Duration::from_nanos(deadline.saturating_sub(timer.now()));
            if !remaining.is_zero() && remaining <= PRECISE_WAIT {
                timer.sleep(remaining);
            }
        }

        for event in self.experiment.update() {
            match event {
                ExperimentEvent::SessionComplete => {
                    info!("session complete: E exports, R restarts");
                }
                ExperimentEvent::TimedOut { .. } => self.log_feedback(),
                other => debug!(?other, "experiment event"),
            }
        }
    }

    fn log_feedback(&self) {
        if let ExperimentView::Feedback { outcome, progress } = self.experiment.view() {
            info!(trial = progress.0 + 1, total = progress.1, "{}", outcome.message());
        }
    }

    fn handle_input(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        if event.repeat {
            return;
        }
        let Some(command) =
            input::map_key(self.experiment.phase(), event.physical_key, &event.logical_key)
        else {
            return;
        };

        match command {
            Command::Quit => self.cleanup_and_exit(event_loop),
            Command::Type(_) | Command::Backspace => input::edit_entry(&mut self.entry, &command),
            Command::Submit => {
                if let Err(e) = self.experiment.start(&self.entry) {
                    warn!("{e}");
                }
            }
            Command::Proceed => {
                self.experiment.proceed();
            }
            Command::Respond(present) => {
                if self.experiment.respond(present) {
                    self.log_feedback();
                }
            }
            Command::Restart => {
                if self.experiment.restart() {
                    self.entry.clear();
                }
            }
            Command::Export => {
                if let Err(e) = self.export() {
                    error!("export failed: {e:#}");
                }
            }
        }
    }

    fn export(&self) -> Result<()> {
        let Some(csv) = self.experiment.export_csv() else {
            return Ok(());
        };
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let path = self.output_dir.join(&csv.filename);
        std::fs::write(&path, csv.contents)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "results exported");

        if let Some(json) = self.experiment.export_json()? {
            let path = self.output_dir.join(&json.filename);
            std::fs::write(&path, json.contents)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "session record exported");
        }
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!("Failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!("Failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                error!("Failed to resize renderer: {e:#}");
            }
        }
        debug!(width = new_size.width, height = new_size.height, "display resized");
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if self.experiment.phase().is_results() {
            info!("exiting from results screen");
        } else {
            let (index, total) = self.experiment.progress();
            warn!(index, total, "exiting before the session finished");
        }

        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!("Failed to create window and surface: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = self.render() {
                    error!("Render error: {e:#}");
                    event_loop.exit();
                    return;
                }
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(&event, event_loop);
            }
            WindowEvent::Resized(sz) => self.handle_resize(sz),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
