use anyhow::{Context, Result};
use winit::event_loop::{ControlFlow, EventLoop};

mod app;
mod assets;
mod audio;
mod camera;
mod config;
mod game;
mod input;
mod logging;
mod renderer;
mod scene;
mod time;
mod transform;
mod window;

fn main() -> Result<()> {
    let config = config::Config::from_env()?;
    logging::init_logging(&config.logging);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::App::new(config);
    event_loop
        .run_app(&mut app)
        .context("Event loop terminated abnormally")?;

    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
