use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use pollster::FutureExt as _;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowId},
};

use crate::{
    config::Config,
    game::Game,
    input::{Key, PointerMode},
    renderer::gpu::Gpu,
};

pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    game: Game,
    pointer_mode: PointerMode,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let game = Game::new(&config);
        Self {
            config,
            window: None,
            game,
            pointer_mode: PointerMode::Absolute,
            error: None,
        }
    }

    /// Error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(
                self.config.size.width,
                self.config.size.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );

        let gpu = Gpu::new(Arc::clone(&window), &self.config.gpu).block_on()?;
        self.game.initialize(gpu)?;

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Grabs or releases the cursor to follow the game's pointer mode.
    fn apply_pointer_mode(&mut self) {
        let mode = self.game.pointer_mode();
        if mode == self.pointer_mode {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };

        match mode {
            PointerMode::Relative => {
                let grabbed = window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
                if let Err(err) = grabbed {
                    warn!("Failed to grab cursor: {err}");
                }
                window.set_cursor_visible(false);
            }
            PointerMode::Absolute => {
                if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                    warn!("Failed to release cursor: {err}");
                }
                window.set_cursor_visible(true);
            }
        }
        self.pointer_mode = mode;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            self.game.on_resuming();
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.game.on_suspending();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let result = match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => self.game.resize(size.into()),
            WindowEvent::Moved(_) => match &self.window {
                Some(window) => self.game.on_window_moved(window.inner_size().into()),
                None => Ok(()),
            },
            WindowEvent::Focused(true) => {
                self.game.on_activated();
                Ok(())
            }
            WindowEvent::Focused(false) => {
                self.game.on_deactivated();
                Ok(())
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if let Some(key) = Key::from_key_code(code) {
                    self.game
                        .input_mut()
                        .key_event(key, state == ElementState::Pressed);
                }
                Ok(())
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.game
                    .input_mut()
                    .left_button_event(state == ElementState::Pressed);
                Ok(())
            }
            WindowEvent::RedrawRequested => {
                let result = self.game.tick();
                if self.game.exit_requested() {
                    event_loop.exit();
                }
                self.apply_pointer_mode();
                result
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.game.input_mut().pointer_moved(dx, dy);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
