use anyhow::{bail, Result};
use log::{debug, info, trace, warn};

use crate::{
    assets::{AssetSource, DirectoryAssets, ProceduralAssets},
    audio::AudioLifecycle,
    camera::{CameraController, CameraState},
    config::Config,
    input::{InputState, Key, PointerMode},
    renderer::{
        gpu::{Gpu, SurfaceErrorAction},
        postprocessing::BloomPreset,
        resources::{FrameInputs, ResourcePool},
    },
    scene::{compose_frame, SceneState},
    time::StepTimer,
    window::Size,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// No device yet.
    Uninitialized,
    Ready,
    /// Device and pool are being rebuilt.
    DeviceLost,
}

/// Frame orchestrator. Owns all mutable game state and the resource pool,
/// and is only ever touched from the event loop thread.
pub struct Game {
    state: LifecycleState,
    timer: StepTimer,
    camera: CameraState,
    controller: CameraController,
    scene: SceneState,
    preset: BloomPreset,
    input: InputState,
    audio: AudioLifecycle,
    assets: Box<dyn AssetSource>,
    gpu: Option<Gpu>,
    pool: Option<ResourcePool>,
    exit_requested: bool,
}

impl Game {
    pub fn new(config: &Config) -> Self {
        let assets: Box<dyn AssetSource> = match &config.asset_dir {
            Some(dir) => Box::new(DirectoryAssets::new(dir.clone())),
            None => Box::new(ProceduralAssets::new(config.asset_seed)),
        };

        Self {
            state: LifecycleState::Uninitialized,
            timer: StepTimer::new(),
            camera: CameraState::default(),
            controller: CameraController::default(),
            scene: SceneState::default(),
            preset: config.bloom_preset,
            input: InputState::new(),
            audio: AudioLifecycle::default(),
            assets,
            gpu: None,
            pool: None,
            exit_requested: false,
        }
    }

    /// Takes ownership of the device and builds both resource phases.
    pub fn initialize(&mut self, gpu: Gpu) -> Result<()> {
        let info = gpu.adapter_info();
        info!("Initializing on {} ({:?})", info.name, info.device_type);
        self.gpu = Some(gpu);
        self.create_pool()?;
        self.timer = StepTimer::new();
        self.state = LifecycleState::Ready;
        Ok(())
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Pointer mode the window layer should apply.
    pub fn pointer_mode(&self) -> PointerMode {
        self.input.pointer_mode()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn tick(&mut self) -> Result<()> {
        self.scene.advance_rotation();

        let steps = self.timer.tick();
        for _ in 0..steps {
            self.update();
        }

        if self.timer.frame_count() == 0 {
            return Ok(());
        }
        self.render()
    }

    fn update(&mut self) {
        trace!("Update step, elapsed {}s", self.timer.elapsed_seconds());

        if self.input.was_pressed(Key::Exit) {
            info!("Exit requested");
            self.exit_requested = true;
        }

        self.input.set_pointer_mode(if self.input.left_button() {
            PointerMode::Relative
        } else {
            PointerMode::Absolute
        });

        self.camera = self
            .controller
            .update(&self.camera, &self.input.camera_input());
        self.scene.roll(
            self.input.is_held(Key::RollLeft),
            self.input.is_held(Key::RollRight),
        );

        if self.input.was_pressed(Key::CyclePreset) {
            self.preset = self.preset.next();
            if let (Some(gpu), Some(pool)) = (&self.gpu, &mut self.pool) {
                pool.set_preset(gpu.queue(), self.preset);
            } else {
                info!("Bloom preset {}", self.preset);
            }
        }

        if self.input.was_pressed(Key::LoseDevice) {
            if let Some(gpu) = &self.gpu {
                warn!("Simulating device loss");
                gpu.mark_device_lost();
            }
        }

        self.audio.update(self.camera.position);
        self.input.end_frame();
    }

    fn render(&mut self) -> Result<()> {
        let lost = self.gpu.as_ref().is_some_and(Gpu::is_device_lost);
        if lost || self.state == LifecycleState::DeviceLost {
            return self.handle_device_lost();
        }
        if self.state != LifecycleState::Ready {
            return Ok(());
        }

        let (Some(gpu), Some(pool)) = (self.gpu.as_mut(), self.pool.as_mut()) else {
            return Ok(());
        };

        let mut frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match gpu.handle_surface_error(&err) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(()),
                    SurfaceErrorAction::DeviceLost => self.handle_device_lost(),
                    SurfaceErrorAction::Fatal => bail!("Failed to acquire frame: {err}"),
                };
            }
        };

        let items = compose_frame(&self.scene, &self.camera);
        let hud_text = format!(
            "PRESET {}  FPS {}",
            self.preset.name().to_uppercase(),
            self.timer.frames_per_second()
        );
        pool.render(
            gpu.queue(),
            &mut frame.encoder,
            &frame.view,
            &FrameInputs {
                items: &items,
                view: self.camera.view_matrix(),
                hud_text: &hud_text,
            },
        );
        gpu.present(frame);
        Ok(())
    }

    /// Abandons the current frame, tears the pool down and rebuilds it on a
    /// fresh device. A failed rebuild leaves the state at `DeviceLost` so the
    /// next render tries again.
    fn handle_device_lost(&mut self) -> Result<()> {
        warn!("Device lost, rebuilding resources");
        self.state = LifecycleState::DeviceLost;

        if let Some(pool) = self.pool.take() {
            pool.destroy();
        }
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.recreate_device()?;
        }
        self.create_pool()?;

        self.state = LifecycleState::Ready;
        info!("Device restored");
        Ok(())
    }

    fn create_pool(&mut self) -> Result<()> {
        let Some(gpu) = &self.gpu else {
            return Ok(());
        };
        let pool = ResourcePool::create(
            gpu.device(),
            gpu.queue(),
            self.assets.as_ref(),
            gpu.surface_format(),
            gpu.size(),
            self.preset,
        )?;
        self.pool = Some(pool);
        self.scene.reset_roll();
        Ok(())
    }

    /// Zero and unchanged sizes are ignored.
    pub fn resize(&mut self, size: Size) -> Result<()> {
        let (Some(gpu), Some(pool)) = (self.gpu.as_mut(), self.pool.as_mut()) else {
            return Ok(());
        };
        if !gpu.resize(size) {
            return Ok(());
        }
        pool.resize(gpu.device(), size)?;
        self.scene.reset_roll();
        Ok(())
    }

    pub fn on_activated(&mut self) {
        debug!("Activated");
    }

    pub fn on_deactivated(&mut self) {
        debug!("Deactivated");
        self.input.release_all();
    }

    pub fn on_suspending(&mut self) {
        info!("Suspending after {:.1}s", self.timer.total_seconds());
        self.audio.suspend();
    }

    pub fn on_resuming(&mut self) {
        info!("Resuming");
        self.timer.reset_elapsed_time();
        self.audio.resume();
        self.audio.request_retry();
    }

    pub fn on_window_moved(&mut self, size: Size) -> Result<()> {
        self.resize(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::START_POSITION;

    fn game() -> Game {
        Game::new(&Config::default())
    }

    fn press(game: &mut Game, key: Key) {
        game.input_mut().key_event(key, true);
        game.update();
        game.input_mut().key_event(key, false);
    }

    #[test]
    fn starts_uninitialized_and_ticks_without_a_device() {
        let mut game = game();
        assert_eq!(game.state(), LifecycleState::Uninitialized);
        game.tick().unwrap();
        game.tick().unwrap();
        assert_eq!(game.state(), LifecycleState::Uninitialized);
        assert_eq!(game.scene.rotation_degrees, 2.0);
    }

    #[test]
    fn escape_requests_exit() {
        let mut game = game();
        assert!(!game.exit_requested());
        press(&mut game, Key::Exit);
        assert!(game.exit_requested());
    }

    #[test]
    fn left_button_captures_the_pointer() {
        let mut game = game();
        game.input_mut().left_button_event(true);
        game.update();
        assert_eq!(game.pointer_mode(), PointerMode::Relative);

        game.input_mut().pointer_moved(10.0, 0.0);
        game.update();
        assert!((game.camera.yaw + 0.1).abs() < 1e-6);

        game.input_mut().left_button_event(false);
        game.update();
        assert_eq!(game.pointer_mode(), PointerMode::Absolute);
    }

    #[test]
    fn preset_key_cycles_presets() {
        let mut game = game();
        assert_eq!(game.preset, BloomPreset::Default);
        press(&mut game, Key::CyclePreset);
        assert_eq!(game.preset, BloomPreset::Soft);
        // held keys do not repeat
        game.input_mut().key_event(Key::CyclePreset, true);
        game.update();
        game.update();
        assert_eq!(game.preset, BloomPreset::Desaturated);
    }

    #[test]
    fn roll_accumulates_while_held() {
        let mut game = game();
        game.input_mut().key_event(Key::RollLeft, true);
        game.update();
        game.update();
        assert!((game.scene.ship_roll - 0.4).abs() < 1e-6);
    }

    #[test]
    fn home_returns_the_camera_to_start() {
        let mut game = game();
        game.input_mut().key_event(Key::Forward, true);
        game.update();
        assert_ne!(game.camera.position, START_POSITION);
        game.input_mut().key_event(Key::Forward, false);
        press(&mut game, Key::Home);
        assert_eq!(game.camera, CameraState::default());
    }

    #[test]
    fn losing_focus_releases_keys() {
        let mut game = game();
        game.input_mut().key_event(Key::Forward, true);
        game.on_deactivated();
        game.update();
        assert_eq!(game.camera.position, START_POSITION);
    }

    fn headless_game() -> Option<Game> {
        let gpu = Gpu::headless(Size::new(320, 180))?;
        let mut game = game();
        game.initialize(gpu).unwrap();
        Some(game)
    }

    #[test]
    fn lost_device_is_rebuilt_on_the_next_render() {
        let Some(mut game) = headless_game() else {
            return;
        };
        assert_eq!(game.state(), LifecycleState::Ready);
        game.render().unwrap();
        let before = game.pool.as_ref().unwrap().describe();

        game.input_mut().key_event(Key::RollLeft, true);
        press(&mut game, Key::LoseDevice);
        let frame_count = game.timer.frame_count();
        assert!(game.gpu.as_ref().unwrap().is_device_lost());
        assert!(game.scene.ship_roll != 0.0);

        game.render().unwrap();
        assert_eq!(game.state(), LifecycleState::Ready);
        assert!(!game.gpu.as_ref().unwrap().is_device_lost());
        assert_eq!(game.pool.as_ref().unwrap().describe(), before);
        assert_eq!(game.timer.frame_count(), frame_count);
        assert_eq!(game.scene.ship_roll, 0.0);

        game.render().unwrap();
    }

    #[test]
    fn interrupted_recovery_is_retried() {
        let Some(mut game) = headless_game() else {
            return;
        };
        game.pool.take().unwrap().destroy();
        game.state = LifecycleState::DeviceLost;

        game.render().unwrap();
        assert_eq!(game.state(), LifecycleState::Ready);
        assert!(game.pool.is_some());
    }

    #[test]
    fn render_waits_for_a_ready_device() {
        let mut game = game();
        game.render().unwrap();
        assert_eq!(game.state(), LifecycleState::Uninitialized);
        assert!(game.pool.is_none());
    }

    #[test]
    fn resuming_schedules_an_audio_reset() {
        let mut game = game();
        game.on_suspending();
        game.on_resuming();
        assert!(game.audio.retry_pending());
        game.update();
        assert!(!game.audio.retry_pending());
    }

    #[test]
    fn resize_without_a_device_is_ignored() {
        let mut game = game();
        game.resize(Size::new(800, 600)).unwrap();
        game.on_window_moved(Size::new(0, 0)).unwrap();
        assert_eq!(game.state(), LifecycleState::Uninitialized);
    }
}
