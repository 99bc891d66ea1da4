use glam::Vec3;
use log::{debug, warn};

/// Audio backend as seen by the frame loop. Only its lifecycle is driven
/// from here.
pub trait AudioEngine {
    fn suspend(&mut self);
    fn resume(&mut self);
    /// Returns false when the engine could not update this frame.
    fn update(&mut self) -> bool;
    /// Returns true when the engine came back after a reset.
    fn reset(&mut self) -> bool;
    fn is_critical_error(&self) -> bool;
    fn set_listener_position(&mut self, position: Vec3);
}

/// Engine with no output device. Always healthy.
#[derive(Debug, Default)]
pub struct SilentAudio {
    suspended: bool,
    listener: Vec3,
}

impl AudioEngine for SilentAudio {
    fn suspend(&mut self) {
        self.suspended = true;
    }

    fn resume(&mut self) {
        self.suspended = false;
    }

    fn update(&mut self) -> bool {
        true
    }

    fn reset(&mut self) -> bool {
        true
    }

    fn is_critical_error(&self) -> bool {
        false
    }

    fn set_listener_position(&mut self, position: Vec3) {
        self.listener = position;
    }
}

/// Owns an engine and its retry flag.
pub struct AudioLifecycle {
    engine: Box<dyn AudioEngine>,
    retry: bool,
}

impl AudioLifecycle {
    pub fn new(engine: Box<dyn AudioEngine>) -> Self {
        Self {
            engine,
            retry: false,
        }
    }

    /// Asks for a reset on the next update. The output device may have
    /// changed while the app was suspended.
    pub fn request_retry(&mut self) {
        self.retry = true;
    }

    #[cfg(test)]
    pub fn retry_pending(&self) -> bool {
        self.retry
    }

    pub fn update(&mut self, listener: Vec3) {
        self.engine.set_listener_position(listener);

        if self.retry {
            self.retry = false;
            if self.engine.reset() {
                debug!("Audio engine reset");
            }
        } else if !self.engine.update() && self.engine.is_critical_error() {
            warn!("Audio engine critical error, retrying next update");
            self.retry = true;
        }
    }

    pub fn suspend(&mut self) {
        self.engine.suspend();
    }

    pub fn resume(&mut self) {
        self.engine.resume();
    }
}

impl Default for AudioLifecycle {
    fn default() -> Self {
        Self::new(Box::<SilentAudio>::default())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Default)]
    struct Log {
        calls: Vec<&'static str>,
        failing_updates: usize,
    }

    struct ScriptedAudio(Rc<RefCell<Log>>);

    impl AudioEngine for ScriptedAudio {
        fn suspend(&mut self) {
            self.0.borrow_mut().calls.push("suspend");
        }

        fn resume(&mut self) {
            self.0.borrow_mut().calls.push("resume");
        }

        fn update(&mut self) -> bool {
            let mut log = self.0.borrow_mut();
            log.calls.push("update");
            if log.failing_updates > 0 {
                log.failing_updates -= 1;
                false
            } else {
                true
            }
        }

        fn reset(&mut self) -> bool {
            self.0.borrow_mut().calls.push("reset");
            true
        }

        fn is_critical_error(&self) -> bool {
            true
        }

        fn set_listener_position(&mut self, _: Vec3) {}
    }

    fn scripted(failing_updates: usize) -> (AudioLifecycle, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log {
            failing_updates,
            ..Default::default()
        }));
        let lifecycle = AudioLifecycle::new(Box::new(ScriptedAudio(Rc::clone(&log))));
        (lifecycle, log)
    }

    #[test]
    fn critical_failure_resets_on_the_next_update() {
        let (mut audio, log) = scripted(1);
        audio.update(Vec3::ZERO);
        assert!(audio.retry_pending());
        audio.update(Vec3::ZERO);
        assert!(!audio.retry_pending());
        audio.update(Vec3::ZERO);
        assert_eq!(log.borrow().calls, ["update", "reset", "update"]);
    }

    #[test]
    fn requested_retry_replaces_one_update() {
        let (mut audio, log) = scripted(0);
        audio.request_retry();
        audio.update(Vec3::ZERO);
        assert_eq!(log.borrow().calls, ["reset"]);
    }

    #[test]
    fn suspend_and_resume_pass_through() {
        let (mut audio, log) = scripted(0);
        audio.suspend();
        audio.resume();
        assert_eq!(log.borrow().calls, ["suspend", "resume"]);
    }
}
