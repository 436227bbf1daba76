use std::time::Duration;

use tracing::{debug, info};

use crate::{config::AnimationConfig, scene::SceneGraph};

/// Time since the scene started, advanced only by the frames the scene
/// produces.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationClock {
    elapsed: Duration,
}

impl AnimationClock {
    pub fn advance(&mut self, delta: Duration) {
        self.elapsed += delta;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Animation phase in seconds.
    pub fn phase(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }
}

/// How the loaded model moves each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelMotion {
    /// Radians added to the model's Y rotation every frame.
    pub rotation_step: f32,
    pub bob_amplitude: f32,
    /// Radians per second.
    pub bob_frequency: f32,
    /// Height the bobbing is centered on.
    pub rest_height: f32,
}

impl ModelMotion {
    pub fn new(config: &AnimationConfig, rest_height: f32) -> Self {
        Self {
            rotation_step: config.rotation_step,
            bob_amplitude: config.bob_amplitude,
            bob_frequency: config.bob_frequency,
            rest_height,
        }
    }

    /// Height of the model at `phase` seconds.
    pub fn bob_height(&self, phase: f32) -> f32 {
        self.rest_height + self.bob_amplitude * (phase * self.bob_frequency).sin()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running,
}

/// Advances the scene's time dependent transforms once per produced frame.
///
/// The rotation is a fixed step per frame, so it spins faster on displays with
/// a higher refresh rate. The bobbing follows the clock.
pub struct AnimationDriver {
    state: DriverState,
    clock: AnimationClock,
    motion: ModelMotion,
    ticks: u64,
    frames_produced: u64,
}

impl AnimationDriver {
    pub fn new(motion: ModelMotion) -> Self {
        Self {
            state: DriverState::Stopped,
            clock: AnimationClock::default(),
            motion,
            ticks: 0,
            frames_produced: 0,
        }
    }

    pub fn start(&mut self) {
        if self.state == DriverState::Stopped {
            info!("animation driver started");
            self.state = DriverState::Running;
        }
    }

    /// Stop producing frames. Once this returns `tick` does nothing.
    pub fn stop(&mut self) {
        if self.state == DriverState::Running {
            info!(
                "animation driver stopped after {} frames",
                self.frames_produced
            );
            self.state = DriverState::Stopped;
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    /// Advance the clock by `delta` and move the model, if there is one.
    ///
    /// Returns false without touching anything when the driver is stopped.
    pub fn tick(&mut self, delta: Duration, scene: &mut SceneGraph) -> bool {
        if !self.is_running() {
            return false;
        }

        self.clock.advance(delta);
        self.ticks += 1;

        if let Some(model) = scene.model_mut() {
            model.transform.rotation.y += self.motion.rotation_step;
            model.transform.translation.y = self.motion.bob_height(self.clock.phase());
        }

        true
    }

    /// Count a frame that reached the screen. Skipped frames are not counted.
    pub fn frame_drawn(&mut self) {
        self.frames_produced += 1;

        if self.frames_produced % 600 == 0 {
            debug!(
                "{} frames produced over {} ticks, phase {:.2}s",
                self.frames_produced,
                self.ticks,
                self.clock.phase()
            );
        }
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn motion(&self) -> &ModelMotion {
        &self.motion
    }

    /// Number of times the animation was advanced, drawn or not.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }
}
