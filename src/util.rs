//! Frame timing

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// FPS counter with rolling average
pub struct FpsCounter {
    frame_times: VecDeque<f32>,
    last_frame: Instant,
    sample_count: usize,
    total_frames: u64,
    total_time: f64,
}

impl FpsCounter {
    /// Create a new FPS counter with specified sample window
    pub fn new(sample_count: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(sample_count),
            last_frame: Instant::now(),
            sample_count: sample_count.max(1),
            total_frames: 0,
            total_time: 0.0,
        }
    }

    /// Call once per frame. Returns (delta_time, rolling average fps)
    pub fn tick(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record(dt);
        (dt, self.avg_fps())
    }

    fn record(&mut self, dt: f32) {
        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.sample_count {
            self.frame_times.pop_front();
        }
        self.total_frames += 1;
        self.total_time += dt as f64;
    }

    /// Rolling average over the sample window
    pub fn avg_fps(&self) -> f32 {
        let avg_dt: f32 =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len().max(1) as f32;
        if avg_dt > 0.0 {
            1.0 / avg_dt
        } else {
            0.0
        }
    }

    /// Average over every frame since creation, for the exit summary
    pub fn session_fps(&self) -> f64 {
        if self.total_time > 0.0 {
            self.total_frames as f64 / self.total_time
        } else {
            0.0
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Time left in the current frame to hold `fps`, measured from the last tick
    pub fn remaining(&self, fps: u32) -> Duration {
        let budget = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        budget.saturating_sub(self.last_frame.elapsed())
    }
}
