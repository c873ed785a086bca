//! Animated texture sequences
//!
//! Sequences advance once per frame from the frame delta; polygons bound to a
//! sequence pick their texture page and UVs from the current frame when they
//! enter the transparency BSP.

use glam::{Mat2, Vec2};

/// Playback direction of a sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimTextureType {
    #[default]
    Forward,
    Backward,
    /// Ping-pong between the first and last frame
    Reverse,
}

/// One frame of an animated texture: texture page plus a UV transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexFrame {
    pub texture: u32,
    pub uv_matrix: Mat2,
    pub uv_offset: Vec2,
    /// Full scroll distance for UV-rotating sequences
    pub uv_rotate_max: f32,
    /// Scroll applied this frame
    pub current_uv_rotate: f32,
}

impl TexFrame {
    /// Frame that samples `texture` with untouched UVs
    pub fn identity(texture: u32) -> Self {
        Self {
            texture,
            uv_matrix: Mat2::IDENTITY,
            uv_offset: Vec2::ZERO,
            uv_rotate_max: 0.0,
            current_uv_rotate: 0.0,
        }
    }

    /// Map a polygon's base UV into this frame
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        self.uv_matrix * uv + self.uv_offset
    }
}

/// A looping texture animation
#[derive(Clone, Debug, PartialEq)]
pub struct AnimSequence {
    pub anim_type: AnimTextureType,
    /// UV scrolling instead of frame flipping
    pub uv_rotate: bool,
    /// Frozen sequences keep their current frame
    pub frame_lock: bool,
    /// Seconds per frame
    pub frame_rate: f32,
    pub frame_time: f32,
    pub current_frame: usize,
    pub reverse_direction: bool,
    pub frames: Vec<TexFrame>,
}

impl AnimSequence {
    pub fn new(anim_type: AnimTextureType, frame_rate: f32, frames: Vec<TexFrame>) -> Self {
        Self {
            anim_type,
            uv_rotate: false,
            frame_lock: false,
            frame_rate,
            frame_time: 0.0,
            current_frame: 0,
            reverse_direction: false,
            frames,
        }
    }

    /// Advance by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        if self.frame_lock || self.frames.is_empty() || self.frame_rate <= 0.0 {
            return;
        }

        self.frame_time += dt;

        if self.uv_rotate {
            let whole = (self.frame_time / self.frame_rate).floor();
            self.frame_time -= whole * self.frame_rate;
            let Some(frame) = self.frames.get_mut(self.current_frame) else {
                return;
            };
            frame.current_uv_rotate = self.frame_time * frame.uv_rotate_max / self.frame_rate;
            return;
        }

        if self.frame_time < self.frame_rate {
            return;
        }
        // Only one step per update, however long the frame took
        let whole = (self.frame_time / self.frame_rate).floor();
        self.frame_time -= whole * self.frame_rate;

        let count = self.frames.len();
        match self.anim_type {
            AnimTextureType::Reverse => self.step_ping_pong(count),
            AnimTextureType::Forward | AnimTextureType::Backward => {
                self.current_frame = (self.current_frame + 1) % count;
            }
        }
    }

    fn step_ping_pong(&mut self, count: usize) {
        if count < 2 {
            return;
        }
        if self.reverse_direction {
            if self.current_frame == 0 {
                self.current_frame = 1;
                self.reverse_direction = false;
            } else {
                self.current_frame -= 1;
            }
        } else if self.current_frame + 1 >= count {
            self.current_frame = count - 2;
            self.reverse_direction = true;
        } else {
            self.current_frame += 1;
        }
    }

    /// Frame seen by a polygon with the given phase offset
    pub fn frame(&self, frame_offset: usize) -> Option<&TexFrame> {
        if self.frames.is_empty() {
            return None;
        }
        self.frames.get((self.current_frame + frame_offset) % self.frames.len())
    }
}
