//! Live snapshot of user input.
//!
//! Keys stay held from their press until their release; nothing clears them
//! implicitly. The camera polls this state once per tick.

use std::collections::HashSet;

use cgmath::Vector2;
use winit::{dpi::PhysicalPosition, keyboard::KeyCode};

#[derive(Clone, Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pointer: Option<PhysicalPosition<f64>>,
    last_pick: Option<Vector2<f32>>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn held(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.held.iter().copied()
    }

    pub fn move_pointer(&mut self, position: PhysicalPosition<f64>) {
        self.pointer = Some(position);
    }

    /// Last pointer position in physical pixels, if the pointer was ever seen.
    pub fn pointer(&self) -> Option<PhysicalPosition<f64>> {
        self.pointer
    }

    pub(crate) fn record_pick(&mut self, ndc: Vector2<f32>) {
        self.last_pick = Some(ndc);
    }

    /// Normalized device coordinates of the last pick request.
    pub fn last_pick(&self) -> Option<Vector2<f32>> {
        self.last_pick
    }
}
