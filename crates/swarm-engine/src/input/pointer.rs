/// Platform-agnostic input event, positions in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved { x: f32, y: f32 },
    PointerLeft,
}

/// Snapshot of the inputs the update pass consumes, taken at tick start.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameInputs {
    /// Pointer position in field coordinates, if the pointer is over the field.
    pub pointer: Option<[f32; 2]>,
}

/// Current pointer state for a single window.
#[derive(Debug, Default)]
pub struct PointerState {
    position: Option<(f32, f32)>,
}

impl PointerState {
    pub fn apply_event(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::PointerMoved { x, y } => self.position = Some((x, y)),
            InputEvent::PointerLeft => self.position = None,
        }
    }

    pub fn snapshot(&self) -> FrameInputs {
        FrameInputs {
            pointer: self.position.map(|(x, y)| [x, y]),
        }
    }
}
