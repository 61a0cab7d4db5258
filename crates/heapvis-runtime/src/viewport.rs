use std::str::FromStr;

use heapvis_types::Point;

use crate::ViewKind;

/// Zoom factor applied by one scroll notch or zoom key.
pub const ZOOM_STEP: f64 = 1.25;
/// Keyboard pan distance without and with the large-step modifier.
pub const PAN_STEP: f64 = 50.0;
pub const PAN_STEP_LARGE: f64 = 500.0;
/// Bounds of the zoom factor.
pub const MIN_ZOOM: f64 = 1e-3;
pub const MAX_ZOOM: f64 = 1e3;

/// Which point stays fixed on screen while zooming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoomAnchor {
    /// The canvas origin; content under the pointer drifts.
    #[default]
    Origin,
    /// The pointer position.
    Pointer,
}

impl FromStr for ZoomAnchor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "origin" => Ok(Self::Origin),
            "pointer" => Ok(Self::Pointer),
            other => Err(format!(
                "unknown zoom anchor {other:?} (expected origin or pointer)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    /// Shift held: pan by the large step.
    pub large: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self { key, large: false }
    }

    pub fn large(key: Key) -> Self {
        Self { key, large: true }
    }
}

/// Pan/zoom and pointer state of the main canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub active: ViewKind,
    pub zoom: f64,
    pub pan: Point,
    /// Last pointer position while a button is held.
    pub dragging: Option<Point>,
    /// Whether the pointer moved since the button went down.
    pub moved: bool,
    pub pointer: Point,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            active: ViewKind::default(),
            zoom: 1.0,
            pan: Point::ORIGIN,
            dragging: None,
            moved: false,
            pointer: Point::ORIGIN,
        }
    }
}

impl ViewState {
    /// Multiplies the zoom by `ratio`, within [`MIN_ZOOM`, `MAX_ZOOM`],
    /// adjusting the pan so the anchor keeps its apparent position.
    pub fn zoom_by(&mut self, ratio: f64, anchor: ZoomAnchor) {
        if !(ratio.is_finite() && ratio > 0.0) {
            return;
        }
        let zoom = (self.zoom * ratio).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = zoom / self.zoom;
        self.zoom = zoom;
        self.pan = match anchor {
            ZoomAnchor::Origin => self.pan * ratio,
            ZoomAnchor::Pointer => self.pointer - (self.pointer - self.pan) * ratio,
        };
    }

    pub fn zoom_in(&mut self, anchor: ZoomAnchor) {
        self.zoom_by(ZOOM_STEP, anchor);
    }

    pub fn zoom_out(&mut self, anchor: ZoomAnchor) {
        self.zoom_by(1.0 / ZOOM_STEP, anchor);
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Point::ORIGIN;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan + Point::new(dx, dy);
    }

    pub fn press(&mut self, at: Point) {
        self.pointer = at;
        self.dragging = Some(at);
        self.moved = false;
    }

    /// Records a pointer move, panning when a button is held. Returns
    /// whether the pan changed.
    pub fn move_to(&mut self, at: Point) -> bool {
        self.pointer = at;
        let Some(last) = self.dragging else {
            return false;
        };
        if last == at {
            return false;
        }
        self.pan = self.pan + (at - last);
        self.dragging = Some(at);
        self.moved = true;
        true
    }

    /// Ends a drag. Returns whether this release counts as a click.
    pub fn release(&mut self, at: Point) -> bool {
        self.move_to(at);
        let click = self.dragging.is_some() && !self.moved;
        self.dragging = None;
        self.moved = false;
        click
    }

    pub fn scroll(&mut self, direction: ScrollDirection, anchor: ZoomAnchor) {
        match direction {
            ScrollDirection::Up => self.zoom_in(anchor),
            ScrollDirection::Down => self.zoom_out(anchor),
        }
    }

    /// Applies a key binding. Returns whether the viewport changed.
    pub fn key(&mut self, press: KeyPress, anchor: ZoomAnchor) -> bool {
        let step = if press.large { PAN_STEP_LARGE } else { PAN_STEP };
        match press.key {
            Key::Char('+') | Key::Char('=') => self.zoom_in(anchor),
            Key::Char('-') => self.zoom_out(anchor),
            Key::Char('0') => self.reset(),
            Key::Left => self.pan_by(step, 0.0),
            Key::Right => self.pan_by(-step, 0.0),
            Key::Up => self.pan_by(0.0, step),
            Key::Down => self.pan_by(0.0, -step),
            Key::Char(_) => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn zoom_in_then_out_restores_state() {
        for anchor in [ZoomAnchor::Origin, ZoomAnchor::Pointer] {
            let mut state = ViewState {
                pan: Point::new(30.0, -12.0),
                pointer: Point::new(200.0, 80.0),
                ..ViewState::default()
            };
            let before = state.clone();
            state.zoom_in(anchor);
            assert!((state.zoom - 1.25).abs() < 1e-12);
            state.zoom_out(anchor);
            assert!((state.zoom - before.zoom).abs() < 1e-12);
            assert!(close(state.pan, before.pan), "{anchor:?}: {:?}", state.pan);
        }
    }

    #[test]
    fn origin_anchor_scales_pan() {
        let mut state = ViewState {
            pan: Point::new(40.0, 8.0),
            ..ViewState::default()
        };
        state.zoom_in(ZoomAnchor::Origin);
        assert!(close(state.pan, Point::new(50.0, 10.0)));
    }

    #[test]
    fn pointer_anchor_keeps_pointer_content_still() {
        let mut state = ViewState {
            pan: Point::new(10.0, 10.0),
            pointer: Point::new(110.0, 60.0),
            ..ViewState::default()
        };
        // Content coordinate under the pointer before and after.
        let under = |s: &ViewState| (s.pointer - s.pan) * (1.0 / s.zoom);
        let before = under(&state);
        state.zoom_in(ZoomAnchor::Pointer);
        assert!(close(under(&state), before));
    }

    #[test]
    fn drag_pans_and_suppresses_click() {
        let mut state = ViewState::default();
        state.press(Point::new(10.0, 10.0));
        assert!(state.move_to(Point::new(15.0, 7.0)));
        assert!(!state.release(Point::new(15.0, 7.0)));
        assert_eq!(state.pan, Point::new(5.0, -3.0));

        state.press(Point::new(1.0, 1.0));
        assert!(state.release(Point::new(1.0, 1.0)));
        assert_eq!(state.pan, Point::new(5.0, -3.0));

        assert!(!state.move_to(Point::new(50.0, 50.0)));
    }

    #[test]
    fn keys_pan_zoom_and_reset() {
        let mut state = ViewState::default();
        assert!(state.key(KeyPress::new(Key::Left), ZoomAnchor::Origin));
        assert!(state.key(KeyPress::large(Key::Up), ZoomAnchor::Origin));
        assert_eq!(state.pan, Point::new(PAN_STEP, PAN_STEP_LARGE));
        assert!(state.key(KeyPress::new(Key::Char('+')), ZoomAnchor::Origin));
        assert!(state.zoom > 1.0);
        assert!(state.key(KeyPress::new(Key::Char('0')), ZoomAnchor::Origin));
        assert_eq!((state.zoom, state.pan), (1.0, Point::ORIGIN));
        assert!(!state.key(KeyPress::new(Key::Char('q')), ZoomAnchor::Origin));
    }

    #[test]
    fn non_positive_ratios_are_ignored() {
        let mut state = ViewState::default();
        state.zoom_by(0.0, ZoomAnchor::Origin);
        state.zoom_by(f64::NAN, ZoomAnchor::Origin);
        assert_eq!(state.zoom, 1.0);
    }

    #[test]
    fn zoom_stays_within_bounds() {
        let mut state = ViewState::default();
        state.pointer = Point::new(30.0, 40.0);
        for _ in 0..5000 {
            state.scroll(ScrollDirection::Down, ZoomAnchor::Pointer);
        }
        assert_eq!(state.zoom, MIN_ZOOM);
        assert!(state.pan.x.is_finite() && state.pan.y.is_finite());

        // Still anchored at the pointer once the bound is hit.
        let under = |s: &ViewState| (s.pointer - s.pan) * (1.0 / s.zoom);
        let before = under(&state);
        state.zoom_in(ZoomAnchor::Pointer);
        let after = under(&state);
        assert!((before.x - after.x).abs() < 1e-6 && (before.y - after.y).abs() < 1e-6);

        for _ in 0..5000 {
            state.zoom_in(ZoomAnchor::Origin);
        }
        assert_eq!(state.zoom, MAX_ZOOM);
        assert!(state.pan.x.is_finite() && state.pan.y.is_finite());
    }
}
