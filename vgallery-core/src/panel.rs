//! Live parameter panels.
//!
//! A thing may carry an ordered list of [`ParameterSpec`]s. When it is added to the
//! coordinator each parameter becomes a control in a labeled group on the
//! [`ParameterHost`]. Controls are bound to shared values, so edits made through the
//! host are seen by the simulation and vice versa.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A value shared between the simulation and a parameter control.
pub struct Tunable<T: Copy>(Rc<Cell<T>>);

impl<T: Copy> Tunable<T> {
    pub fn new(value: T) -> Self {
        Tunable(Rc::new(Cell::new(value)))
    }

    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn set(&self, value: T) {
        self.0.set(value);
    }
}

impl<T: Copy> Clone for Tunable<T> {
    fn clone(&self) -> Self {
        Tunable(Rc::clone(&self.0))
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Tunable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tunable").field(&self.get()).finish()
    }
}

/// Getter/setter pair for a numeric property living anywhere.
#[derive(Clone)]
pub struct NumberBinding {
    get: Rc<dyn Fn() -> f32>,
    set: Rc<dyn Fn(f32)>,
}

impl NumberBinding {
    pub fn from_fns(get: impl Fn() -> f32 + 'static, set: impl Fn(f32) + 'static) -> Self {
        Self { get: Rc::new(get), set: Rc::new(set) }
    }

    pub fn get(&self) -> f32 {
        (self.get)()
    }

    pub fn set(&self, value: f32) {
        (self.set)(value)
    }
}

impl From<&Tunable<f32>> for NumberBinding {
    fn from(tunable: &Tunable<f32>) -> Self {
        let read = tunable.clone();
        let write = tunable.clone();
        NumberBinding::from_fns(move || read.get(), move |v| write.set(v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f32,
    pub max: f32,
    pub step: Option<f32>,
}

impl Range {
    /// Clamp into range and snap to the nearest step above `min`.
    pub fn apply(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        match self.step {
            Some(step) if step > 0.0 => {
                let snapped = self.min + ((clamped - self.min) / step).round() * step;
                snapped.min(self.max)
            }
            _ => clamped,
        }
    }
}

#[derive(Clone)]
pub enum Binding {
    Number { binding: NumberBinding, range: Option<Range> },
    Toggle(Tunable<bool>),
    Color(Tunable<[f32; 3]>),
}

/// One tunable-value descriptor.
#[derive(Clone)]
pub struct ParameterSpec {
    pub label: String,
    pub binding: Binding,
}

impl ParameterSpec {
    /// Numeric slider with bounds and an optional step.
    pub fn range(
        label: impl Into<String>,
        binding: impl Into<NumberBinding>,
        min: f32,
        max: f32,
        step: Option<f32>,
    ) -> Self {
        Self {
            label: label.into(),
            binding: Binding::Number { binding: binding.into(), range: Some(Range { min, max, step }) },
        }
    }

    /// Unconstrained numeric field, only labeled.
    pub fn free(label: impl Into<String>, binding: impl Into<NumberBinding>) -> Self {
        Self { label: label.into(), binding: Binding::Number { binding: binding.into(), range: None } }
    }

    pub fn toggle(label: impl Into<String>, value: &Tunable<bool>) -> Self {
        Self { label: label.into(), binding: Binding::Toggle(value.clone()) }
    }

    pub fn color(label: impl Into<String>, value: &Tunable<[f32; 3]>) -> Self {
        Self { label: label.into(), binding: Binding::Color(value.clone()) }
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.binding {
            Binding::Number { range: Some(_), .. } => "range",
            Binding::Number { range: None, .. } => "number",
            Binding::Toggle(_) => "toggle",
            Binding::Color(_) => "color",
        };
        f.debug_struct("ParameterSpec").field("label", &self.label).field("kind", &kind).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(u32);

/// The UI side of parameter panels.
pub trait ParameterHost {
    /// Create a labeled group with one control per parameter, plus a remove control when `removable`.
    fn create_group(&mut self, label: &str, controls: Vec<ParameterSpec>, removable: bool) -> PanelId;

    fn destroy_group(&mut self, id: PanelId);

    /// Groups whose remove control was used since the last call.
    fn take_remove_requests(&mut self) -> Vec<PanelId>;
}

#[derive(Debug)]
pub struct PanelGroup {
    pub label: String,
    pub controls: Vec<ParameterSpec>,
    pub removable: bool,
}

/// In-memory parameter host. Front-ends drive it through `set_number` and friends.
#[derive(Debug, Default)]
pub struct PanelBoard {
    groups: BTreeMap<PanelId, PanelGroup>,
    next_id: u32,
    remove_requests: Vec<PanelId>,
}

impl PanelBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, id: PanelId) -> Option<&PanelGroup> {
        self.groups.get(&id)
    }

    pub fn find(&self, label: &str) -> Option<PanelId> {
        self.groups.iter().find(|(_, g)| g.label == label).map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn control(&self, id: PanelId, label: &str) -> Option<&ParameterSpec> {
        self.groups.get(&id)?.controls.iter().find(|c| c.label == label)
    }

    /// Current value of a numeric control.
    pub fn number(&self, id: PanelId, label: &str) -> Option<f32> {
        match &self.control(id, label)?.binding {
            Binding::Number { binding, .. } => Some(binding.get()),
            _ => None,
        }
    }

    /// Write through a numeric control. Returns the value actually stored.
    pub fn set_number(&mut self, id: PanelId, label: &str, value: f32) -> Option<f32> {
        match &self.control(id, label)?.binding {
            Binding::Number { binding, range } => {
                let value = range.map_or(value, |r| r.apply(value));
                binding.set(value);
                Some(value)
            }
            _ => None,
        }
    }

    pub fn set_toggle(&mut self, id: PanelId, label: &str, value: bool) -> bool {
        match self.control(id, label).map(|c| &c.binding) {
            Some(Binding::Toggle(t)) => {
                t.set(value);
                true
            }
            _ => false,
        }
    }

    pub fn set_color(&mut self, id: PanelId, label: &str, value: [f32; 3]) -> bool {
        match self.control(id, label).map(|c| &c.binding) {
            Some(Binding::Color(t)) => {
                t.set(value.map(|c| c.clamp(0.0, 1.0)));
                true
            }
            _ => false,
        }
    }

    /// Use the group's remove control. False when the group has none.
    pub fn press_remove(&mut self, id: PanelId) -> bool {
        match self.groups.get(&id) {
            Some(group) if group.removable => {
                self.remove_requests.push(id);
                true
            }
            _ => false,
        }
    }
}

impl ParameterHost for PanelBoard {
    fn create_group(&mut self, label: &str, controls: Vec<ParameterSpec>, removable: bool) -> PanelId {
        let id = PanelId(self.next_id);
        self.next_id += 1;
        self.groups.insert(id, PanelGroup { label: label.to_string(), controls, removable });
        id
    }

    fn destroy_group(&mut self, id: PanelId) {
        self.groups.remove(&id);
        self.remove_requests.retain(|r| *r != id);
    }

    fn take_remove_requests(&mut self) -> Vec<PanelId> {
        std::mem::take(&mut self.remove_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_clamps_and_snaps() {
        let range = Range { min: -100.0, max: 10.0, step: Some(0.5) };
        assert_eq!(range.apply(50.0), 10.0);
        assert_eq!(range.apply(-200.0), -100.0);
        assert_eq!(range.apply(-9.74), -9.5);
        let free = Range { min: 0.0, max: 1.0, step: None };
        assert_eq!(free.apply(0.33), 0.33);
    }

    #[test]
    fn controls_write_through_to_shared_value() {
        let gravity = Tunable::new(-30.0_f32);
        let mut board = PanelBoard::new();
        let id = board.create_group(
            "world",
            vec![ParameterSpec::range("gravity", &gravity, -100.0, 10.0, Some(0.1))],
            false,
        );

        assert_eq!(board.number(id, "gravity"), Some(-30.0));
        board.set_number(id, "gravity", -500.0);
        assert_eq!(gravity.get(), -100.0);

        gravity.set(-9.0);
        assert_eq!(board.number(id, "gravity"), Some(-9.0));
        assert_eq!(board.number(id, "missing"), None);
    }

    #[test]
    fn remove_control_only_on_removable_groups() {
        let mut board = PanelBoard::new();
        let fixed = board.create_group("settings", Vec::new(), false);
        let prop = board.create_group("bird_1", Vec::new(), true);

        assert!(!board.press_remove(fixed));
        assert!(board.press_remove(prop));
        assert_eq!(board.take_remove_requests(), vec![prop]);
        assert!(board.take_remove_requests().is_empty());

        board.destroy_group(prop);
        assert!(board.group(prop).is_none());
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn toggle_and_color_controls() {
        let visible = Tunable::new(true);
        let tint = Tunable::new([0.2, 0.2, 0.2]);
        let mut board = PanelBoard::new();
        let id = board.create_group(
            "floor",
            vec![ParameterSpec::toggle("visible", &visible), ParameterSpec::color("tint", &tint)],
            true,
        );
        assert!(board.set_toggle(id, "visible", false));
        assert!(!visible.get());
        assert!(board.set_color(id, "tint", [2.0, 0.5, -1.0]));
        assert_eq!(tint.get(), [1.0, 0.5, 0.0]);
        assert!(!board.set_toggle(id, "tint", true));
    }
}
