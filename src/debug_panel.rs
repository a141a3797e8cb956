//! Runtime tweaking of scene parameters.
//!
//! A [`DebugPanel`] is a list of numeric [`Slider`]s. Each slider reads and
//! writes one `f32` of some target value through a getter/setter pair, so the
//! panel never holds a reference into the scene. [`DebugPanel::show`] draws
//! the sliders as an egui window.

use std::fmt;

type Getter<T> = Box<dyn Fn(&T) -> f32>;
type Setter<T> = Box<dyn Fn(&mut T, f32)>;

/// Bounded numeric binding into a `T`.
pub struct Slider<T: ?Sized> {
    pub label: String,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T: ?Sized> Slider<T> {
    pub fn new(
        label: &str,
        min: f32,
        max: f32,
        step: f32,
        get: impl Fn(&T) -> f32 + 'static,
        set: impl Fn(&mut T, f32) + 'static,
    ) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            label: label.to_string(),
            min,
            max,
            step: step.abs(),
            get: Box::new(get),
            set: Box::new(set),
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn get(&self, target: &T) -> f32 {
        (self.get)(target)
    }

    /// Write `value` clamped to the slider range and return what was written.
    pub fn set(&self, target: &mut T, value: f32) -> f32 {
        let value = self.clamp(value);
        (self.set)(target, value);
        value
    }

    /// Draw as an egui slider. Returns true when the user changed the value.
    pub fn ui(&self, ui: &mut egui::Ui, target: &mut T) -> bool {
        let mut value = self.get(target);
        let mut widget = egui::Slider::new(&mut value, self.min..=self.max).text(self.label.as_str());
        if self.step > 0.0 {
            widget = widget.step_by(self.step as f64);
        }
        if !ui.add(widget).changed() {
            return false;
        }
        let written = self.set(target, value);
        log::debug!("{} = {:.3}", self.label, written);
        true
    }
}

impl<T: ?Sized> fmt::Debug for Slider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slider")
            .field("label", &self.label)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

pub struct DebugPanel<T: ?Sized> {
    sliders: Vec<Slider<T>>,
}

impl<T: ?Sized> Default for DebugPanel<T> {
    fn default() -> Self {
        Self {
            sliders: Vec::new(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for DebugPanel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugPanel")
            .field("sliders", &self.sliders)
            .finish()
    }
}

impl<T: ?Sized> DebugPanel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        label: &str,
        min: f32,
        max: f32,
        step: f32,
        get: impl Fn(&T) -> f32 + 'static,
        set: impl Fn(&mut T, f32) + 'static,
    ) -> usize {
        self.sliders.push(Slider::new(label, min, max, step, get, set));
        self.sliders.len() - 1
    }

    pub fn len(&self) -> usize {
        self.sliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sliders.is_empty()
    }

    pub fn slider(&self, idx: usize) -> Option<&Slider<T>> {
        self.sliders.get(idx)
    }

    pub fn get(&self, idx: usize, target: &T) -> Option<f32> {
        self.slider(idx).map(|s| s.get(target))
    }

    pub fn set(&self, idx: usize, target: &mut T, value: f32) -> Option<f32> {
        self.slider(idx).map(|s| s.set(target, value))
    }

    /// All sliders, top to bottom. Returns true when any value changed.
    pub fn ui(&self, ui: &mut egui::Ui, target: &mut T) -> bool {
        let mut changed = false;
        for slider in &self.sliders {
            changed |= slider.ui(ui, target);
        }
        changed
    }

    /// Show the panel as a window pinned to the top right corner.
    ///
    /// Nothing is drawn for an empty panel.
    pub fn show(&self, ctx: &egui::Context, title: &str, target: &mut T) -> bool {
        if self.sliders.is_empty() {
            return false;
        }
        egui::Window::new(title)
            .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| self.ui(ui, target))
            .and_then(|response| response.inner)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Lamp {
        intensity: f32,
        height: f32,
    }

    fn panel() -> DebugPanel<Lamp> {
        let mut panel: DebugPanel<Lamp> = DebugPanel::new();
        panel.add("intensity", 0.0, 1.0, 0.001, |l: &Lamp| l.intensity, |l: &mut Lamp, v| l.intensity = v);
        panel.add("height", -5.0, 5.0, 0.001, |l: &Lamp| l.height, |l: &mut Lamp, v| l.height = v);
        panel
    }

    #[test]
    fn set_then_get_returns_the_clamped_value() {
        let panel = panel();
        let mut lamp = Lamp::default();
        for v in [-3.0, 0.0, 0.25, 0.999, 1.0, 7.5] {
            panel.set(0, &mut lamp, v);
            assert_eq!(panel.get(0, &lamp), Some(v.clamp(0.0, 1.0)));
        }
        assert_eq!(panel.set(1, &mut lamp, -9.0), Some(-5.0));
        assert_eq!(lamp.height, -5.0);
        assert_eq!(panel.set(2, &mut lamp, 1.0), None);
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let slider: Slider<Lamp> = Slider::new("x", 5.0, -5.0, -0.5, |l: &Lamp| l.height, |l: &mut Lamp, v| l.height = v);
        assert_eq!((slider.min, slider.max, slider.step), (-5.0, 5.0, 0.5));
    }

    #[test]
    fn drawing_without_input_changes_nothing() {
        let panel = panel();
        let mut lamp = Lamp {
            intensity: 0.5,
            height: 3.648,
        };
        let ctx = egui::Context::default();
        let mut changed = false;
        for _ in 0..3 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                changed |= panel.show(ctx, "Lights", &mut lamp);
            });
        }
        assert!(!changed);
        assert_eq!(
            lamp,
            Lamp {
                intensity: 0.5,
                height: 3.648
            }
        );
    }

    #[test]
    fn empty_panel_reports_no_change() {
        let panel: DebugPanel<Lamp> = DebugPanel::new();
        let mut lamp = Lamp::default();
        let ctx = egui::Context::default();
        let mut changed = true;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            changed = panel.show(ctx, "Lights", &mut lamp);
        });
        assert!(!changed);
    }
}
