use crate::action::Action;
use crate::state::{InputState, Key, MouseButton};
use crate::target::ControlTarget;
use glam::Vec3;
use stagehand_common::ControlSettings;

/// Per-frame reaction to unbuffered input.
///
/// Holds the only state the reactions need: the right-button cooldown and
/// whether the left button was down on the previous frame.
#[derive(Debug, Clone)]
pub struct FrameController {
    settings: ControlSettings,
    toggle_timer: f32,
    left_down_last_frame: bool,
}

impl Default for FrameController {
    fn default() -> Self {
        Self::new(ControlSettings::default())
    }
}

impl FrameController {
    pub fn new(settings: ControlSettings) -> Self {
        Self {
            settings,
            toggle_timer: 0.0,
            left_down_last_frame: false,
        }
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    /// Seconds until the right button may toggle again. Never negative.
    pub fn toggle_timer(&self) -> f32 {
        self.toggle_timer
    }

    /// Work out this frame's actions. `node_height` is the controlled
    /// node's parent-relative height; `dt` is the frame time in seconds.
    ///
    /// Yaws come before the translation. The cooldown is advanced after
    /// the buttons are read.
    pub fn plan(&mut self, input: &InputState, dt: f32, node_height: f32) -> Vec<Action> {
        let mut actions = Vec::new();
        let step = self.settings.move_speed;
        let yaw = (5.0 * self.settings.rotate_step_degrees).to_radians();
        let mut dir = Vec3::ZERO;

        if input.is_key_down(Key::I) {
            dir.z -= step;
        }
        if input.is_key_down(Key::K) {
            dir.z += step;
        }
        if input.is_key_down(Key::U) {
            dir.y += step;
        }
        if input.is_key_down(Key::O) {
            dir.y -= step;
            // Standing on the floor cancels all vertical motion, U included.
            if node_height <= self.settings.min_height {
                dir.y = 0.0;
            }
        }

        let shift = input.is_key_down(Key::LShift);
        if input.is_key_down(Key::J) {
            if shift {
                actions.push(Action::Yaw(yaw));
            } else {
                dir.x -= step;
            }
        }
        if input.is_key_down(Key::L) {
            if shift {
                actions.push(Action::Yaw(-yaw));
            } else {
                dir.x += step;
            }
        }

        let delta = dir * dt;
        if delta != Vec3::ZERO {
            actions.push(Action::Translate(delta));
        }

        let left_down = input.is_button_down(MouseButton::Left);
        if left_down && !self.left_down_last_frame {
            actions.push(Action::ToggleLight);
        }
        self.left_down_last_frame = left_down;

        if self.toggle_timer <= 0.0 && input.is_button_down(MouseButton::Right) {
            self.toggle_timer = self.settings.toggle_cooldown;
            actions.push(Action::ToggleLight);
        }

        self.toggle_timer = (self.toggle_timer - dt).max(0.0);
        actions
    }

    /// Plan this frame and apply it to `target`. Returns the applied actions.
    pub fn frame<T: ControlTarget>(
        &mut self,
        input: &InputState,
        dt: f32,
        target: &mut T,
    ) -> Result<Vec<Action>, T::Error> {
        let height = target.height()?;
        let actions = self.plan(input, dt, height);
        for action in &actions {
            apply(target, *action)?;
        }
        Ok(actions)
    }
}

/// Apply a single action to a target.
pub fn apply<T: ControlTarget>(target: &mut T, action: Action) -> Result<(), T::Error> {
    match action {
        Action::Translate(delta) => target.translate_local(delta),
        Action::Yaw(radians) => target.yaw(radians),
        Action::ToggleLight => {
            let on = target.toggle_light()?;
            tracing::debug!("light toggled {}", if on { "on" } else { "off" });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    const DT: f32 = 0.1;

    #[derive(Default)]
    struct Probe {
        position: Vec3,
        yaw: f32,
        light_on: bool,
        toggles: u32,
    }

    impl Probe {
        fn at_height(y: f32) -> Self {
            Self {
                position: Vec3::new(0.0, y, 0.0),
                light_on: true,
                ..Self::default()
            }
        }
    }

    impl ControlTarget for Probe {
        type Error = Infallible;

        fn height(&self) -> Result<f32, Infallible> {
            Ok(self.position.y)
        }

        fn translate_local(&mut self, delta: Vec3) -> Result<(), Infallible> {
            self.position += delta;
            Ok(())
        }

        fn yaw(&mut self, radians: f32) -> Result<(), Infallible> {
            self.yaw += radians;
            Ok(())
        }

        fn toggle_light(&mut self) -> Result<bool, Infallible> {
            self.light_on = !self.light_on;
            self.toggles += 1;
            Ok(self.light_on)
        }
    }

    fn held(keys: &[Key]) -> InputState {
        InputState::holding(keys, &[])
    }

    fn clicking(button: MouseButton) -> InputState {
        InputState::holding(&[], &[button])
    }

    fn translate_of(actions: &[Action]) -> Option<Vec3> {
        actions.iter().find_map(|a| match a {
            Action::Translate(d) => Some(*d),
            _ => None,
        })
    }

    #[test]
    fn idle_frame_does_nothing() {
        let mut c = FrameController::default();
        assert!(c.plan(&InputState::new(), DT, 25.0).is_empty());
    }

    #[test]
    fn keys_move_along_local_axes() {
        let mut c = FrameController::default();
        let d = translate_of(&c.plan(&held(&[Key::I]), DT, 25.0)).unwrap();
        assert_eq!(d, Vec3::new(0.0, 0.0, -25.0));
        let d = translate_of(&c.plan(&held(&[Key::K, Key::L]), DT, 25.0)).unwrap();
        assert_eq!(d, Vec3::new(25.0, 0.0, 25.0));
        let d = translate_of(&c.plan(&held(&[Key::U, Key::J]), DT, 25.0)).unwrap();
        assert_eq!(d, Vec3::new(-25.0, 25.0, 0.0));
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut c = FrameController::default();
        assert!(c.plan(&held(&[Key::I, Key::K]), DT, 25.0).is_empty());
    }

    #[test]
    fn down_blocked_at_floor() {
        let mut c = FrameController::default();
        assert!(c.plan(&held(&[Key::O]), DT, 25.0).is_empty());
        assert!(c.plan(&held(&[Key::O]), DT, 10.0).is_empty());
        let d = translate_of(&c.plan(&held(&[Key::O]), DT, 40.0)).unwrap();
        assert_eq!(d, Vec3::new(0.0, -25.0, 0.0));
    }

    #[test]
    fn floor_also_cancels_up_when_down_is_held() {
        let mut c = FrameController::default();
        let d = translate_of(&c.plan(&held(&[Key::U, Key::O, Key::I]), DT, 25.0)).unwrap();
        assert_eq!(d.y, 0.0);
        assert_eq!(d.z, -25.0);
    }

    #[test]
    fn shift_turns_instead_of_strafing() {
        let mut c = FrameController::default();
        let actions = c.plan(&held(&[Key::J, Key::LShift]), DT, 25.0);
        assert_eq!(actions.len(), 1);
        match actions[0] {
            Action::Yaw(r) => assert!((r - 0.65_f32.to_radians()).abs() < 1e-6),
            other => panic!("expected yaw, got {other:?}"),
        }
        let actions = c.plan(&held(&[Key::L, Key::LShift]), DT, 25.0);
        assert!(matches!(actions[0], Action::Yaw(r) if r < 0.0));
    }

    #[test]
    fn yaw_comes_before_translate() {
        let mut c = FrameController::default();
        let actions = c.plan(&held(&[Key::J, Key::LShift, Key::I]), DT, 25.0);
        assert!(matches!(actions[0], Action::Yaw(_)));
        assert!(matches!(actions[1], Action::Translate(_)));
    }

    #[test]
    fn left_click_toggles_once_while_held() {
        let mut c = FrameController::default();
        let mut probe = Probe::at_height(25.0);
        for _ in 0..10 {
            c.frame(&clicking(MouseButton::Left), DT, &mut probe).unwrap();
        }
        assert_eq!(probe.toggles, 1);
        assert!(!probe.light_on);
    }

    #[test]
    fn left_click_retriggers_after_release() {
        let mut c = FrameController::default();
        let mut probe = Probe::at_height(25.0);
        c.frame(&clicking(MouseButton::Left), DT, &mut probe).unwrap();
        c.frame(&InputState::new(), DT, &mut probe).unwrap();
        c.frame(&clicking(MouseButton::Left), DT, &mut probe).unwrap();
        assert_eq!(probe.toggles, 2);
        assert!(probe.light_on);
    }

    #[test]
    fn right_click_is_rate_limited() {
        let mut c = FrameController::default();
        let mut probe = Probe::at_height(25.0);
        c.frame(&clicking(MouseButton::Right), DT, &mut probe).unwrap();
        assert_eq!(probe.toggles, 1);
        // 0.1 s per frame: frames 2..5 land within the half second.
        for _ in 0..4 {
            c.frame(&clicking(MouseButton::Right), DT, &mut probe).unwrap();
        }
        assert_eq!(probe.toggles, 1);
    }

    #[test]
    fn right_click_fires_again_after_cooldown() {
        let mut c = FrameController::default();
        let mut probe = Probe::at_height(25.0);
        c.frame(&clicking(MouseButton::Right), 0.25, &mut probe).unwrap();
        c.frame(&InputState::new(), 0.25, &mut probe).unwrap();
        assert_eq!(c.toggle_timer(), 0.0);
        c.frame(&clicking(MouseButton::Right), 0.25, &mut probe).unwrap();
        assert_eq!(probe.toggles, 2);
    }

    #[test]
    fn holding_right_toggles_every_cooldown() {
        let mut c = FrameController::default();
        let mut probe = Probe::at_height(25.0);
        // 2 s of held right button at 0.125 s per frame.
        for _ in 0..16 {
            c.frame(&clicking(MouseButton::Right), 0.125, &mut probe).unwrap();
        }
        assert_eq!(probe.toggles, 4);
    }

    #[test]
    fn both_buttons_on_one_frame_toggle_twice() {
        let mut c = FrameController::default();
        let mut probe = Probe::at_height(25.0);
        let input = InputState::holding(&[], &[MouseButton::Left, MouseButton::Right]);
        let actions = c.frame(&input, DT, &mut probe).unwrap();
        assert_eq!(actions.iter().filter(|a| a.is_toggle()).count(), 2);
        assert!(probe.light_on);
    }

    #[test]
    fn timer_never_negative() {
        let mut c = FrameController::default();
        for _ in 0..5 {
            c.plan(&InputState::new(), 1.0, 25.0);
            assert_eq!(c.toggle_timer(), 0.0);
        }
    }

    #[test]
    fn movement_scales_with_frame_time() {
        let mut c = FrameController::default();
        let mut probe = Probe::at_height(25.0);
        c.frame(&held(&[Key::I]), 0.5, &mut probe).unwrap();
        assert_eq!(probe.position.z, -125.0);
    }

    #[test]
    fn custom_settings_apply() {
        let settings = ControlSettings {
            move_speed: 10.0,
            toggle_cooldown: 0.0,
            ..ControlSettings::default()
        };
        let mut c = FrameController::new(settings);
        let mut probe = Probe::at_height(25.0);
        c.frame(&held(&[Key::K]), 1.0, &mut probe).unwrap();
        assert_eq!(probe.position.z, 10.0);
        c.frame(&clicking(MouseButton::Right), DT, &mut probe).unwrap();
        c.frame(&clicking(MouseButton::Right), DT, &mut probe).unwrap();
        assert_eq!(probe.toggles, 2);
    }
}
