/// A key that controls a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleKey {
    Forward,
    Back,
    Left,
    Right,
    Brake,
}

/// The latest pressed/released state of a vehicle's keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
}

/// What the engine is doing during a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineState {
    /// No longitudinal force; the vehicle coasts.
    #[default]
    Drift,
    Accelerate,
    Brake,
    Reverse,
}

impl KeyState {
    /// Records a key press or release.
    pub fn set(&mut self, key: VehicleKey, pressed: bool) {
        *self.key_mut(key) = pressed;
    }

    /// Returns true if the key is held down.
    pub fn is_pressed(&self, key: VehicleKey) -> bool {
        match key {
            VehicleKey::Forward => self.forward,
            VehicleKey::Back => self.back,
            VehicleKey::Left => self.left,
            VehicleKey::Right => self.right,
            VehicleKey::Brake => self.brake,
        }
    }

    /// The steering input in [-1, 1]; positive steers right.
    pub fn steering(&self) -> f64 {
        self.is_pressed(VehicleKey::Right) as i8 as f64
            - self.is_pressed(VehicleKey::Left) as i8 as f64
    }

    /// The longitudinal input in [-1, 1]; positive drives forwards.
    pub fn throttle(&self) -> i8 {
        self.is_pressed(VehicleKey::Forward) as i8 - self.is_pressed(VehicleKey::Back) as i8
    }

    fn key_mut(&mut self, key: VehicleKey) -> &mut bool {
        match key {
            VehicleKey::Forward => &mut self.forward,
            VehicleKey::Back => &mut self.back,
            VehicleKey::Left => &mut self.left,
            VehicleKey::Right => &mut self.right,
            VehicleKey::Brake => &mut self.brake,
        }
    }
}

impl EngineState {
    /// Derives the engine state from the keys held right now.
    /// The brake overrides every other key.
    pub fn from_keys(keys: &KeyState) -> Self {
        match keys.throttle() {
            _ if keys.is_pressed(VehicleKey::Brake) => EngineState::Brake,
            t if t > 0 => EngineState::Accelerate,
            t if t < 0 => EngineState::Reverse,
            _ => EngineState::Drift,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn keys(pressed: &[VehicleKey]) -> KeyState {
        let mut state = KeyState::default();
        for key in pressed {
            state.set(*key, true);
        }
        state
    }

    #[test]
    fn engine_state_from_keys() {
        use VehicleKey::*;
        assert_eq!(EngineState::from_keys(&keys(&[])), EngineState::Drift);
        assert_eq!(EngineState::from_keys(&keys(&[Forward])), EngineState::Accelerate);
        assert_eq!(EngineState::from_keys(&keys(&[Back])), EngineState::Reverse);
        assert_eq!(EngineState::from_keys(&keys(&[Forward, Back])), EngineState::Drift);
        assert_eq!(EngineState::from_keys(&keys(&[Left, Right])), EngineState::Drift);
    }

    #[test]
    fn brake_overrides_everything() {
        use VehicleKey::*;
        for others in [&[][..], &[Forward], &[Back], &[Forward, Back, Left, Right]] {
            let mut state = keys(others);
            state.set(Brake, true);
            assert_eq!(EngineState::from_keys(&state), EngineState::Brake);
        }
    }

    #[test]
    fn steering_from_keys() {
        use VehicleKey::*;
        assert_eq!(keys(&[]).steering(), 0.0);
        assert_eq!(keys(&[Right]).steering(), 1.0);
        assert_eq!(keys(&[Left]).steering(), -1.0);
        assert_eq!(keys(&[Left, Right]).steering(), 0.0);
    }

    #[test]
    fn release_clears_a_key() {
        let mut state = keys(&[VehicleKey::Forward]);
        assert!(state.is_pressed(VehicleKey::Forward));
        state.set(VehicleKey::Forward, false);
        assert_eq!(state, KeyState::default());
    }
}
