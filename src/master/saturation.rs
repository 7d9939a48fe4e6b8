use super::MasteringState;

/// Below this amount the stage is bypassed.
const MIN_AMOUNT: f32 = 0.01;
const TUBE_DRIVE: f32 = 2.0;
const TAPE_DRIVE: f32 = 0.5;
const TUBE_MIX: f32 = 0.6;
const WET_SCALE: f32 = 0.6;

/// Tube (tanh) and tape (level-dependent gain) saturation blended with the dry signal.
#[derive(Debug, Clone, Copy)]
pub struct Saturator {
    /// 0-1.
    pub amount: f32,
}

impl Saturator {
    pub fn new(amount: f32) -> Self {
        Self { amount }
    }

    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        let a = self.amount;
        let tube = (x * (1.0 + a * TUBE_DRIVE)).tanh();
        let tape = x * (1.0 + a * TAPE_DRIVE * x.abs());
        let saturated = TUBE_MIX * tube + (1.0 - TUBE_MIX) * tape;
        let wet = a * WET_SCALE;
        (1.0 - wet) * x + wet * saturated
    }

    pub fn process(&self, mut state: MasteringState) -> MasteringState {
        if self.amount < MIN_AMOUNT {
            log::debug!("Saturation bypassed ({:.3})", self.amount);
            return state;
        }
        log::info!("Saturation: {:.0}%", self.amount * 100.0);
        for s in state.channels.iter_mut().flatten() {
            *s = self.shape(*s);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tiny_amount_is_bypassed() {
        let input = vec![vec![0.3, -0.7, 0.9]];
        let out = Saturator::new(0.005).process(MasteringState::new(input.clone(), 44100));
        assert_eq!(out.channels, input);
    }

    #[test]
    fn shape_matches_blend_formula() {
        let sat = Saturator::new(0.4);
        let x = 0.5f32;
        let tube = (x * 1.8).tanh();
        let tape = x * (1.0 + 0.2 * x);
        let expected = (1.0 - 0.24) * x + 0.24 * (0.6 * tube + 0.4 * tape);
        assert_abs_diff_eq!(sat.shape(x), expected, epsilon = 1e-6);
    }

    #[test]
    fn shape_is_odd_and_keeps_zero() {
        let sat = Saturator::new(1.0);
        assert_eq!(sat.shape(0.0), 0.0);
        for x in [0.1f32, 0.4, 0.8, 1.0] {
            assert_abs_diff_eq!(sat.shape(-x), -sat.shape(x), epsilon = 1e-7);
        }
    }
}
