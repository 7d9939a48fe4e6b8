//! Second-order filter sections in Transposed Direct Form II.
//!
//! Coefficient formulas follow the RBJ audio-EQ cookbook; Butterworth
//! low/high-pass filters of even order are built as cascades of RBJ
//! sections with the Butterworth pole Qs.

use std::f64::consts::PI;

/// Normalized coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    pub fn lowpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        Self::normalized(
            (1.0 - cos_omega) / 2.0,
            1.0 - cos_omega,
            (1.0 - cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        Self::normalized(
            (1.0 + cos_omega) / 2.0,
            -(1.0 + cos_omega),
            (1.0 + cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Peaking EQ: `gain_db` at `freq`, unity far from it.
    pub fn peaking(freq: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let omega = 2.0 * PI * freq / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos_omega,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_omega,
            1.0 - alpha / a,
        )
    }

    pub fn high_shelf(freq: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let omega = 2.0 * PI * freq / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
            a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
            (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
        )
    }

    /// First-order Butterworth high-pass via the prewarped bilinear transform.
    pub fn first_order_highpass(freq: f64, sample_rate: f64) -> Self {
        let k = (PI * freq / sample_rate).tan();
        let b0 = 1.0 / (1.0 + k);
        Self {
            b0,
            b1: -b0,
            b2: 0.0,
            a1: (k - 1.0) / (k + 1.0),
            a2: 0.0,
        }
    }

    /// Magnitude response at `freq`.
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// Pass type for Butterworth cascades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassType {
    Lowpass,
    Highpass,
}

/// Even-order Butterworth filter as RBJ sections.
pub fn butterworth(pass: PassType, order: usize, freq: f64, sample_rate: f64) -> Vec<BiquadCoeffs> {
    debug_assert!(order >= 2 && order % 2 == 0);
    (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            let q = 1.0 / (2.0 * theta.cos());
            match pass {
                PassType::Lowpass => BiquadCoeffs::lowpass(freq, q, sample_rate),
                PassType::Highpass => BiquadCoeffs::highpass(freq, q, sample_rate),
            }
        })
        .collect()
}

/// Single section with TDF-II state.
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}

/// Run a cascade of sections over a buffer in place, starting from zero state.
pub fn filter_in_place(sections: &[BiquadCoeffs], samples: &mut [f32]) {
    let mut stages: Vec<Biquad> = sections.iter().copied().map(Biquad::new).collect();
    for s in samples.iter_mut() {
        let mut x = *s as f64;
        for stage in stages.iter_mut() {
            x = stage.process(x);
        }
        *s = x as f32;
    }
}

/// Filtered copy of `samples`.
pub fn filtered(sections: &[BiquadCoeffs], samples: &[f32]) -> Vec<f32> {
    let mut out = samples.to_vec();
    filter_in_place(sections, &mut out);
    out
}
