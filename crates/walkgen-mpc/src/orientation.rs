//! Trunk yaw preview.
//!
//! The commanded yaw rate is reached through a quintic blend lasting one
//! step period, after which the yaw grows linearly.

use nalgebra::{DVector, Vector4};
use walkgen_core::{VelocityReference, WalkgenConfig};

use crate::interpolation::{AxisSample, QuinticPolynomial};

/// Yaw as a function of absolute time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawProfile {
    start_time: f64,
    blend: QuinticPolynomial,
    final_rate: f64,
}

impl YawProfile {
    /// Constant yaw.
    #[must_use]
    pub fn hold(start_time: f64, yaw: f64) -> Self {
        Self {
            start_time,
            blend: QuinticPolynomial::new([yaw, 0.0, 0.0], [yaw, 0.0, 0.0], 1.0),
            final_rate: 0.0,
        }
    }

    #[must_use]
    pub fn sample(&self, time: f64) -> AxisSample {
        let t = (time - self.start_time).max(0.0);
        let duration = self.blend.duration();
        if t <= duration {
            return self.blend.sample(t);
        }
        let end = self.blend.sample(duration);
        AxisSample {
            position: end.position + self.final_rate * (t - duration),
            velocity: self.final_rate,
            acceleration: 0.0,
        }
    }
}

impl Default for YawProfile {
    fn default() -> Self {
        Self::hold(0.0, 0.0)
    }
}

/// Previewed trunk yaw at each QP sample.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationSequence {
    pub yaw: DVector<f64>,
    pub yaw_rate: DVector<f64>,
    pub yaw_acceleration: DVector<f64>,
    pub profile: YawProfile,
}

impl Default for OrientationSequence {
    fn default() -> Self {
        Self {
            yaw: DVector::zeros(0),
            yaw_rate: DVector::zeros(0),
            yaw_acceleration: DVector::zeros(0),
            profile: YawProfile::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationPreview {
    max_yaw_rate: f64,
    blend_duration: f64,
}

impl OrientationPreview {
    #[must_use]
    pub fn new(config: &WalkgenConfig) -> Self {
        Self {
            max_yaw_rate: config.robot.max_yaw_rate,
            blend_duration: config.mpc.step_period,
        }
    }

    /// Preview the yaw of a trunk whose current yaw state is `trunk`.
    ///
    /// `sampling_times[0]` is the current instant; one value is produced per
    /// later instant.
    #[must_use]
    pub fn preview(
        &self,
        trunk: &Vector4<f64>,
        velocity: &VelocityReference,
        sampling_times: &[f64],
    ) -> OrientationSequence {
        let now = sampling_times.first().copied().unwrap_or(0.0);
        let target_rate = if velocity.local.yaw.is_empty() {
            0.0
        } else {
            velocity.local.yaw[0].clamp(-self.max_yaw_rate, self.max_yaw_rate)
        };

        let (yaw0, rate0, acc0) = (trunk[0], trunk[1], trunk[2]);
        let end_yaw = yaw0 + 0.5 * (rate0 + target_rate) * self.blend_duration;
        let profile = YawProfile {
            start_time: now,
            blend: QuinticPolynomial::new(
                [yaw0, rate0, acc0],
                [end_yaw, target_rate, 0.0],
                self.blend_duration,
            ),
            final_rate: target_rate,
        };

        let n = sampling_times.len().saturating_sub(1);
        let mut yaw = DVector::zeros(n);
        let mut yaw_rate = DVector::zeros(n);
        let mut yaw_acceleration = DVector::zeros(n);
        for (i, &time) in sampling_times.iter().skip(1).enumerate() {
            let sample = profile.sample(time);
            yaw[i] = sample.position;
            yaw_rate[i] = sample.velocity;
            yaw_acceleration[i] = sample.acceleration;
        }

        OrientationSequence {
            yaw,
            yaw_rate,
            yaw_acceleration,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use walkgen_core::sampling_times;

    fn preview() -> OrientationPreview {
        let mut config = WalkgenConfig::default();
        config.mpc.step_period = 0.8;
        config.robot.max_yaw_rate = 0.5;
        OrientationPreview::new(&config)
    }

    #[test]
    fn zero_rate_holds_yaw() {
        let trunk = Vector4::new(0.3, 0.0, 0.0, 1.0);
        let times = sampling_times(0.0, 0.1, 0.1, 16);
        let sequence = preview().preview(&trunk, &VelocityReference::zeros(16), &times);
        assert_eq!(sequence.yaw.len(), 16);
        for i in 0..16 {
            assert_relative_eq!(sequence.yaw[i], 0.3, epsilon = 1e-12);
            assert_relative_eq!(sequence.yaw_rate[i], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn rate_is_clamped_and_reached_after_blend() {
        let trunk = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let times = sampling_times(2.0, 0.1, 0.1, 16);
        let velocity = VelocityReference::constant(16, 0.0, 0.0, 2.0);
        let sequence = preview().preview(&trunk, &velocity, &times);
        // Blend ends at sample 7 (t = 2.8).
        for i in 8..16 {
            assert_relative_eq!(sequence.yaw_rate[i], 0.5, epsilon = 1e-9);
            assert_relative_eq!(
                sequence.yaw[i] - sequence.yaw[i - 1],
                0.05,
                epsilon = 1e-9
            );
        }
        // Average rate over the blend: (0 + 0.5) / 2.
        assert_relative_eq!(sequence.yaw[7], 0.2, epsilon = 1e-9);
        assert!(sequence.yaw.iter().zip(sequence.yaw.iter().skip(1)).all(|(a, b)| b >= a));
    }
}
