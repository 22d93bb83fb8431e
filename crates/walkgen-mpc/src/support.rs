//! Support-phase state machine and its preview over the QP horizon.

use tracing::trace;
use walkgen_core::{
    Locomotion, SupportPhase, SupportState, TIME_EPSILON, VelocityReference, WalkgenConfig,
};

/// Current support plus one previewed support per QP sample.
///
/// `previewed[i]` is the support at the end of sample `i`, i.e. at
/// `sampling_times[i + 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SupportSequence {
    pub current: SupportState,
    pub previewed: Vec<SupportState>,
}

impl SupportSequence {
    /// Number of footsteps started inside the horizon.
    #[must_use]
    pub fn nb_previewed_steps(&self) -> usize {
        self.previewed
            .iter()
            .filter(|s| s.state_changed && s.is_single_support() && s.step_number > 0)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StepTiming {
    step_period: f64,
    ds_period: f64,
    ds_ss_period: f64,
    nb_steps_ss_ds: u32,
}

/// Deterministic preview of support phases.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportPreview {
    timing: StepTiming,
    stepping: bool,
}

impl SupportPreview {
    #[must_use]
    pub fn new(config: &WalkgenConfig) -> Self {
        Self {
            timing: StepTiming {
                step_period: config.mpc.step_period,
                ds_period: config.mpc.ds_period,
                ds_ss_period: config.mpc.ds_ss_period,
                nb_steps_ss_ds: config.mpc.nb_steps_ss_ds,
            },
            stepping: config.robot.locomotion == Locomotion::Walking,
        }
    }

    /// Advance `current` to `sampling_times[0]` and preview one support
    /// per remaining instant.
    ///
    /// Pure: equal inputs give equal sequences.
    #[must_use]
    pub fn preview(
        &self,
        current: &SupportState,
        velocity: &VelocityReference,
        sampling_times: &[f64],
    ) -> SupportSequence {
        let reference_given = !velocity.is_zero_at_start();

        let mut current = current.clone();
        current.state_changed = false;
        current.in_transitional_ds = false;
        if let Some(&now) = sampling_times.first()
            && self.stepping
        {
            self.advance(&mut current, now, reference_given, 0);
            if current.state_changed {
                trace!(
                    time = now,
                    phase = ?current.phase,
                    foot = ?current.foot,
                    steps_left = current.nb_steps_left,
                    "Support transition"
                );
            }
        }

        let mut support = current.clone();
        support.step_number = 0;
        let mut previewed = Vec::with_capacity(sampling_times.len().saturating_sub(1));
        for (sample, &time) in sampling_times.iter().enumerate().skip(1) {
            support.state_changed = false;
            if self.stepping {
                self.advance(&mut support, time, reference_given, sample);
            }
            if sample == 1
                && support.state_changed
                && current.is_single_support()
                && support.step_number == 0
            {
                support.in_transitional_ds = true;
                current.in_transitional_ds = true;
            } else {
                support.in_transitional_ds = false;
            }
            previewed.push(support.clone());
        }

        SupportSequence { current, previewed }
    }

    fn advance(&self, support: &mut SupportState, time: f64, reference_given: bool, sample: usize) {
        let timing = &self.timing;

        // A new command in double support arms the first step.
        if reference_given
            && support.phase == SupportPhase::DoubleSupport
            && support.time_limit - time - TIME_EPSILON > timing.ds_ss_period
        {
            support.time_limit = time + timing.ds_ss_period;
            support.nb_steps_left = timing.nb_steps_ss_ds;
        }

        if time + TIME_EPSILON < support.time_limit {
            return;
        }

        match support.phase {
            SupportPhase::SingleSupport if !reference_given && support.nb_steps_left == 0 => {
                support.phase = SupportPhase::DoubleSupport;
                support.start_time = time;
                support.time_limit = time + timing.ds_period;
                support.state_changed = true;
            }
            SupportPhase::DoubleSupport if reference_given || support.nb_steps_left > 0 => {
                support.phase = SupportPhase::SingleSupport;
                support.start_time = time;
                support.time_limit = time + timing.step_period;
                support.nb_steps_left = timing.nb_steps_ss_ds;
                support.state_changed = true;
            }
            SupportPhase::SingleSupport => {
                support.foot = support.foot.opposite();
                support.start_time = time;
                support.time_limit = time + timing.step_period;
                support.state_changed = true;
                if sample != 1 {
                    support.step_number += 1;
                }
                if reference_given {
                    support.nb_steps_left = timing.nb_steps_ss_ds;
                } else {
                    support.nb_steps_left = support.nb_steps_left.saturating_sub(1);
                }
            }
            SupportPhase::DoubleSupport => {}
        }
    }
}
