use crate::phase::pattern::BreathingPattern;

/// Segment of the breathing cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    /// Breathing in.
    Inhale,
    /// Holding the breath.
    Hold,
    /// Breathing out.
    Exhale,
}

impl Phase {
    /// Short on-screen instruction for the phase.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Inhale => "Inhale",
            Phase::Hold => "Hold",
            Phase::Exhale => "Exhale",
        }
    }
}

/// Snapshot of the breathing cycle at one instant.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhaseSample {
    /// Current phase.
    pub phase: Phase,
    /// Fraction of the full cycle elapsed, in `[0, 1)`.
    pub cycle_progress: f64,
    /// Indicator rotation: `270 + cycle_progress * 360`.
    pub angle_degrees: f64,
    /// Cycle-relative start of the current phase (inclusive), seconds.
    pub phase_start_secs: f64,
    /// Cycle-relative end of the current phase (exclusive), seconds.
    pub phase_end_secs: f64,
    /// Fraction of the current phase elapsed, in `[0, 1]`.
    pub phase_progress: f64,
}

/// Map elapsed time `t` (seconds) onto the breathing cycle of `pattern`.
///
/// Pure and deterministic. Times beyond one cycle wrap; negative times wrap backwards. A
/// zero-length cycle yields the start of an inhale instead of dividing by zero.
pub fn sample_phase(pattern: &BreathingPattern, t: f64) -> PhaseSample {
    let total = pattern.total_cycle_secs();
    if !(total.is_finite() && total > 0.0) {
        return PhaseSample {
            phase: Phase::Inhale,
            cycle_progress: 0.0,
            angle_degrees: 270.0,
            phase_start_secs: 0.0,
            phase_end_secs: 0.0,
            phase_progress: 0.0,
        };
    }

    let t = if t.is_finite() { t } else { 0.0 };
    let mut cycle_time = t.rem_euclid(total);
    // rem_euclid may round up to exactly `total`.
    if cycle_time >= total {
        cycle_time = 0.0;
    }

    let inhale_end = pattern.inhale_secs;
    let hold_end = inhale_end + pattern.hold_secs;
    let (phase, start, end) = if cycle_time < inhale_end {
        (Phase::Inhale, 0.0, inhale_end)
    } else if cycle_time < hold_end {
        (Phase::Hold, inhale_end, hold_end)
    } else {
        (Phase::Exhale, hold_end, total)
    };

    let span = end - start;
    let phase_progress = if span > 0.0 {
        ((cycle_time - start) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let cycle_progress = cycle_time / total;
    PhaseSample {
        phase,
        cycle_progress,
        angle_degrees: 270.0 + cycle_progress * 360.0,
        phase_start_secs: start,
        phase_end_secs: end,
        phase_progress,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/phase/model.rs"]
mod tests;
