use std::fmt;

use crate::foundation::error::{BreathcastError, BreathcastResult};

/// One breathing cycle: inhale, hold, exhale durations in seconds.
///
/// Always finite, non-negative and with a non-zero total when built through [`Self::new`] or
/// [`Self::parse`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BreathingPattern {
    /// Inhale duration in seconds.
    pub inhale_secs: f64,
    /// Hold duration in seconds.
    pub hold_secs: f64,
    /// Exhale duration in seconds.
    pub exhale_secs: f64,
}

impl BreathingPattern {
    /// Pattern used whenever a pattern string cannot be understood.
    pub const FALLBACK: BreathingPattern = BreathingPattern {
        inhale_secs: 4.0,
        hold_secs: 0.0,
        exhale_secs: 4.0,
    };

    /// Create a validated pattern.
    pub fn new(inhale_secs: f64, hold_secs: f64, exhale_secs: f64) -> BreathcastResult<Self> {
        for (name, v) in [
            ("inhale", inhale_secs),
            ("hold", hold_secs),
            ("exhale", exhale_secs),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(BreathcastError::validation(format!(
                    "pattern {name} must be a finite number >= 0, got {v}"
                )));
            }
        }
        if inhale_secs + hold_secs + exhale_secs <= 0.0 {
            return Err(BreathcastError::validation(
                "pattern must not be all zero",
            ));
        }
        Ok(Self {
            inhale_secs,
            hold_secs,
            exhale_secs,
        })
    }

    /// Strictly parse an `"inhale-hold-exhale"` string such as `"4-7-8"`.
    pub fn parse(s: &str) -> BreathcastResult<Self> {
        let parts: Vec<&str> = s.trim().split('-').map(str::trim).collect();
        let [inhale, hold, exhale] = parts.as_slice() else {
            return Err(BreathcastError::validation(format!(
                "pattern '{s}' must have exactly three '-'-separated parts"
            )));
        };
        let num = |part: &str| -> BreathcastResult<f64> {
            part.parse::<f64>().map_err(|_| {
                BreathcastError::validation(format!("pattern '{s}' has non-numeric part '{part}'"))
            })
        };
        Self::new(num(inhale)?, num(hold)?, num(exhale)?)
    }

    /// Parse `s`, degrading to [`Self::FALLBACK`] on any malformed input.
    pub fn parse_or_default(s: &str) -> Self {
        match Self::parse(s) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(pattern = s, error = %e, "falling back to default pattern");
                Self::FALLBACK
            }
        }
    }

    /// Length of one full cycle in seconds.
    pub fn total_cycle_secs(&self) -> f64 {
        self.inhale_secs + self.hold_secs + self.exhale_secs
    }
}

impl Default for BreathingPattern {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for BreathingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn part(v: f64) -> String {
            if v.fract() == 0.0 {
                format!("{}", v as u64)
            } else {
                format!("{v}")
            }
        }
        write!(
            f,
            "{}-{}-{}",
            part(self.inhale_secs),
            part(self.hold_secs),
            part(self.exhale_secs)
        )
    }
}

/// Named exercises offered by the control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    /// 4-7-8 relaxing breath.
    Relaxing,
    /// 5-0-5 coherent breathing.
    Coherent,
    /// 4-2-6 calming breath.
    Calming,
    /// 4-0-4 equal breathing.
    Equal,
}

impl Exercise {
    /// Every exercise, in menu order.
    pub const ALL: [Exercise; 4] = [
        Exercise::Relaxing,
        Exercise::Coherent,
        Exercise::Calming,
        Exercise::Equal,
    ];

    /// Pattern source string for this exercise.
    pub fn pattern_source(self) -> &'static str {
        match self {
            Exercise::Relaxing => "4-7-8",
            Exercise::Coherent => "5-0-5",
            Exercise::Calming => "4-2-6",
            Exercise::Equal => "4-0-4",
        }
    }

    /// Parsed pattern for this exercise.
    pub fn pattern(self) -> BreathingPattern {
        BreathingPattern::parse_or_default(self.pattern_source())
    }

    /// Human-readable name, also used in output file names.
    pub fn label(self) -> &'static str {
        match self {
            Exercise::Relaxing => "Relaxing 4-7-8",
            Exercise::Coherent => "Coherent Breathing",
            Exercise::Calming => "Calming Breath",
            Exercise::Equal => "Equal Breathing",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/phase/pattern.rs"]
mod tests;
