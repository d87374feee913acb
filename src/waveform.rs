use std::f64::consts::TAU;

/// Maps a window of time values (seconds) to one sample per time value.
///
/// Implementations must not depend on call history: the generator hands in
/// consecutive, non-overlapping windows and relies on the output depending
/// only on the times themselves for phase continuity.
pub trait WaveformFunction: Send + Sync {
    fn evaluate(&self, times: &[f64]) -> Vec<f64>;
}

impl<F> WaveformFunction for F
where
    F: Fn(&[f64]) -> Vec<f64> + Send + Sync,
{
    fn evaluate(&self, times: &[f64]) -> Vec<f64> {
        self(times)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sine {
    pub frequency: f64,
    pub offset: f64,
}

impl Default for Sine {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            offset: 0.0,
        }
    }
}

impl WaveformFunction for Sine {
    fn evaluate(&self, times: &[f64]) -> Vec<f64> {
        times
            .iter()
            .map(|t| (TAU * self.frequency * t).sin() + self.offset)
            .collect()
    }
}

/// Periodic pulse: low for the first 10% of the period, smoothstep rise over
/// `edge_time` periods, high until 60%, smoothstep fall, low for the rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrapezoidPulse {
    pub amplitude: f64,
    pub frequency: f64,
    pub offset: f64,
    /// Rise and fall length as a fraction of the period.
    pub edge_time: f64,
}

impl Default for TrapezoidPulse {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            frequency: 1.0,
            offset: 0.0,
            edge_time: 0.05,
        }
    }
}

const RISE_START: f64 = 0.1;
const FALL_START: f64 = 0.6;

impl TrapezoidPulse {
    fn sample(&self, t: f64) -> f64 {
        let period = 1.0 / self.frequency;
        let rise_start = RISE_START * period;
        let rise_end = (RISE_START + self.edge_time) * period;
        let fall_start = FALL_START * period;
        let fall_end = (FALL_START + self.edge_time) * period;

        let x = t.rem_euclid(period);
        let level = if x <= rise_start {
            0.0
        } else if x <= rise_end {
            smoothstep((x - rise_start) / (rise_end - rise_start))
        } else if x <= fall_start {
            1.0
        } else if x <= fall_end {
            1.0 - smoothstep((x - fall_start) / (fall_end - fall_start))
        } else {
            0.0
        };
        self.amplitude * level + self.offset
    }
}

impl WaveformFunction for TrapezoidPulse {
    fn evaluate(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&t| self.sample(t)).collect()
    }
}

fn smoothstep(x: f64) -> f64 {
    x * x * (3.0 - 2.0 * x)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveformKind {
    Sine,
    TrapezoidPulse,
}

impl WaveformKind {
    pub const ALL: [WaveformKind; 2] = [WaveformKind::Sine, WaveformKind::TrapezoidPulse];

    pub fn label(self) -> &'static str {
        match self {
            WaveformKind::Sine => "Sine",
            WaveformKind::TrapezoidPulse => "Trapezoid pulse",
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            WaveformKind::Sine => "sine",
            WaveformKind::TrapezoidPulse => "trapezoid",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sine" | "sin" => Some(WaveformKind::Sine),
            "trapezoid" | "pulse" => Some(WaveformKind::TrapezoidPulse),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sine_hits_quarter_period_peaks() {
        let sine = Sine {
            frequency: 2.0,
            offset: 0.5,
        };
        let out = sine.evaluate(&[0.0, 0.125, 0.25, 0.375]);
        assert_eq!(out.len(), 4);
        assert!(close(out[0], 0.5));
        assert!(close(out[1], 1.5));
        assert!(close(out[2], 0.5));
        assert!(close(out[3], -0.5));
    }

    #[test]
    fn trapezoid_levels_over_one_period() {
        let pulse = TrapezoidPulse {
            amplitude: 2.0,
            frequency: 0.2,
            offset: 0.0,
            edge_time: 0.2,
        };
        // period 5 s: low until 0.5, rise to 1.5, high until 3.0, fall to 4.0
        let out = pulse.evaluate(&[0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 3.5, 4.0, 4.5]);
        let expected = [0.0, 0.0, 1.0, 2.0, 2.0, 2.0, 1.0, 0.0, 0.0];
        for (got, want) in out.iter().zip(expected) {
            assert!(close(*got, want), "got {out:?}");
        }
    }

    #[test]
    fn trapezoid_is_periodic_and_offset() {
        let pulse = TrapezoidPulse {
            amplitude: 1.0,
            frequency: 4.0,
            offset: -0.25,
            edge_time: 0.1,
        };
        let times = [0.01, 0.04, 0.1, 0.16, 0.2];
        let shifted: Vec<f64> = times.iter().map(|t| t + 3.0 * 0.25).collect();
        let base = pulse.evaluate(&times);
        let later = pulse.evaluate(&shifted);
        for (a, b) in base.iter().zip(&later) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!(close(base[0], -0.25));
    }

    #[test]
    fn trapezoid_with_zero_edges_is_a_square_pulse() {
        let pulse = TrapezoidPulse {
            amplitude: 1.0,
            frequency: 1.0,
            offset: 0.0,
            edge_time: 0.0,
        };
        let out = pulse.evaluate(&[0.1, 0.2, 0.6, 0.7]);
        assert_eq!(out, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn output_length_matches_input() {
        let times: Vec<f64> = (0..101).map(|k| k as f64 / 100.0).collect();
        assert_eq!(Sine::default().evaluate(&times).len(), 101);
        assert_eq!(TrapezoidPulse::default().evaluate(&times).len(), 101);
    }

    #[test]
    fn closures_are_waveforms() {
        let double = |t: &[f64]| t.iter().map(|v| v * 2.0).collect::<Vec<_>>();
        assert_eq!(double.evaluate(&[1.0, 2.5]), vec![2.0, 5.0]);
    }

    #[test]
    fn kind_keys_round_trip() {
        for kind in WaveformKind::ALL {
            assert_eq!(WaveformKind::from_key(kind.as_key()), Some(kind));
        }
        assert_eq!(WaveformKind::from_key("square"), None);
    }
}
