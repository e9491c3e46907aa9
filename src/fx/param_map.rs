//! Mapping between 0..=127 control values and plugin-native parameter values.

pub const CONTROL_MAX: u8 = 127;

/// Bounds of the log domain used for logarithmic parameters
pub const LOG_MIN: f32 = -10.0;
pub const LOG_MAX: f32 = 0.0;

/// Map a control value onto the log domain [LOG_MIN, LOG_MAX]
pub fn control_to_log_domain(ctrl: u8) -> f32 {
    let scale = (LOG_MAX - LOG_MIN) / CONTROL_MAX as f32;
    ctrl as f32 * scale + LOG_MIN
}

/// Inverse of [`control_to_log_domain`]
pub fn log_domain_to_control(log: f32) -> u8 {
    let scale = CONTROL_MAX as f32 / (LOG_MAX - LOG_MIN);
    ((log - LOG_MIN) * scale).round().clamp(0.0, CONTROL_MAX as f32) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamHint {
    Linear,
    Logarithmic,
    Toggle,
    Integer,
}

/// Range and scaling of one plugin parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub hint: ParamHint,
}

impl ParamRange {
    pub const fn linear(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            hint: ParamHint::Linear,
        }
    }

    pub const fn logarithmic(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            hint: ParamHint::Logarithmic,
        }
    }

    pub const fn toggle(default: bool) -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            hint: ParamHint::Toggle,
        }
    }

    pub const fn integer(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            hint: ParamHint::Integer,
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Control value (0..=127) to native value
    pub fn from_control(&self, ctrl: u8) -> f32 {
        let ctrl = ctrl.min(CONTROL_MAX);
        let span = (self.max - self.min) as f64;
        let t = ctrl as f64 / CONTROL_MAX as f64;
        match self.hint {
            ParamHint::Linear => (self.min as f64 + span * t) as f32,
            ParamHint::Integer => (self.min as f64 + span * t).round() as f32,
            ParamHint::Toggle => {
                if ctrl > 0 {
                    self.max
                } else {
                    self.min
                }
            }
            ParamHint::Logarithmic => {
                let log = control_to_log_domain(ctrl) as f64;
                (self.min as f64 + span * log.exp()) as f32
            }
        }
    }

    /// Native value to control value (0..=127)
    pub fn to_control(&self, value: f32) -> u8 {
        let span = (self.max - self.min) as f64;
        if span <= 0.0 {
            return 0;
        }
        let t = ((self.clamp(value) - self.min) as f64 / span).clamp(0.0, 1.0);
        match self.hint {
            ParamHint::Linear | ParamHint::Integer => {
                (t * CONTROL_MAX as f64).round() as u8
            }
            ParamHint::Toggle => {
                if t >= 0.5 {
                    CONTROL_MAX
                } else {
                    0
                }
            }
            ParamHint::Logarithmic => {
                if t <= 0.0 {
                    return 0;
                }
                let log = t.ln().clamp(LOG_MIN as f64, LOG_MAX as f64);
                log_domain_to_control(log as f32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_domain_endpoints() {
        assert_eq!(control_to_log_domain(0), LOG_MIN);
        assert!((control_to_log_domain(127) - LOG_MAX).abs() < 1e-5);
        assert_eq!(log_domain_to_control(LOG_MIN), 0);
        assert_eq!(log_domain_to_control(LOG_MAX), 127);
    }

    #[test]
    fn linear_and_log_controls_survive_export() {
        let ranges = [
            ParamRange::linear(10.0, 500.0, 200.0),
            ParamRange::logarithmic(20.0, 20000.0, 2000.0),
        ];
        for range in ranges {
            for ctrl in 0..=127u8 {
                let native = range.from_control(ctrl);
                assert_eq!(range.to_control(native), ctrl, "{:?} ctrl {}", range.hint, ctrl);
            }
        }
    }

    #[test]
    fn exported_integer_and_toggle_values_are_stable() {
        let ranges = [ParamRange::integer(0.0, 2.0, 0.0), ParamRange::toggle(false)];
        for range in ranges {
            for ctrl in 0..=127u8 {
                let exported = range.to_control(range.from_control(ctrl));
                assert_eq!(range.to_control(range.from_control(exported)), exported);
            }
        }
    }
}
