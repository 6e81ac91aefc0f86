//! Learning-rate schedules.
//!
//! The library does not drive a training loop itself; these schedules are the
//! policies an external loop feeds into `Network::propagate`.

use serde::{Deserialize, Serialize};

/// A learning-rate decay policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RateSchedule {
    /// The base rate, unchanged.
    Fixed,
    /// Multiply by `gamma` every `step_size` iterations.
    Step { gamma: f64, step_size: usize },
    /// Multiply by `gamma` every iteration.
    Exp { gamma: f64 },
    /// `base * (1 + gamma * iteration)^-power`.
    Inv { gamma: f64, power: f64 },
}

impl RateSchedule {
    /// Step decay with the conventional gamma 0.9 every 100 iterations.
    pub fn step() -> Self {
        Self::Step {
            gamma: 0.9,
            step_size: 100,
        }
    }

    /// Exponential decay with the conventional gamma 0.999.
    pub fn exp() -> Self {
        Self::Exp { gamma: 0.999 }
    }

    /// Inverse decay with the conventional gamma 0.001 and power 2.
    pub fn inv() -> Self {
        Self::Inv {
            gamma: 0.001,
            power: 2.0,
        }
    }

    /// The effective rate at `iteration`, starting from `base_rate`.
    pub fn at(&self, base_rate: f64, iteration: usize) -> f64 {
        match *self {
            Self::Fixed => base_rate,
            Self::Step { gamma, step_size } => {
                base_rate * gamma.powi((iteration / step_size) as i32)
            }
            Self::Exp { gamma } => base_rate * gamma.powi(iteration as i32),
            Self::Inv { gamma, power } => {
                base_rate * (1.0 + gamma * iteration as f64).powf(-power)
            }
        }
    }
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self::Fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed() {
        assert_eq!(RateSchedule::Fixed.at(0.3, 0), 0.3);
        assert_eq!(RateSchedule::Fixed.at(0.3, 1000), 0.3);
    }

    #[test]
    fn test_step_decays_in_plateaus() {
        let s = RateSchedule::step();
        assert_eq!(s.at(1.0, 0), s.at(1.0, 99));
        assert!(s.at(1.0, 100) < s.at(1.0, 99));
    }

    #[test]
    fn test_exp_monotone() {
        let s = RateSchedule::exp();
        assert!(s.at(1.0, 10) < s.at(1.0, 0));
        assert!(s.at(1.0, 100) < s.at(1.0, 10));
    }

    #[test]
    fn test_inv_decays() {
        let s = RateSchedule::inv();
        assert!(s.at(1.0, 1000) < 1.0);
    }
}
