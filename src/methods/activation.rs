//! Activation (squash) functions.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A squash function applied to a node's pre-activation state.
///
/// Every variant can be evaluated in value mode or derivative mode; the
/// derivative is taken at the same pre-activation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Logistic,
    Tanh,
    Identity,
    Step,
    Relu,
    Softsign,
    Sinusoid,
    Gaussian,
    BentIdentity,
    Bipolar,
    BipolarSigmoid,
    HardTanh,
    Absolute,
    Inverse,
    Selu,
}

const SELU_ALPHA: f64 = 1.673_263_242_354_377_2;
const SELU_SCALE: f64 = 1.050_700_987_355_480_5;

/// The full catalog, in wire-index order.
pub const ALL: [Activation; 15] = [
    Activation::Logistic,
    Activation::Tanh,
    Activation::Identity,
    Activation::Step,
    Activation::Relu,
    Activation::Softsign,
    Activation::Sinusoid,
    Activation::Gaussian,
    Activation::BentIdentity,
    Activation::Bipolar,
    Activation::BipolarSigmoid,
    Activation::HardTanh,
    Activation::Absolute,
    Activation::Inverse,
    Activation::Selu,
];

impl Activation {
    /// Evaluate the function at `x`.
    pub fn value(self, x: f64) -> f64 {
        match self {
            Self::Logistic => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Identity => x,
            Self::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Relu => {
                if x > 0.0 {
                    x
                } else {
                    0.0
                }
            }
            Self::Softsign => x / (1.0 + x.abs()),
            Self::Sinusoid => x.sin(),
            Self::Gaussian => (-(x * x)).exp(),
            Self::BentIdentity => ((x * x + 1.0).sqrt() - 1.0) / 2.0 + x,
            Self::Bipolar => {
                if x > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::BipolarSigmoid => 2.0 / (1.0 + (-x).exp()) - 1.0,
            Self::HardTanh => x.clamp(-1.0, 1.0),
            Self::Absolute => x.abs(),
            Self::Inverse => 1.0 - x,
            Self::Selu => {
                let fx = if x > 0.0 { x } else { SELU_ALPHA * x.exp() - SELU_ALPHA };
                fx * SELU_SCALE
            }
        }
    }

    /// Evaluate the derivative of the function at `x`.
    pub fn derivative(self, x: f64) -> f64 {
        match self {
            Self::Logistic => {
                let fx = 1.0 / (1.0 + (-x).exp());
                fx * (1.0 - fx)
            }
            Self::Tanh => 1.0 - x.tanh().powi(2),
            Self::Identity => 1.0,
            Self::Step => 0.0,
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Softsign => {
                let d = 1.0 + x.abs();
                x / d.powi(2)
            }
            Self::Sinusoid => x.cos(),
            Self::Gaussian => -2.0 * x * (-(x * x)).exp(),
            Self::BentIdentity => x / (2.0 * (x * x + 1.0).sqrt()) + 1.0,
            Self::Bipolar => 0.0,
            Self::BipolarSigmoid => {
                let d = 2.0 / (1.0 + (-x).exp()) - 1.0;
                0.5 * (1.0 + d) * (1.0 - d)
            }
            Self::HardTanh => {
                if x > -1.0 && x < 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Absolute => {
                if x < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            Self::Inverse => -1.0,
            Self::Selu => {
                if x > 0.0 {
                    SELU_SCALE
                } else {
                    SELU_ALPHA * x.exp() * SELU_SCALE
                }
            }
        }
    }

    /// Stable index of this function in the wire form.
    pub fn index(self) -> usize {
        ALL.iter().position(|a| *a == self).unwrap_or(0)
    }

    /// Look up a function by wire index.
    pub fn from_index(index: usize) -> Option<Self> {
        ALL.get(index).copied()
    }

    /// Draw a random function from the catalog.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        ALL[rng.gen_range(0..ALL.len())]
    }

    /// Draw a random function from the catalog different from `self`.
    pub fn random_other<R: Rng>(self, rng: &mut R) -> Self {
        let current = self.index();
        ALL[(current + 1 + rng.gen_range(0..ALL.len() - 1)) % ALL.len()]
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::Logistic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic() {
        assert!((Activation::Logistic.value(0.0) - 0.5).abs() < 1e-12);
        assert!((Activation::Logistic.derivative(0.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_inverse() {
        assert_eq!(Activation::Inverse.value(0.3), 0.7);
        assert_eq!(Activation::Inverse.derivative(123.0), -1.0);
    }

    #[test]
    fn test_selu_continuous_at_zero() {
        let below = Activation::Selu.value(-1e-9);
        let above = Activation::Selu.value(1e-9);
        assert!((below - above).abs() < 1e-6);
    }

    #[test]
    fn test_index_roundtrip() {
        for (i, a) in ALL.iter().enumerate() {
            assert_eq!(a.index(), i);
            assert_eq!(Activation::from_index(i), Some(*a));
        }
        assert_eq!(Activation::from_index(ALL.len()), None);
    }

    #[test]
    fn test_random_other_differs() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let picked = Activation::Tanh.random_other(&mut rng);
            assert_ne!(picked, Activation::Tanh);
        }
    }
}
