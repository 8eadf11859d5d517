use rand::Rng;

use crate::backend::{Backend, Elm};
use crate::error::{Error, Result};

/// Probability distribution used to draw initial weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Normal { mean: Elm, std: Elm },
    Uniform { low: Elm, high: Elm },
}

impl Distribution {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Distribution::Normal { mean, std } => {
                if !(std > 0.0 && std.is_finite() && mean.is_finite()) {
                    return Err(Error::InvalidConfiguration(format!(
                        "normal distribution needs finite mean and std > 0, got mean={mean}, std={std}"
                    )));
                }
            }
            Distribution::Uniform { low, high } => {
                if !(low < high && low.is_finite() && high.is_finite()) {
                    return Err(Error::InvalidConfiguration(format!(
                        "uniform distribution needs low < high, got [{low}, {high})"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn sample<B: Backend, R: Rng + ?Sized>(
        &self,
        shape: &[usize],
        rng: &mut R,
    ) -> Result<B::Tensor> {
        self.validate()?;
        match *self {
            Distribution::Normal { mean, std } => B::random_normal(shape, mean, std, rng),
            Distribution::Uniform { low, high } => B::random_uniform(shape, low, high, rng),
        }
    }
}

// 重みの初期化戦略
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WeightInit {
    Zero,
    /// U(-1/n_in, 1/n_in)
    Uniform,
    /// U(-r, r), r = sqrt(6) / sqrt(n_in + n_out + 1)
    #[default]
    VarianceScaled,
    Distribution(Distribution),
}

impl WeightInit {
    /// Returns an `[n_in, n_out]` weight matrix.
    pub fn init<B: Backend, R: Rng + ?Sized>(
        self,
        n_in: usize,
        n_out: usize,
        rng: &mut R,
    ) -> Result<B::Tensor> {
        let shape = [n_in, n_out];
        match self {
            WeightInit::Zero => Ok(B::zeros(&shape)),
            WeightInit::Uniform => {
                let a = 1.0 / n_in as Elm;
                B::random_uniform(&shape, -a, a, rng)
            }
            WeightInit::VarianceScaled => {
                let r = (6.0 as Elm).sqrt() / ((n_in + n_out + 1) as Elm).sqrt();
                B::random_uniform(&shape, -r, r, rng)
            }
            WeightInit::Distribution(dist) => dist.sample::<B, R>(&shape, rng),
        }
    }
}
