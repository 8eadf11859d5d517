// 可視層・隠れ層のユニットの種類。活性と確率的サンプリングの方法を決める

use rand::Rng;

use crate::backend::Backend;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    /// Stochastic 0/1 units with sigmoid mean
    #[default]
    Binary,
    /// Linear units with unit-variance noise
    Gaussian,
    /// Noisy rectified linear units
    Rectified,
}

impl Unit {
    /// Mean activation for a pre-activation `pre` (`x·W + b`).
    pub fn mean<B: Backend>(self, pre: &B::Tensor) -> B::Tensor {
        match self {
            Unit::Binary => B::sigmoid(pre),
            Unit::Gaussian => pre.clone(),
            Unit::Rectified => B::softplus(pre),
        }
    }

    /// Samples unit states given the pre-activation and its mean.
    pub fn sample<B: Backend, R: Rng + ?Sized>(
        self,
        pre: &B::Tensor,
        mean: &B::Tensor,
        rng: &mut R,
    ) -> Result<B::Tensor> {
        match self {
            Unit::Binary => Ok(B::bernoulli(mean, rng)),
            Unit::Gaussian => {
                let noise = B::random_normal(&B::shape(mean), 0.0, 1.0, rng)?;
                Ok(B::add(mean, &noise))
            }
            Unit::Rectified => {
                // max(0, x + N(0, sigmoid(x)))
                let noise = B::random_normal(&B::shape(pre), 0.0, 1.0, rng)?;
                let std = B::sqrt(&B::sigmoid(pre));
                Ok(B::relu(&B::add(pre, &B::mul(&noise, &std))))
            }
        }
    }
}
