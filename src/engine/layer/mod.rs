use crate::backend::{Backend, Elm};
use crate::engine::gradient::Gradient;
use crate::error::Result;

pub mod rbm;
pub mod units;
pub mod weight_init;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    /// Built from a configuration, not trained yet
    Configured,
    /// At least one `fit` call completed
    Fitted,
}

// 学習可能なレイヤーのトレイト
// パラメータは W(行優先), 可視バイアス, 隠れバイアス の順で一つのベクトルに平坦化される
pub trait Layer<B: Backend> {
    fn set_input(&mut self, input: &B::Tensor) -> Result<()>;

    fn fit(&mut self, input: &B::Tensor) -> Result<()>;

    fn score(&self) -> Result<Elm>;

    fn gradient(&self) -> Result<&Gradient<B>>;

    fn params(&self) -> B::Tensor;

    fn set_params(&mut self, params: &B::Tensor) -> Result<()>;

    fn num_params(&self) -> usize;
}
