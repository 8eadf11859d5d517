use crate::backend::{Backend, Elm};

// log(0)を避けるためのクリップ幅
const EPS: Elm = 1e-7;

/// Reconstruction losses used to score a layer.
///
/// `labels` and `output` are `[Batch, Features]`; "per row" means the value is
/// summed over features and averaged over the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LossFunction {
    /// 0.5 * squared error, per row
    Mse,
    /// Binary cross entropy averaged over every element
    Xent,
    /// Multi-class cross entropy `-sum(labels * ln(output))`, per row
    Mcxent,
    /// Root of the per-row squared error
    RmseXent,
    /// Plain sum of squared errors
    SquaredLoss,
    /// Binary cross entropy, per row
    #[default]
    ReconstructionCrossEntropy,
}

impl LossFunction {
    pub fn score<B: Backend>(self, labels: &B::Tensor, output: &B::Tensor) -> Elm {
        let rows = B::shape(labels).first().copied().unwrap_or(1).max(1) as Elm;
        match self {
            LossFunction::Mse => 0.5 * squared_error::<B>(labels, output) / rows,
            LossFunction::SquaredLoss => squared_error::<B>(labels, output),
            LossFunction::RmseXent => (squared_error::<B>(labels, output) / rows).sqrt(),
            LossFunction::Xent => {
                let n = B::len(labels).max(1) as Elm;
                binary_cross_entropy::<B>(labels, output) / n
            }
            LossFunction::ReconstructionCrossEntropy => {
                binary_cross_entropy::<B>(labels, output) / rows
            }
            LossFunction::Mcxent => {
                let log_z = B::log(&B::clip(output, EPS, Elm::MAX));
                -B::sum_all(&B::mul(labels, &log_z)) / rows
            }
        }
    }
}

fn squared_error<B: Backend>(labels: &B::Tensor, output: &B::Tensor) -> Elm {
    B::sum_all(&B::powi(&B::sub(labels, output), 2))
}

// -sum(y * ln(z) + (1 - y) * ln(1 - z))
fn binary_cross_entropy<B: Backend>(labels: &B::Tensor, output: &B::Tensor) -> Elm {
    let z = B::clip(output, EPS, 1.0 - EPS);
    let ones = B::ones_like(labels);
    let log_z = B::log(&z);
    let log_one_minus_z = B::log(&B::sub(&ones, &z));
    let pos = B::mul(labels, &log_z);
    let neg = B::mul(&B::sub(&ones, labels), &log_one_minus_z);
    -B::sum_all(&B::add(&pos, &neg))
}
