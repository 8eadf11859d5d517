use ndarray::{Array1, ArrayD, Axis, Ix2};
use ndarray_rand::{RandomExt, rand_distr::Normal};
use rand::{Rng, distributions::Uniform};

use crate::backend::{Backend, Elm};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct NdArray;

impl Backend for NdArray {
    type Tensor = ArrayD<f32>;

    fn zeros(shape: &[usize]) -> Self::Tensor {
        ArrayD::zeros(shape)
    }
    fn ones(shape: &[usize]) -> Self::Tensor {
        ArrayD::ones(shape)
    }
    fn ones_like(tensor: &Self::Tensor) -> Self::Tensor {
        ArrayD::ones(tensor.shape())
    }
    fn random_normal<R: Rng + ?Sized>(
        shape: &[usize],
        mean: Elm,
        std: Elm,
        rng: &mut R,
    ) -> Result<Self::Tensor> {
        // rand_distrは負のstdを通してしまう
        if !(std >= 0.0 && std.is_finite() && mean.is_finite()) {
            return Err(Error::InvalidConfiguration(format!(
                "normal(mean={mean}, std={std}): std must be finite and non-negative"
            )));
        }
        let normal = Normal::new(mean, std).map_err(|e| {
            Error::InvalidConfiguration(format!("normal(mean={mean}, std={std}): {e}"))
        })?;
        Ok(ArrayD::random_using(shape, normal, rng))
    }
    fn random_uniform<R: Rng + ?Sized>(
        shape: &[usize],
        low: Elm,
        high: Elm,
        rng: &mut R,
    ) -> Result<Self::Tensor> {
        if !(low < high && low.is_finite() && high.is_finite()) {
            return Err(Error::InvalidConfiguration(format!(
                "uniform(low={low}, high={high}): need finite low < high"
            )));
        }
        Ok(ArrayD::random_using(shape, Uniform::new(low, high), rng))
    }
    fn bernoulli<R: Rng + ?Sized>(probs: &Self::Tensor, rng: &mut R) -> Self::Tensor {
        let u = ArrayD::<Elm>::random_using(probs.shape(), Uniform::new(0.0, 1.0), rng);
        (probs - &u).mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }

    fn from_vec(vec: Vec<Elm>, shape: &[usize]) -> Result<Self::Tensor> {
        let len = vec.len();
        ArrayD::from_shape_vec(shape, vec).map_err(|e| {
            Error::InvalidShape(format!("{len} elements into shape {shape:?}: {e}"))
        })
    }
    fn from_vec_1d(vec: Vec<Elm>) -> Self::Tensor {
        Array1::from_vec(vec).into_dyn()
    }
    fn to_vec(tensor: &Self::Tensor) -> Vec<Elm> {
        tensor.iter().cloned().collect()
    }

    fn shape(tensor: &Self::Tensor) -> Vec<usize> {
        tensor.shape().to_vec()
    }
    fn len(tensor: &Self::Tensor) -> usize {
        tensor.len()
    }

    fn add(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor {
        a + b
    }
    fn sub(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor {
        a - b
    }
    fn mul(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor {
        a * b
    }
    fn scale(a: &Self::Tensor, s: Elm) -> Self::Tensor {
        a.mapv(|v| v * s)
    }
    // 2次元同士の行列積のみサポートする
    fn matmul(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor {
        match (
            a.view().into_dimensionality::<Ix2>(),
            b.view().into_dimensionality::<Ix2>(),
        ) {
            (Ok(a_view), Ok(b_view)) => {
                assert_eq!(
                    a_view.ncols(),
                    b_view.nrows(),
                    "Inner dimensions must match for matmul"
                );
                a_view.dot(&b_view).into_dyn()
            }
            _ => panic!(
                "Unsupported dimensions for matmul: A ndim={}, B ndim={} (shapes: {:?}, {:?})",
                a.ndim(),
                b.ndim(),
                a.shape(),
                b.shape()
            ),
        }
    }

    fn transpose(tensor: &Self::Tensor) -> Self::Tensor {
        // 転置ビューのままだとメモリ順がF順になるので行優先で作り直す
        tensor.t().as_standard_layout().to_owned()
    }

    fn sum(a: &Self::Tensor, axis: Option<usize>) -> Self::Tensor {
        match axis {
            Some(ax) => a.sum_axis(Axis(ax)),
            None => ArrayD::from_elem(vec![], a.sum()),
        }
    }
    fn sum_all(a: &Self::Tensor) -> Elm {
        a.sum()
    }
    fn mean(a: &Self::Tensor, axis: Option<usize>) -> Self::Tensor {
        match axis {
            Some(ax) => {
                let n = a.shape()[ax].max(1) as Elm;
                a.sum_axis(Axis(ax)).mapv(|v| v / n)
            }
            None => {
                let n = a.len().max(1) as Elm;
                ArrayD::from_elem(vec![], a.sum() / n)
            }
        }
    }

    fn sigmoid(a: &Self::Tensor) -> Self::Tensor {
        a.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
    // log(1 + e^x), 大きいxではxそのもの
    fn softplus(a: &Self::Tensor) -> Self::Tensor {
        a.mapv(|v| if v > 20.0 { v } else { v.exp().ln_1p() })
    }
    fn relu(a: &Self::Tensor) -> Self::Tensor {
        a.mapv(|v| v.max(0.0))
    }
    fn log(a: &Self::Tensor) -> Self::Tensor {
        a.mapv(|v| v.ln())
    }
    fn exp(a: &Self::Tensor) -> Self::Tensor {
        a.mapv(|v| v.exp())
    }
    fn sqrt(a: &Self::Tensor) -> Self::Tensor {
        a.mapv(|v| v.sqrt())
    }
    fn powi(a: &Self::Tensor, n: i32) -> Self::Tensor {
        a.mapv(|v| v.powi(n))
    }
    fn clip(a: &Self::Tensor, min: Elm, max: Elm) -> Self::Tensor {
        a.mapv(|v| v.clamp(min, max))
    }

    fn norm2(a: &Self::Tensor) -> Elm {
        a.iter().map(|v| v * v).sum::<Elm>().sqrt()
    }
    fn all_finite(a: &Self::Tensor) -> bool {
        a.iter().all(|v| v.is_finite())
    }
}
