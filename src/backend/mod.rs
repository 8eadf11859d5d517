use std::fmt::Debug;

use rand::Rng;

use crate::error::Result;

pub mod ndarray;

pub type Elm = f32;

pub trait Backend: Clone + Debug {
    type Tensor: Clone + Debug;

    fn zeros(shape: &[usize]) -> Self::Tensor;
    fn ones(shape: &[usize]) -> Self::Tensor;
    fn ones_like(tensor: &Self::Tensor) -> Self::Tensor;

    // 乱数生成器は呼び出し側が所有する(同じseedなら同じ結果になる)
    fn random_normal<R: Rng + ?Sized>(
        shape: &[usize],
        mean: Elm,
        std: Elm,
        rng: &mut R,
    ) -> Result<Self::Tensor>;
    fn random_uniform<R: Rng + ?Sized>(
        shape: &[usize],
        low: Elm,
        high: Elm,
        rng: &mut R,
    ) -> Result<Self::Tensor>;
    /// Draws 0/1 samples, each element is 1 with the probability given by `probs`.
    fn bernoulli<R: Rng + ?Sized>(probs: &Self::Tensor, rng: &mut R) -> Self::Tensor;

    // CPU配列からの作成
    fn from_vec(vec: Vec<Elm>, shape: &[usize]) -> Result<Self::Tensor>;
    fn from_vec_1d(vec: Vec<Elm>) -> Self::Tensor;
    // CPU配列への変換(行優先)
    fn to_vec(tensor: &Self::Tensor) -> Vec<Elm>;

    fn shape(tensor: &Self::Tensor) -> Vec<usize>;
    fn len(tensor: &Self::Tensor) -> usize;

    // 基本的な演算(全て新しいTensorを返す)
    // 右辺は左辺の形状にブロードキャストされる
    fn add(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn sub(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor;
    fn mul(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor; // 要素ごとの積
    fn scale(a: &Self::Tensor, s: Elm) -> Self::Tensor;
    fn matmul(a: &Self::Tensor, b: &Self::Tensor) -> Self::Tensor; // 行列積

    fn transpose(tensor: &Self::Tensor) -> Self::Tensor;

    fn sum(a: &Self::Tensor, axis: Option<usize>) -> Self::Tensor;
    fn sum_all(a: &Self::Tensor) -> Elm;
    fn mean(a: &Self::Tensor, axis: Option<usize>) -> Self::Tensor;

    fn sigmoid(a: &Self::Tensor) -> Self::Tensor;
    fn softplus(a: &Self::Tensor) -> Self::Tensor;
    fn relu(a: &Self::Tensor) -> Self::Tensor;
    fn log(a: &Self::Tensor) -> Self::Tensor;
    fn exp(a: &Self::Tensor) -> Self::Tensor;
    fn sqrt(a: &Self::Tensor) -> Self::Tensor;
    fn powi(a: &Self::Tensor, n: i32) -> Self::Tensor;
    fn clip(a: &Self::Tensor, min: Elm, max: Elm) -> Self::Tensor;

    fn norm2(a: &Self::Tensor) -> Elm;
    fn all_finite(a: &Self::Tensor) -> bool;
}
