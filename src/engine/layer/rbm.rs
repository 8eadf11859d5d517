use std::cell::Cell;

use log::{debug, warn};
use rand::{SeedableRng, rngs::StdRng};

use crate::backend::{Backend, Elm};
use crate::engine::config::Configuration;
use crate::engine::gradient::{Gradient, HIDDEN_BIAS_KEY, VISIBLE_BIAS_KEY, WEIGHT_KEY};
use crate::engine::layer::{Layer, LayerState, units::Unit};
use crate::engine::listener::IterationListener;
use crate::engine::optimizer::{GradientDescent, Optimizer};
use crate::error::{Error, Result};

/// Mean activations of one layer together with the states sampled from them.
#[derive(Debug, Clone)]
pub struct Sampled<B: Backend> {
    pub mean: B::Tensor,
    pub sample: B::Tensor,
}

/// Restricted Boltzmann Machine trained with k-step contrastive divergence.
///
/// W is `[n_in, n_out]`, the visible bias `[n_in]`, the hidden bias `[n_out]`.
/// Inputs are `[Batch, n_in]`. All randomness (weight init and Gibbs
/// sampling) is drawn from one generator seeded with `conf.seed()`, so two
/// layers built from the same configuration and fed the same batches produce
/// identical results.
#[derive(Debug)]
pub struct Rbm<B: Backend> {
    conf: Configuration,
    w: B::Tensor,
    vb: B::Tensor,
    hb: B::Tensor,
    input: Option<B::Tensor>,
    gradient: Option<Gradient<B>>,
    // パラメータか入力が変わるまで有効
    score: Cell<Option<Elm>>,
    optimizer: GradientDescent<B>,
    rng: StdRng,
    state: LayerState,
}

impl<B: Backend> Rbm<B> {
    pub fn new(conf: Configuration) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(conf.seed());
        let w = conf
            .weight_init()
            .init::<B, _>(conf.n_in(), conf.n_out(), &mut rng)?;
        let vb = B::zeros(&[conf.n_in()]);
        let hb = B::zeros(&[conf.n_out()]);
        let optimizer = GradientDescent::from_conf(&conf);

        Ok(Self {
            conf,
            w,
            vb,
            hb,
            input: None,
            gradient: None,
            score: Cell::new(None),
            optimizer,
            rng,
            state: LayerState::Configured,
        })
    }

    pub fn conf(&self) -> &Configuration {
        &self.conf
    }

    pub fn weights(&self) -> &B::Tensor {
        &self.w
    }

    pub fn visible_bias(&self) -> &B::Tensor {
        &self.vb
    }

    pub fn hidden_bias(&self) -> &B::Tensor {
        &self.hb
    }

    pub fn input(&self) -> Option<&B::Tensor> {
        self.input.as_ref()
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    /// Hidden mean activations for a visible batch.
    pub fn prop_up(&self, visible: &B::Tensor) -> Result<B::Tensor> {
        check_columns::<B>(visible, self.conf.n_in(), "visible")?;
        Ok(self.hidden_mean(visible))
    }

    /// Visible mean activations for a hidden batch.
    pub fn prop_down(&self, hidden: &B::Tensor) -> Result<B::Tensor> {
        check_columns::<B>(hidden, self.conf.n_out(), "hidden")?;
        Ok(self.visible_mean(hidden))
    }

    pub fn sample_hidden_given_visible(&mut self, visible: &B::Tensor) -> Result<Sampled<B>> {
        check_columns::<B>(visible, self.conf.n_in(), "visible")?;
        self.sample_hidden(visible)
    }

    pub fn sample_visible_given_hidden(&mut self, hidden: &B::Tensor) -> Result<Sampled<B>> {
        check_columns::<B>(hidden, self.conf.n_out(), "hidden")?;
        self.sample_visible(hidden)
    }

    /// One Gibbs step h -> v -> h. Returns the visible and hidden halves.
    pub fn gibbs_hvh(&mut self, hidden: &B::Tensor) -> Result<(Sampled<B>, Sampled<B>)> {
        check_columns::<B>(hidden, self.conf.n_out(), "hidden")?;
        self.gibbs_step(hidden)
    }

    /// Deterministic reconstruction: visible means of the hidden means.
    pub fn reconstruct(&self, visible: &B::Tensor) -> Result<B::Tensor> {
        check_columns::<B>(visible, self.conf.n_in(), "visible")?;
        Ok(self.visible_mean(&self.hidden_mean(visible)))
    }

    /// Hidden features for a visible batch (same as [`prop_up`](Self::prop_up)).
    pub fn transform(&self, visible: &B::Tensor) -> Result<B::Tensor> {
        self.prop_up(visible)
    }

    /// Free energy of every row, with the hidden units summed out.
    ///
    /// Binary visible units contribute `-v·vb`, Gaussian ones `0.5·|v - vb|²`.
    /// Binary hidden units contribute `-sum_j softplus(v·W + hb)_j`, Gaussian
    /// ones `-0.5·sum_j (v·W + hb)_j²`. Rectified units have no closed form
    /// and give `InvalidConfiguration`.
    pub fn free_energy(&self, visible: &B::Tensor) -> Result<B::Tensor> {
        check_columns::<B>(visible, self.conf.n_in(), "visible")?;
        let visible_term = match self.conf.visible_unit() {
            Unit::Binary => B::scale(&B::sum(&B::mul(visible, &self.vb), Some(1)), -1.0),
            Unit::Gaussian => {
                let diff = B::sub(visible, &self.vb);
                B::scale(&B::sum(&B::powi(&diff, 2), Some(1)), 0.5)
            }
            Unit::Rectified => return Err(no_free_energy("visible")),
        };
        let pre = self.hidden_pre(visible);
        let hidden_term = match self.conf.hidden_unit() {
            Unit::Binary => B::scale(&B::sum(&B::softplus(&pre), Some(1)), -1.0),
            Unit::Gaussian => B::scale(&B::sum(&B::powi(&pre, 2), Some(1)), -0.5),
            Unit::Rectified => return Err(no_free_energy("hidden")),
        };
        Ok(B::add(&visible_term, &hidden_term))
    }

    /// Runs one CD-k step on the current input and stores the gradient.
    ///
    /// Parameters are left untouched. The stored gradient is the descent
    /// direction: `(negative - positive) / batch` for W and the biases.
    pub fn contrastive_divergence(&mut self) -> Result<()> {
        let input = self
            .input
            .clone()
            .ok_or_else(|| Error::IllegalState("no input set for contrastive divergence".into()))?;

        // 正のフェーズ
        let positive = self.sample_hidden(&input)?;

        // 負のフェーズ(k回のギブスサンプリング)
        let (mut nv, mut nh) = self.gibbs_step(&positive.sample)?;
        for _ in 1..self.conf.k() {
            let (v, h) = self.gibbs_step(&nh.sample)?;
            nv = v;
            nh = h;
        }

        let batch = B::shape(&input)[0] as Elm;
        let pos_w = B::matmul(&B::transpose(&input), &positive.mean);
        let neg_w = B::matmul(&B::transpose(&nv.sample), &nh.mean);
        let w_grad = B::scale(&B::sub(&neg_w, &pos_w), 1.0 / batch);
        let vb_grad = B::mean(&B::sub(&nv.sample, &input), Some(0));
        let hb_grad = B::mean(&B::sub(&nh.mean, &positive.mean), Some(0));

        let mut gradient = Gradient::new();
        gradient.insert(WEIGHT_KEY, w_grad);
        gradient.insert(VISIBLE_BIAS_KEY, vb_grad);
        gradient.insert(HIDDEN_BIAS_KEY, hb_grad);
        self.gradient = Some(gradient);
        Ok(())
    }

    /// Trains on `input`, reporting the post-update score of every iteration
    /// to `listener`.
    pub fn fit_with(
        &mut self,
        input: &B::Tensor,
        listener: &mut dyn IterationListener,
    ) -> Result<()> {
        self.set_input(input)?;

        for iteration in 0..self.conf.iterations() {
            self.contrastive_divergence()?;
            let gradient = self.gradient.as_ref().ok_or_else(|| {
                Error::IllegalState("contrastive divergence produced no gradient".into())
            })?;
            self.optimizer.step(
                vec![
                    (WEIGHT_KEY, &mut self.w),
                    (VISIBLE_BIAS_KEY, &mut self.vb),
                    (HIDDEN_BIAS_KEY, &mut self.hb),
                ],
                gradient,
            )?;
            self.score.set(None);

            let score = self.score()?;
            if !score.is_finite() {
                if self.conf.enforce_numerical_stability() {
                    return Err(Error::NumericalInstability(format!(
                        "score became {score} at iteration {iteration}"
                    )));
                }
                warn!("Score became {} at iteration {}", score, iteration);
            }
            debug!("Iteration {} score {}", iteration, score);
            listener.iteration_done(iteration, score);
        }

        self.state = LayerState::Fitted;
        Ok(())
    }

    fn hidden_pre(&self, visible: &B::Tensor) -> B::Tensor {
        B::add(&B::matmul(visible, &self.w), &self.hb)
    }

    fn visible_pre(&self, hidden: &B::Tensor) -> B::Tensor {
        B::add(&B::matmul(hidden, &B::transpose(&self.w)), &self.vb)
    }

    fn hidden_mean(&self, visible: &B::Tensor) -> B::Tensor {
        self.conf.hidden_unit().mean::<B>(&self.hidden_pre(visible))
    }

    fn visible_mean(&self, hidden: &B::Tensor) -> B::Tensor {
        self.conf.visible_unit().mean::<B>(&self.visible_pre(hidden))
    }

    fn sample_hidden(&mut self, visible: &B::Tensor) -> Result<Sampled<B>> {
        let unit = self.conf.hidden_unit();
        let pre = self.hidden_pre(visible);
        let mean = unit.mean::<B>(&pre);
        let sample = unit.sample::<B, _>(&pre, &mean, &mut self.rng)?;
        Ok(Sampled { mean, sample })
    }

    fn sample_visible(&mut self, hidden: &B::Tensor) -> Result<Sampled<B>> {
        let unit = self.conf.visible_unit();
        let pre = self.visible_pre(hidden);
        let mean = unit.mean::<B>(&pre);
        let sample = unit.sample::<B, _>(&pre, &mean, &mut self.rng)?;
        Ok(Sampled { mean, sample })
    }

    fn gibbs_step(&mut self, hidden: &B::Tensor) -> Result<(Sampled<B>, Sampled<B>)> {
        let visible = self.sample_visible(hidden)?;
        let hidden = self.sample_hidden(&visible.sample)?;
        Ok((visible, hidden))
    }
}

impl<B: Backend> Layer<B> for Rbm<B> {
    fn set_input(&mut self, input: &B::Tensor) -> Result<()> {
        check_columns::<B>(input, self.conf.n_in(), "input")?;
        self.input = Some(input.clone());
        self.score.set(None);
        Ok(())
    }

    fn fit(&mut self, input: &B::Tensor) -> Result<()> {
        self.fit_with(input, &mut |_: usize, _: Elm| {})
    }

    fn score(&self) -> Result<Elm> {
        if let Some(score) = self.score.get() {
            return Ok(score);
        }
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| Error::IllegalState("no input set to score against".into()))?;
        let reconstruction = self.visible_mean(&self.hidden_mean(input));
        let score = self
            .conf
            .loss_function()
            .score::<B>(input, &reconstruction);
        self.score.set(Some(score));
        Ok(score)
    }

    fn gradient(&self) -> Result<&Gradient<B>> {
        self.gradient.as_ref().ok_or_else(|| {
            Error::IllegalState("gradient requested before any contrastive divergence step".into())
        })
    }

    fn params(&self) -> B::Tensor {
        let mut flat = B::to_vec(&self.w);
        flat.extend(B::to_vec(&self.vb));
        flat.extend(B::to_vec(&self.hb));
        B::from_vec_1d(flat)
    }

    fn set_params(&mut self, params: &B::Tensor) -> Result<()> {
        let flat = B::to_vec(params);
        let expected = self.num_params();
        if flat.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: flat.len(),
            });
        }

        let (n_in, n_out) = (self.conf.n_in(), self.conf.n_out());
        let (w, rest) = flat.split_at(n_in * n_out);
        let (vb, hb) = rest.split_at(n_in);
        let w = B::from_vec(w.to_vec(), &[n_in, n_out])?;

        self.w = w;
        self.vb = B::from_vec_1d(vb.to_vec());
        self.hb = B::from_vec_1d(hb.to_vec());
        self.score.set(None);
        Ok(())
    }

    fn num_params(&self) -> usize {
        let (n_in, n_out) = (self.conf.n_in(), self.conf.n_out());
        n_in * n_out + n_in + n_out
    }
}

fn no_free_energy(side: &str) -> Error {
    Error::InvalidConfiguration(format!(
        "free energy is not defined for rectified {side} units"
    ))
}

// [Batch, cols] であることを確認する
fn check_columns<B: Backend>(tensor: &B::Tensor, cols: usize, what: &str) -> Result<()> {
    let shape = B::shape(tensor);
    match shape.as_slice() {
        [rows, c] if *rows > 0 && *c == cols => Ok(()),
        _ => Err(Error::InvalidShape(format!(
            "{what} must be [batch, {cols}] with batch > 0, got {shape:?}"
        ))),
    }
}
