use std::collections::HashMap;

use log::warn;

use crate::backend::{Backend, Elm};
use crate::engine::config::Configuration;
use crate::engine::gradient::{Gradient, WEIGHT_KEY};
use crate::error::{Error, Result};

pub trait Optimizer<B: Backend> {
    /// Applies one update to a single parameter.
    fn update_param(&mut self, key: &str, param: &mut B::Tensor, grad: &B::Tensor);

    /// Applies one update to every parameter that has an entry in `gradient`.
    fn step(&mut self, params: Vec<(&str, &mut B::Tensor)>, gradient: &Gradient<B>)
    -> Result<()>;
}

/// Iteration gradient descent with optional momentum, L2 decay on the
/// weights and unit-norm gradient clipping.
#[derive(Debug, Clone)]
pub struct GradientDescent<B: Backend> {
    lr: Elm,
    momentum: Elm,
    l2: Elm,
    constrain_unit_norm: bool,
    enforce_numerical_stability: bool,
    // パラメータごとの速度
    velocity: HashMap<String, B::Tensor>,
}

impl<B: Backend> GradientDescent<B> {
    pub fn new(lr: Elm) -> Self {
        Self {
            lr,
            momentum: 0.0,
            l2: 0.0,
            constrain_unit_norm: false,
            enforce_numerical_stability: false,
            velocity: HashMap::new(),
        }
    }

    pub fn from_conf(conf: &Configuration) -> Self {
        Self {
            lr: conf.learning_rate(),
            momentum: conf.momentum(),
            l2: conf.l2(),
            constrain_unit_norm: conf.constrain_gradient_to_unit_norm(),
            enforce_numerical_stability: conf.enforce_numerical_stability(),
            velocity: HashMap::new(),
        }
    }

    pub fn with_momentum(mut self, momentum: Elm) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_l2(mut self, l2: Elm) -> Self {
        self.l2 = l2;
        self
    }

    pub fn constrain_unit_norm(mut self, enabled: bool) -> Self {
        self.constrain_unit_norm = enabled;
        self
    }

    pub fn enforce_numerical_stability(mut self, enabled: bool) -> Self {
        self.enforce_numerical_stability = enabled;
        self
    }

    pub fn learning_rate(&self) -> Elm {
        self.lr
    }
}

impl<B: Backend> Optimizer<B> for GradientDescent<B> {
    fn update_param(&mut self, key: &str, param: &mut B::Tensor, grad: &B::Tensor) {
        let step = if self.momentum > 0.0 {
            // v = momentum * v + lr * g
            let scaled = B::scale(grad, self.lr);
            let v = match self.velocity.get(key) {
                Some(prev) => B::add(&B::scale(prev, self.momentum), &scaled),
                None => scaled,
            };
            self.velocity.insert(key.to_string(), v.clone());
            v
        } else {
            B::scale(grad, self.lr)
        };
        *param = B::sub(param, &step);
    }

    fn step(
        &mut self,
        params: Vec<(&str, &mut B::Tensor)>,
        gradient: &Gradient<B>,
    ) -> Result<()> {
        if !gradient.all_finite() {
            if self.enforce_numerical_stability {
                return Err(Error::NumericalInstability(
                    "gradient contains NaN or infinite values".into(),
                ));
            }
            warn!("Gradient contains NaN or infinite values, applying it anyway");
        }

        // 途中で失敗して一部だけ更新されないよう、先に全ての勾配を引く
        // L2項はクリップ前に足す(適用される勾配のノルムが1を超えないように)
        let mut pending = Vec::with_capacity(params.len());
        for (key, param) in params {
            let grad = gradient.get(key).ok_or_else(|| {
                Error::IllegalState(format!("no gradient for parameter {key}"))
            })?;
            let grad = if key == WEIGHT_KEY && self.l2 > 0.0 {
                B::add(grad, &B::scale(param, self.l2))
            } else {
                grad.clone()
            };
            pending.push((key, param, grad));
        }

        let norm = pending
            .iter()
            .map(|(_, _, g)| B::norm2(g).powi(2))
            .sum::<Elm>()
            .sqrt();
        let factor = if self.constrain_unit_norm && norm > 1.0 {
            1.0 / norm
        } else {
            1.0
        };

        for (key, param, grad) in pending {
            let grad = if factor != 1.0 {
                B::scale(&grad, factor)
            } else {
                grad
            };
            self.update_param(key, param, &grad);
        }
        Ok(())
    }
}
