use crate::backend::Elm;
use crate::engine::layer::{units::Unit, weight_init::WeightInit};
use crate::engine::loss::LossFunction;
use crate::error::{Error, Result};

/// Hyperparameters of a single RBM layer.
///
/// Built through [`ConfigurationBuilder::build`], which validates every field.
/// Nothing can be changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    n_in: usize,
    n_out: usize,
    learning_rate: Elm,
    iterations: usize,
    k: usize,
    loss_function: LossFunction,
    visible_unit: Unit,
    hidden_unit: Unit,
    weight_init: WeightInit,
    momentum: Elm,
    l2: Elm,
    constrain_gradient_to_unit_norm: bool,
    enforce_numerical_stability: bool,
    seed: u64,
}

impl Configuration {
    pub fn n_in(&self) -> usize {
        self.n_in
    }
    pub fn n_out(&self) -> usize {
        self.n_out
    }
    pub fn learning_rate(&self) -> Elm {
        self.learning_rate
    }
    pub fn iterations(&self) -> usize {
        self.iterations
    }
    /// Gibbs steps per contrastive divergence update
    pub fn k(&self) -> usize {
        self.k
    }
    pub fn loss_function(&self) -> LossFunction {
        self.loss_function
    }
    pub fn visible_unit(&self) -> Unit {
        self.visible_unit
    }
    pub fn hidden_unit(&self) -> Unit {
        self.hidden_unit
    }
    pub fn weight_init(&self) -> WeightInit {
        self.weight_init
    }
    pub fn momentum(&self) -> Elm {
        self.momentum
    }
    pub fn l2(&self) -> Elm {
        self.l2
    }
    pub fn constrain_gradient_to_unit_norm(&self) -> bool {
        self.constrain_gradient_to_unit_norm
    }
    pub fn enforce_numerical_stability(&self) -> bool {
        self.enforce_numerical_stability
    }
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Unvalidated field set; fill with a struct literal and call [`build`](Self::build).
///
/// ```
/// use boltzmann::engine::config::ConfigurationBuilder;
/// use boltzmann::engine::loss::LossFunction;
///
/// let conf = ConfigurationBuilder {
///     n_in: 6,
///     n_out: 4,
///     learning_rate: 0.1,
///     loss_function: LossFunction::RmseXent,
///     ..Default::default()
/// }
/// .build()
/// .unwrap();
/// assert_eq!(conf.n_in(), 6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationBuilder {
    pub n_in: usize,
    pub n_out: usize,
    pub learning_rate: Elm,
    pub iterations: usize,
    pub k: usize,
    pub loss_function: LossFunction,
    pub visible_unit: Unit,
    pub hidden_unit: Unit,
    pub weight_init: WeightInit,
    pub momentum: Elm,
    pub l2: Elm,
    pub constrain_gradient_to_unit_norm: bool,
    pub enforce_numerical_stability: bool,
    pub seed: u64,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self {
            n_in: 0,
            n_out: 0,
            learning_rate: 0.1,
            iterations: 5,
            k: 1,
            loss_function: LossFunction::default(),
            visible_unit: Unit::Binary,
            hidden_unit: Unit::Binary,
            weight_init: WeightInit::default(),
            momentum: 0.0,
            l2: 0.0,
            constrain_gradient_to_unit_norm: false,
            enforce_numerical_stability: false,
            seed: 123,
        }
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidConfiguration(msg)
}

impl ConfigurationBuilder {
    pub fn build(self) -> Result<Configuration> {
        if self.n_in == 0 {
            return Err(invalid("n_in must be positive".into()));
        }
        if self.n_out == 0 {
            return Err(invalid("n_out must be positive".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.iterations == 0 {
            return Err(invalid("iterations must be at least 1".into()));
        }
        if self.k == 0 {
            return Err(invalid("k must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(invalid(format!(
                "momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }
        if !(self.l2 >= 0.0 && self.l2.is_finite()) {
            return Err(invalid(format!("l2 must be non-negative, got {}", self.l2)));
        }
        if let WeightInit::Distribution(dist) = self.weight_init {
            dist.validate()?;
        }

        Ok(Configuration {
            n_in: self.n_in,
            n_out: self.n_out,
            learning_rate: self.learning_rate,
            iterations: self.iterations,
            k: self.k,
            loss_function: self.loss_function,
            visible_unit: self.visible_unit,
            hidden_unit: self.hidden_unit,
            weight_init: self.weight_init,
            momentum: self.momentum,
            l2: self.l2,
            constrain_gradient_to_unit_norm: self.constrain_gradient_to_unit_norm,
            enforce_numerical_stability: self.enforce_numerical_stability,
            seed: self.seed,
        })
    }
}
