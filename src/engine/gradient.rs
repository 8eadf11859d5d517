use crate::backend::{Backend, Elm};

pub const WEIGHT_KEY: &str = "W";
pub const VISIBLE_BIAS_KEY: &str = "vb";
pub const HIDDEN_BIAS_KEY: &str = "hb";

/// Gradients of one training step, keyed by parameter name.
///
/// Entries keep insertion order, so `flatten` and `global_norm` are
/// deterministic.
#[derive(Debug, Clone)]
pub struct Gradient<B: Backend> {
    entries: Vec<(String, B::Tensor)>,
}

impl<B: Backend> Default for Gradient<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Gradient<B> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts or replaces the gradient for `key`.
    pub fn insert(&mut self, key: &str, grad: B::Tensor) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = grad,
            None => self.entries.push((key.to_string(), grad)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&B::Tensor> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn gradient_for(&self, key: &str) -> Option<&B::Tensor> {
        self.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &B::Tensor)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Euclidean norm over every entry taken together.
    pub fn global_norm(&self) -> Elm {
        self.entries
            .iter()
            .map(|(_, t)| B::norm2(t).powi(2))
            .sum::<Elm>()
            .sqrt()
    }

    pub fn all_finite(&self) -> bool {
        self.entries.iter().all(|(_, t)| B::all_finite(t))
    }

    /// Concatenates every entry in insertion order.
    pub fn flatten(&self) -> Vec<Elm> {
        self.entries.iter().flat_map(|(_, t)| B::to_vec(t)).collect()
    }
}
