use super::dataset::Dataset;
use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng, thread_rng};

pub struct DataLoader<'a, D: Dataset> {
    dataset: &'a D,
    batch_size: usize,
    shuffle: bool,
    indices: Vec<usize>,
    // Noneならエポックごとにthread_rngで並べ替える
    rng: Option<StdRng>,
}

impl<'a, D: Dataset> DataLoader<'a, D> {
    pub fn new(dataset: &'a D, batch_size: usize, shuffle: bool) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();
        Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            indices,
            rng: None,
        }
    }

    /// Shuffles with a seeded generator so epochs are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn iter(&mut self) -> DataLoaderIterator<'a, D> {
        let mut indices = self.indices.clone();
        if self.shuffle {
            match self.rng.as_mut() {
                Some(rng) => indices.shuffle(rng),
                None => indices.shuffle(&mut thread_rng()),
            }
        }

        DataLoaderIterator {
            dataset: self.dataset,
            indices,
            batch_size: self.batch_size,
            current_idx: 0,
        }
    }
}

pub struct DataLoaderIterator<'a, D: Dataset> {
    dataset: &'a D,
    indices: Vec<usize>,
    batch_size: usize,
    current_idx: usize,
}

impl<'a, D: Dataset> Iterator for DataLoaderIterator<'a, D> {
    type Item = Vec<D::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_idx >= self.indices.len() {
            return None;
        }

        let end_idx = (self.current_idx + self.batch_size).min(self.indices.len());
        let batch_indices = &self.indices[self.current_idx..end_idx];
        let batch: Vec<D::Item> = batch_indices.iter().map(|&i| self.dataset.get(i)).collect();

        self.current_idx += self.batch_size;
        Some(batch)
    }
}
