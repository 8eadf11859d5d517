use crate::backend::Elm;

pub trait Dataset {
    type Item;
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Self::Item;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Feature rows held in memory, e.g. an already normalized feature matrix.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    rows: Vec<Vec<Elm>>,
}

impl InMemoryDataset {
    pub fn new(rows: Vec<Vec<Elm>>) -> Self {
        Self { rows }
    }

    /// Column count of the first row, 0 when empty.
    pub fn num_features(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }
}

impl Dataset for InMemoryDataset {
    type Item = Vec<Elm>;

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn get(&self, index: usize) -> Self::Item {
        self.rows[index].clone()
    }
}
