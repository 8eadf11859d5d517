use crate::backend::{Backend, Elm};
use crate::error::{Error, Result};

/// Stacks feature rows into a `[Batch, Features]` tensor.
///
/// Every row must have the same length and the batch must not be empty.
pub fn collate_rows<B: Backend>(batch: Vec<Vec<Elm>>) -> Result<B::Tensor> {
    let rows = batch.len();
    let cols = batch
        .first()
        .map(|r| r.len())
        .ok_or_else(|| Error::InvalidShape("cannot collate an empty batch".into()))?;

    if let Some((i, row)) = batch.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(Error::InvalidShape(format!(
            "row {} has {} features, expected {}",
            i,
            row.len(),
            cols
        )));
    }

    let flat: Vec<Elm> = batch.into_iter().flatten().collect();
    B::from_vec(flat, &[rows, cols])
}
