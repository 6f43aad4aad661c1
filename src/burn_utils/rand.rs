use burn::prelude::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use rand::seq::SliceRandom;
use rand::Rng;

/// Random permutation of `0..n`, split into index tensors of at most
/// `chunk_size` elements (the last chunk keeps the remainder).
pub fn randperm_chunks<B: Backend, R: Rng + ?Sized>(
    n: usize,
    chunk_size: usize,
    rng: &mut R,
    device: &B::Device,
) -> Vec<Tensor<B, 1, Int>> {
    let mut indices: Vec<i64> = (0..n as i64).collect();
    indices.shuffle(rng);

    indices
        .chunks(chunk_size.max(1))
        .map(|chunk| {
            let tensor_data = TensorData::new(chunk.to_vec(), [chunk.len()]);
            Tensor::<B, 1, Int>::from_data(tensor_data, device)
        })
        .collect()
}
