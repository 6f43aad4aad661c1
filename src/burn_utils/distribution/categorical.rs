use burn::prelude::*;
use burn::tensor::activation::log_softmax;
use burn::tensor::Distribution as td;

#[derive(Debug, Clone)]
pub struct Categorical<B: Backend> {
    log_probs: Tensor<B, 2>, // (B, num_categories), normalized
}

impl<B: Backend> Categorical<B> {
    pub fn from_logits(logits: Tensor<B, 2>) -> Self {
        Self {
            log_probs: log_softmax(logits, 1),
        }
    }

    pub fn probs(&self) -> Tensor<B, 2> {
        self.log_probs.clone().exp()
    }

    // gumbel-max trick
    pub fn sample(&self) -> Tensor<B, 1, Int> {
        let uniform = Tensor::<B, 2>::random(
            self.log_probs.shape(),
            td::Uniform(1e-10, 1.0),
            &self.log_probs.device(),
        );
        let gumbel = uniform.log().neg().log().neg();
        (self.log_probs.clone() + gumbel).argmax(1).squeeze(1)
    }

    /// Most likely category, what a greedy policy acts on.
    pub fn mode(&self) -> Tensor<B, 1, Int> {
        self.log_probs.clone().argmax(1).squeeze(1)
    }

    // value: (B,)
    pub fn log_prob(&self, value: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        self.log_probs
            .clone()
            .gather(1, value.unsqueeze_dim(1))
            .squeeze(1)
    }

    pub fn entropy(&self) -> Tensor<B, 1> {
        (self.probs() * self.log_probs.clone())
            .sum_dim(1)
            .squeeze::<1>(1)
            .neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::tensor::cast::ToElement;

    fn categorical(logits: [[f32; 2]; 2]) -> Categorical<NdArray> {
        Categorical::from_logits(Tensor::from_floats(logits, &NdArrayDevice::Cpu))
    }

    #[test]
    fn test_log_prob_and_entropy() {
        // probs [0.25, 0.75] and [0.5, 0.5]
        let dist = categorical([[0.0, 3f32.ln()], [1.0, 1.0]]);
        let actions = Tensor::<NdArray, 1, Int>::from_ints([1, 0], &NdArrayDevice::Cpu);
        let log_prob: Vec<f32> = dist.log_prob(actions).into_data().iter::<f32>().collect();
        assert!((log_prob[0] - 0.75f32.ln()).abs() < 1e-5);
        assert!((log_prob[1] - 0.5f32.ln()).abs() < 1e-5);

        let entropy: Vec<f32> = dist.entropy().into_data().iter::<f32>().collect();
        let expected = -(0.25 * 0.25f32.ln() + 0.75 * 0.75f32.ln());
        assert!((entropy[0] - expected).abs() < 1e-5);
        assert!((entropy[1] - 2f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_mode_and_sample() {
        let dist = categorical([[0.0, 2.0], [-1000.0, -1.0]]);
        let mode: Vec<i64> = dist.mode().into_data().iter::<i64>().collect();
        assert_eq!(mode, vec![1, 1]);

        let dist = categorical([[0.0, -1000.0], [-1000.0, 0.0]]);
        for _ in 0..10 {
            let sample = dist.sample();
            assert_eq!(sample.dims(), [2]);
            let sample: Vec<i64> = sample.into_data().iter::<i64>().collect();
            assert_eq!(sample, vec![0, 1]);
        }
        assert!(dist.probs().sum().into_scalar().to_f32() > 1.99);
    }
}
