use crate::burn_utils::distribution::Categorical;
use crate::burn_utils::{build_mlp_by_dims, Sequence};
use crate::rl_algorithm::base::model::ActorModel;
use burn::prelude::*;

/// Feed-forward policy over a discrete action space: one-hot observation in,
/// one logit per action out.
#[derive(Module, Debug)]
pub struct CategoricalMLPPolicy<B: Backend> {
    logits_net: Sequence<B>,
    action_dim: usize,
    observation_dim: usize,
}

impl<B: Backend> CategoricalMLPPolicy<B> {
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn observation_dim(&self) -> usize {
        self.observation_dim
    }
}

impl<B: Backend> ActorModel<B> for CategoricalMLPPolicy<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Categorical<B> {
        let logits = self.logits_net.forward(obs); // (B, action_dim)
        Categorical::from_logits(logits)
    }
}

#[derive(Config, Debug)]
pub struct CategoricalMLPPolicyConfig {
    action_dim: usize,
    observation_dim: usize,
    #[config(default = "vec![64, 64]")]
    layer_dims: Vec<usize>,
}

impl CategoricalMLPPolicyConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CategoricalMLPPolicy<B> {
        let logits_net = build_mlp_by_dims(
            self.observation_dim,
            self.action_dim,
            &self.layer_dims,
            device,
        );
        CategoricalMLPPolicy {
            logits_net,
            action_dim: self.action_dim,
            observation_dim: self.observation_dim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_algorithm::base::rl_utils::one_hot_obs;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_forward_shapes() {
        let device = NdArrayDevice::Cpu;
        let policy = CategoricalMLPPolicyConfig::new(6, 500)
            .with_layer_dims(vec![16])
            .init::<NdArray>(&device);
        let dist = policy.forward(one_hot_obs(&[0, 17, 499], 500, &device));
        assert_eq!(dist.probs().dims(), [3, 6]);
        assert_eq!(dist.mode().dims(), [3]);
        assert_eq!(policy.action_dim(), 6);
    }
}
