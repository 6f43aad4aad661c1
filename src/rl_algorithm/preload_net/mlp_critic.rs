use crate::burn_utils::{build_mlp_by_dims, Sequence};
use crate::rl_algorithm::base::model::BaselineModel;
use burn::prelude::*;

#[derive(Module, Debug)]
pub struct MLPCritic<B: Backend> {
    net: Sequence<B>,
}

impl<B: Backend> BaselineModel<B> for MLPCritic<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 1> {
        self.net.forward(obs).flatten(0, 1)
    }
}

#[derive(Config, Debug)]
pub struct MLPCriticConfig {
    observation_dim: usize,
    #[config(default = "vec![64, 64]")]
    layer_dims: Vec<usize>,
}

impl MLPCriticConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLPCritic<B> {
        let net = build_mlp_by_dims(self.observation_dim, 1, &self.layer_dims, device);
        MLPCritic { net }
    }
}
