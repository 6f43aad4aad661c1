use burn::module::{AutodiffModule, Module};
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::burn_utils::distribution::Categorical;
use crate::error::Result;

use super::memory::Memory;
use super::rl_utils::UpdateInfo;

// for predicting the action distribution from one-hot observations
pub trait ActorModel<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Categorical<B>;
}

// for predicting values of states
pub trait BaselineModel<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 1>;
}

pub trait RlTrainAlgorithm<
    B: AutodiffBackend,
    AM: ActorModel<B> + AutodiffModule<B>,
    BM: BaselineModel<B> + AutodiffModule<B>,
>
{
    fn train(
        &mut self,
        actor_net: AM,
        baseline_net: BM,
        memory: &Memory,
        actor_optimizer: &mut (impl Optimizer<AM, B> + Sized),
        baseline_optimizer: &mut (impl Optimizer<BM, B> + Sized),
        device: &B::Device,
    ) -> Result<(AM, BM, UpdateInfo)>;
}
