use std::path::Path;

use burn::prelude::*;
use burn::record::DefaultFileRecorder;
use burn::tensor::cast::ToElement;

use super::categorical_mlp_policy::{CategoricalMLPPolicy, CategoricalMLPPolicyConfig};
use super::mlp_critic::{MLPCritic, MLPCriticConfig};
use crate::error::{self, TaxiPpoError};
use crate::rl_algorithm::base::model::{ActorModel, BaselineModel};
use crate::rl_algorithm::base::rl_utils::{int_tensor2vec1, one_hot_obs, tensor2vec1};

/// The trained artifact: policy and value network saved and loaded together.
#[derive(Module, Debug)]
pub struct MlpActorCritic<B: Backend> {
    actor: CategoricalMLPPolicy<B>,
    critic: MLPCritic<B>,
}

impl<B: Backend> MlpActorCritic<B> {
    pub fn new(actor: CategoricalMLPPolicy<B>, critic: MLPCritic<B>) -> Self {
        Self { actor, critic }
    }

    /// Actions for a batch of observations. `deterministic` picks the
    /// highest ranked action instead of sampling.
    pub fn predict(&self, obs: &[usize], deterministic: bool) -> Vec<usize> {
        let device = &self.devices()[0];
        let input = one_hot_obs(obs, self.actor.observation_dim(), device);
        let dist = self.actor.forward(input);
        let action = if deterministic {
            dist.mode()
        } else {
            dist.sample()
        };
        int_tensor2vec1(action)
    }

    /// Greedy action for one observation, unwrapped to a plain index.
    pub fn predict_one(&self, obs: usize) -> usize {
        let device = &self.devices()[0];
        let input = one_hot_obs(&[obs], self.actor.observation_dim(), device);
        self.actor.forward(input).mode().into_scalar().to_usize()
    }

    pub fn predict_values(&self, obs: &[usize]) -> Vec<f32> {
        let device = &self.devices()[0];
        let input = one_hot_obs(obs, self.actor.observation_dim(), device);
        tensor2vec1(self.critic.forward(input))
    }

    /// Saves under `path`; the recorder appends its own extension.
    pub fn save_policy(&self, path: &Path) -> error::Result<()> {
        let recorder = DefaultFileRecorder::<crate::MyPrecisionSettings>::new();
        self.clone()
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|err| TaxiPpoError::Recorder(format!("{:?}", err)))
    }
}

#[derive(Config, Debug)]
pub struct MlpActorCriticConfig {
    obs_dim: usize,
    action_dim: usize,
    #[config(default = "vec![64, 64]")]
    layer_dims: Vec<usize>,
}

impl MlpActorCriticConfig {
    pub fn init_actor<B: Backend>(&self, device: &B::Device) -> CategoricalMLPPolicy<B> {
        CategoricalMLPPolicyConfig::new(self.action_dim, self.obs_dim)
            .with_layer_dims(self.layer_dims.clone())
            .init(device)
    }

    pub fn init_critic<B: Backend>(&self, device: &B::Device) -> MLPCritic<B> {
        MLPCriticConfig::new(self.obs_dim)
            .with_layer_dims(self.layer_dims.clone())
            .init(device)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpActorCritic<B> {
        MlpActorCritic::new(self.init_actor(device), self.init_critic(device))
    }

    /// Rebuilds the architecture and loads weights written by
    /// [`MlpActorCritic::save_policy`].
    pub fn load_policy<B: Backend>(
        &self,
        path: &Path,
        device: &B::Device,
    ) -> error::Result<MlpActorCritic<B>> {
        let recorder = DefaultFileRecorder::<crate::MyPrecisionSettings>::new();
        self.init::<B>(device)
            .load_file(path.to_path_buf(), &recorder, device)
            .map_err(|err| TaxiPpoError::Recorder(format!("{:?}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_greedy_predict_is_deterministic() {
        let device = NdArrayDevice::Cpu;
        let policy = MlpActorCriticConfig::new(500, 6)
            .with_layer_dims(vec![8])
            .init::<NdArray>(&device);
        let obs = vec![3, 42, 321];
        let first = policy.predict(&obs, true);
        assert_eq!(first, policy.predict(&obs, true));
        assert!(first.iter().all(|action| *action < 6));
        assert_eq!(policy.predict_one(42), first[1]);
        assert_eq!(policy.predict_values(&obs).len(), 3);
    }

    #[test]
    fn test_save_and_load_keep_greedy_actions() {
        let device = NdArrayDevice::Cpu;
        let config = MlpActorCriticConfig::new(500, 6).with_layer_dims(vec![8]);
        let policy = config.init::<NdArray>(&device);
        let obs: Vec<usize> = (0..500).step_by(7).collect();
        let actions = policy.predict(&obs, true);

        let path = std::env::temp_dir().join(format!("taxi_ppo_policy_{}", std::process::id()));
        policy.save_policy(&path).unwrap();
        let loaded = config.load_policy::<NdArray>(&path, &device).unwrap();
        assert_eq!(loaded.predict(&obs, true), actions);
        let _ = std::fs::remove_file(path.with_extension("mpk"));
    }
}
