use burn::prelude::Backend;
use burn::tensor::{Int, Tensor};
use ndarray::{s, Array2, ArrayView1};
use rand::Rng;

use crate::burn_utils::randperm_chunks;

use super::rl_utils::{self, one_hot_obs, usize2int_tensor1, vec2tensor1};

/// On-policy rollout storage, every array is (n_steps, n_envs).
pub struct Memory {
    obs: Array2<usize>,
    action: Array2<usize>,
    reward: Array2<f32>,
    episode_start: Array2<bool>,
    value: Array2<f32>,
    log_prob: Array2<f32>,
    advantage: Array2<f32>,
    returns: Array2<f32>,
    n_steps: usize,
    n_envs: usize,
    obs_dim: usize,
    pos: usize,
}

/// Flattened rollout on the training device, row `t * n_envs + env`.
pub struct RolloutTensors<B: Backend> {
    pub obs: Tensor<B, 2>,          // (N, obs_dim) one-hot
    pub action: Tensor<B, 1, Int>,  // (N,)
    pub old_value: Tensor<B, 1>,    // (N,)
    pub old_log_prob: Tensor<B, 1>, // (N,)
    pub advantage: Tensor<B, 1>,    // (N,)
    pub returns: Tensor<B, 1>,      // (N,)
}

pub type MiniBatch<B> = RolloutTensors<B>;

impl Memory {
    pub fn new(n_steps: usize, n_envs: usize, obs_dim: usize) -> Self {
        Self {
            obs: Array2::zeros((n_steps, n_envs)),
            action: Array2::zeros((n_steps, n_envs)),
            reward: Array2::zeros((n_steps, n_envs)),
            episode_start: Array2::from_elem((n_steps, n_envs), false),
            value: Array2::zeros((n_steps, n_envs)),
            log_prob: Array2::zeros((n_steps, n_envs)),
            advantage: Array2::zeros((n_steps, n_envs)),
            returns: Array2::zeros((n_steps, n_envs)),
            n_steps,
            n_envs,
            obs_dim,
            pos: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn add(
        &mut self,
        obs: &[usize],
        action: &[usize],
        reward: &[f32],
        episode_start: &[bool],
        value: &[f32],
        log_prob: &[f32],
    ) {
        assert!(self.pos < self.n_steps, "rollout memory is full");
        let row = self.pos;
        self.obs.row_mut(row).assign(&ArrayView1::from(obs));
        self.action.row_mut(row).assign(&ArrayView1::from(action));
        self.reward.row_mut(row).assign(&ArrayView1::from(reward));
        self.episode_start
            .row_mut(row)
            .assign(&ArrayView1::from(episode_start));
        self.value.row_mut(row).assign(&ArrayView1::from(value));
        self.log_prob.row_mut(row).assign(&ArrayView1::from(log_prob));
        self.pos += 1;
    }

    pub fn is_full(&self) -> bool {
        self.pos == self.n_steps
    }

    pub fn len(&self) -> usize {
        self.pos * self.n_envs
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    pub fn compute_returns_and_advantage(
        &mut self,
        last_values: &[f32],
        dones: &[bool],
        gamma: f32,
        gae_lambda: f32,
    ) {
        let gae_output = rl_utils::get_gae(
            self.value.slice(s![..self.pos, ..]),
            self.reward.slice(s![..self.pos, ..]),
            self.episode_start.slice(s![..self.pos, ..]),
            last_values,
            dones,
            gamma,
            gae_lambda,
        );
        self.advantage
            .slice_mut(s![..self.pos, ..])
            .assign(&gae_output.advantages);
        self.returns
            .slice_mut(s![..self.pos, ..])
            .assign(&gae_output.returns);
    }

    pub fn values(&self) -> Vec<f32> {
        self.value.slice(s![..self.pos, ..]).iter().copied().collect()
    }

    pub fn returns(&self) -> Vec<f32> {
        self.returns.slice(s![..self.pos, ..]).iter().copied().collect()
    }

    pub fn advantages(&self) -> Vec<f32> {
        self.advantage.slice(s![..self.pos, ..]).iter().copied().collect()
    }

    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> RolloutTensors<B> {
        let obs: Vec<usize> = self.obs.slice(s![..self.pos, ..]).iter().copied().collect();
        let action: Vec<usize> = self
            .action
            .slice(s![..self.pos, ..])
            .iter()
            .copied()
            .collect();
        let log_prob: Vec<f32> = self
            .log_prob
            .slice(s![..self.pos, ..])
            .iter()
            .copied()
            .collect();
        RolloutTensors {
            obs: one_hot_obs(&obs, self.obs_dim, device),
            action: usize2int_tensor1(&action, device),
            old_value: vec2tensor1(self.values(), device),
            old_log_prob: vec2tensor1(log_prob, device),
            advantage: vec2tensor1(self.advantages(), device),
            returns: vec2tensor1(self.returns(), device),
        }
    }

    /// One pass over the rollout in random order.
    pub fn mini_batch_iter<'a, B: Backend, R: Rng + ?Sized>(
        &self,
        tensors: &'a RolloutTensors<B>,
        mini_batch_size: usize,
        rng: &mut R,
    ) -> MiniBatchIter<'a, B> {
        let device = tensors.obs.device();
        MiniBatchIter {
            tensors,
            random_indices_tensor: randperm_chunks::<B, R>(
                self.len(),
                mini_batch_size,
                rng,
                &device,
            ),
            current_step: 0,
        }
    }
}

pub struct MiniBatchIter<'a, B: Backend> {
    tensors: &'a RolloutTensors<B>,
    random_indices_tensor: Vec<Tensor<B, 1, Int>>,
    current_step: usize,
}

impl<'a, B: Backend> Iterator for MiniBatchIter<'a, B> {
    type Item = MiniBatch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.random_indices_tensor.get(self.current_step)?.clone();
        self.current_step += 1;
        let tensors = self.tensors;
        Some(MiniBatch {
            obs: tensors.obs.clone().select(0, indices.clone()),
            action: tensors.action.clone().select(0, indices.clone()),
            old_value: tensors.old_value.clone().select(0, indices.clone()),
            old_log_prob: tensors.old_log_prob.clone().select(0, indices.clone()),
            advantage: tensors.advantage.clone().select(0, indices.clone()),
            returns: tensors.returns.clone().select(0, indices),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.random_indices_tensor.len() - self.current_step;
        (remaining, Some(remaining))
    }
}

impl<'a, B: Backend> ExactSizeIterator for MiniBatchIter<'a, B> {}
