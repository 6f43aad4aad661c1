use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use burn::tensor::backend::AutodiffBackend;
use chrono::Local;
use log::{debug, info};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::time::Instant;

use crate::error::Result;
use crate::rl_env::env::{EpisodeStats, GymEnv};
use crate::rl_env::vec_env::DummyVecEnv;

use super::memory::Memory;
use super::rl_utils::{int_tensor2vec1, one_hot_obs, tensor2vec1, UpdateInfo};
use super::{
    config::RunConfig,
    model::{ActorModel, BaselineModel, RlTrainAlgorithm},
    EpochLogger,
};

// episodes kept for the rolling rollout/ep_* means
const EP_INFO_BUFFER_LEN: usize = 100;

/// Alternates rollout collection on a vectorized env with algorithm updates
/// until the timestep budget is spent.
pub struct OnPolicyRunner<E: GymEnv, B: AutodiffBackend> {
    device: B::Device,
    backend: PhantomData<B>,
    env: DummyVecEnv<E>,
    config: RunConfig,
    logger: EpochLogger,
    exp_name: String,
    ep_info_buffer: VecDeque<EpisodeStats>,
    num_timesteps: usize,
    last_obs: Vec<usize>,
    last_episode_starts: Vec<bool>,
}

impl<E: GymEnv, B: AutodiffBackend> OnPolicyRunner<E, B> {
    pub fn new(
        device: B::Device,
        env: DummyVecEnv<E>,
        config: RunConfig,
        algo_name: &str,
        env_name: &str,
    ) -> Self {
        let exp_name = format!(
            "{}_{}_{}",
            algo_name,
            env_name,
            Local::now().format("%m-%d_%H-%M-%S")
        );
        let logger = EpochLogger::new(
            config
                .tensorboard_log
                .as_ref()
                .map(|logdir| format!("{}/{}", logdir, exp_name)),
        );
        if let Some(seed) = config.seed {
            B::seed(seed);
        }
        let n_envs = env.num_envs();
        Self {
            device,
            backend: PhantomData,
            env,
            config,
            logger,
            exp_name,
            ep_info_buffer: VecDeque::with_capacity(EP_INFO_BUFFER_LEN),
            num_timesteps: 0,
            last_obs: vec![0; n_envs],
            last_episode_starts: vec![true; n_envs],
        }
    }

    pub fn exp_name(&self) -> &str {
        &self.exp_name
    }

    pub fn num_timesteps(&self) -> usize {
        self.num_timesteps
    }

    /// Fills `memory` with `n_steps` transitions per env using the current
    /// policy, then computes advantages and returns.
    pub fn collect_rollouts<AM, BM>(
        &mut self,
        actor: &AM,
        critic: &BM,
        memory: &mut Memory,
    ) -> Result<()>
    where
        AM: ActorModel<B> + AutodiffModule<B>,
        BM: BaselineModel<B> + AutodiffModule<B>,
        AM::InnerModule: ActorModel<B::InnerBackend>,
        BM::InnerModule: BaselineModel<B::InnerBackend>,
    {
        let actor = actor.valid();
        let critic = critic.valid();
        let obs_dim = self.env.get_obs_dim();
        let gamma = self.config.gamma;
        memory.reset();

        while !memory.is_full() {
            let obs = one_hot_obs::<B::InnerBackend>(&self.last_obs, obs_dim, &self.device);
            let dist = actor.forward(obs.clone());
            let actions = dist.sample();
            let log_probs = tensor2vec1(dist.log_prob(actions.clone()));
            let values = tensor2vec1(critic.forward(obs));
            let actions = int_tensor2vec1(actions);

            let vec_step = self.env.step(&actions)?;
            self.num_timesteps += self.env.num_envs();

            let mut rewards: Vec<f32> = vec_step.rewards.iter().map(|r| *r as f32).collect();
            for (env_idx, vec_info) in vec_step.infos.iter().enumerate() {
                if let Some(stats) = vec_info.info.episode {
                    if self.ep_info_buffer.len() == EP_INFO_BUFFER_LEN {
                        self.ep_info_buffer.pop_front();
                    }
                    self.ep_info_buffer.push_back(stats);
                }
                // a time limit is not a real terminal state, bootstrap from it
                if vec_info.time_limit_truncated {
                    if let Some(terminal_obs) = vec_info.terminal_observation {
                        let terminal_value = critic
                            .forward(one_hot_obs(&[terminal_obs], obs_dim, &self.device));
                        rewards[env_idx] += gamma * tensor2vec1(terminal_value)[0];
                    }
                }
            }

            memory.add(
                &self.last_obs,
                &actions,
                &rewards,
                &self.last_episode_starts,
                &values,
                &log_probs,
            );
            self.last_obs = vec_step.obs;
            self.last_episode_starts = vec_step.dones;
        }

        let last_values = tensor2vec1(critic.forward(one_hot_obs::<B::InnerBackend>(
            &self.last_obs,
            obs_dim,
            &self.device,
        )));
        memory.compute_returns_and_advantage(
            &last_values,
            &self.last_episode_starts,
            gamma,
            self.config.gae_lambda,
        );
        Ok(())
    }

    /// Trains until at least `total_timesteps` env steps were collected.
    /// Rollouts are never cut short, so the final count may overshoot.
    pub fn learn<AM, BM, RlAlgo>(
        &mut self,
        mut actor_net: AM,
        mut baseline_net: BM,
        mut train_algo: RlAlgo,
        total_timesteps: usize,
    ) -> Result<(AM, BM)>
    where
        AM: ActorModel<B> + AutodiffModule<B>,
        BM: BaselineModel<B> + AutodiffModule<B>,
        AM::InnerModule: ActorModel<B::InnerBackend>,
        BM::InnerModule: BaselineModel<B::InnerBackend>,
        RlAlgo: RlTrainAlgorithm<B, AM, BM>,
    {
        self.config.validate()?;
        let grad_clip = Some(GradientClippingConfig::Norm(self.config.max_grad_norm));
        let mut actor_optimizer = AdamConfig::new()
            .with_epsilon(self.config.adam_eps)
            .with_grad_clipping(grad_clip.clone())
            .init::<B, AM>();
        let mut baseline_optimizer = AdamConfig::new()
            .with_epsilon(self.config.adam_eps)
            .with_grad_clipping(grad_clip)
            .init::<B, BM>();

        let n_envs = self.env.num_envs();
        let mut memory = Memory::new(self.config.n_steps, n_envs, self.env.get_obs_dim());
        self.num_timesteps = 0;
        self.ep_info_buffer.clear();
        self.last_obs = self.env.reset(self.config.seed);
        self.last_episode_starts = vec![true; n_envs];
        info!("{} starts, total_timesteps={}", self.exp_name, total_timesteps);

        let start = Instant::now();
        let mut iteration = 0;
        while self.num_timesteps < total_timesteps {
            let collect_start = Instant::now();
            self.collect_rollouts(&actor_net, &baseline_net, &mut memory)?;
            debug!("collect time={:?}", collect_start.elapsed());
            iteration += 1;

            let update_info: UpdateInfo;
            (actor_net, baseline_net, update_info) = train_algo.train(
                actor_net,
                baseline_net,
                &memory,
                &mut actor_optimizer,
                &mut baseline_optimizer,
                &self.device,
            )?;

            if self.config.log_interval > 0 && iteration % self.config.log_interval == 0 {
                self.dump_logs(iteration, start, &update_info);
            }
        }
        Ok((actor_net, baseline_net))
    }

    fn dump_logs(&mut self, iteration: usize, start: Instant, update_info: &UpdateInfo) {
        if !self.ep_info_buffer.is_empty() {
            let n = self.ep_info_buffer.len() as f64;
            let ep_rew_mean = self.ep_info_buffer.iter().map(|ep| ep.reward).sum::<f64>() / n;
            let ep_len_mean =
                self.ep_info_buffer.iter().map(|ep| ep.length as f64).sum::<f64>() / n;
            self.logger
                .add_scalar(("rollout", "ep_rew_mean"), ep_rew_mean as f32);
            self.logger
                .add_scalar(("rollout", "ep_len_mean"), ep_len_mean as f32);
        }
        let elapsed = start.elapsed().as_secs_f64().max(1e-9);
        self.logger
            .add_scalar(("time", "fps"), (self.num_timesteps as f64 / elapsed) as f32);
        self.logger.add_scalar(("time", "iterations"), iteration as f32);
        self.logger
            .add_scalar(("time", "time_elapsed"), elapsed as f32);
        self.logger
            .add_scalar(("time", "total_timesteps"), self.num_timesteps as f32);

        self.logger
            .add_scalar(("train", "learning_rate"), self.config.learning_rate as f32);
        self.logger.add_scalar(
            ("train", "policy_gradient_loss"),
            update_info.policy_gradient_loss,
        );
        self.logger
            .add_scalar(("train", "value_loss"), update_info.value_loss);
        self.logger
            .add_scalar(("train", "entropy_loss"), update_info.entropy_loss);
        self.logger
            .add_scalar(("train", "approx_kl"), update_info.approx_kl);
        self.logger
            .add_scalar(("train", "clip_fraction"), update_info.clip_fraction);
        self.logger.add_scalar(
            ("train", "explained_variance"),
            update_info.explained_variance,
        );
        self.logger
            .add_scalar(("train", "n_updates"), update_info.n_updates as f32);
        self.logger
            .add_scalar(("train", "clip_range"), self.config.clip_range);
        self.logger.log(iteration, self.num_timesteps);
    }

    pub fn close(&mut self) {
        self.env.close();
    }
}
