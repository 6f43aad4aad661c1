use crate::error::{Result, TaxiPpoError};
use crate::rl_algorithm::base::memory::{Memory, MiniBatch};
use crate::rl_algorithm::base::model::{ActorModel, BaselineModel, RlTrainAlgorithm};
use crate::rl_algorithm::base::rl_utils::{self, UpdateInfo};

use super::config::PPOTrainingConfig;
use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::Optimizer;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::cast::ToElement;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::marker::PhantomData;

/// Per-minibatch scalars, read back after both networks stepped.
struct MiniBatchStats {
    policy_gradient_loss: f32,
    entropy_loss: f32,
    approx_kl: f32,
    clip_fraction: f32,
}

pub struct PPO<B: AutodiffBackend, AM: ActorModel<B>, BM: BaselineModel<B>> {
    config: PPOTrainingConfig,
    // shuffles minibatch indices
    rng: StdRng,
    n_updates: usize,
    backend: PhantomData<B>,
    actor: PhantomData<AM>,
    baseline_net: PhantomData<BM>,
}

impl<
        B: AutodiffBackend,
        AM: ActorModel<B> + AutodiffModule<B>,
        BM: BaselineModel<B> + AutodiffModule<B>,
    > PPO<B, AM, BM>
{
    pub fn new(config: PPOTrainingConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            rng,
            n_updates: 0,
            backend: PhantomData,
            actor: PhantomData,
            baseline_net: PhantomData,
        }
    }

    fn update_actor(
        &self,
        actor_net: AM,
        batch: &MiniBatch<B>,
        actor_optimizer: &mut (impl Optimizer<AM, B> + Sized),
    ) -> (AM, MiniBatchStats) {
        let ppo_config = &self.config;
        let dist = actor_net.forward(batch.obs.clone());
        let log_prob = dist.log_prob(batch.action.clone());
        let entropy = dist.entropy();

        let mut advantages = batch.advantage.clone();
        // a single sample has no spread to normalize by
        if ppo_config.normalize_advantage && advantages.dims()[0] > 1 {
            advantages = rl_utils::normalize(advantages);
        }

        let log_ratio = log_prob - batch.old_log_prob.clone();
        let ratio = log_ratio.clone().exp();
        trace!("ratio={}", ratio);
        let clipped_ratio = ratio
            .clone()
            .clamp(1.0 - ppo_config.epsilon_clip, 1.0 + ppo_config.epsilon_clip);

        let now_advantage = ratio.clone() * advantages.clone();
        let clip_advantage = clipped_ratio * advantages;
        let policy_loss = -now_advantage.min_pair(clip_advantage).mean();
        let entropy_loss = -entropy.mean();
        let actor_loss =
            policy_loss.clone() + entropy_loss.clone().mul_scalar(ppo_config.entropy_coef);

        let ratio = ratio.detach();
        let log_ratio = log_ratio.detach();
        let stats = MiniBatchStats {
            policy_gradient_loss: policy_loss.clone().into_scalar().to_f32(),
            entropy_loss: entropy_loss.into_scalar().to_f32(),
            approx_kl: (ratio.clone().sub_scalar(1.0) - log_ratio)
                .mean()
                .into_scalar()
                .to_f32(),
            clip_fraction: ratio
                .sub_scalar(1.0)
                .abs()
                .greater_elem(ppo_config.epsilon_clip)
                .float()
                .mean()
                .into_scalar()
                .to_f32(),
        };

        let actor_net = rl_utils::update_parameters(
            actor_loss,
            actor_net,
            actor_optimizer,
            ppo_config.learning_rate,
        );
        (actor_net, stats)
    }

    fn update_baseline(
        &self,
        baseline_net: BM,
        batch: &MiniBatch<B>,
        baseline_optimizer: &mut (impl Optimizer<BM, B> + Sized),
    ) -> (BM, f32) {
        let ppo_config = &self.config;
        let pred = baseline_net.forward(batch.obs.clone());
        let value_loss = MseLoss::new().forward(pred, batch.returns.clone(), Reduction::Mean);
        let value_loss_scalar = value_loss.clone().into_scalar().to_f32();
        let baseline_net = rl_utils::update_parameters(
            value_loss.mul_scalar(ppo_config.value_coef),
            baseline_net,
            baseline_optimizer,
            ppo_config.learning_rate,
        );
        (baseline_net, value_loss_scalar)
    }
}

impl<
        B: AutodiffBackend,
        AM: ActorModel<B> + AutodiffModule<B>,
        BM: BaselineModel<B> + AutodiffModule<B>,
    > RlTrainAlgorithm<B, AM, BM> for PPO<B, AM, BM>
{
    fn train(
        &mut self,
        mut actor_net: AM,
        mut baseline_net: BM,
        memory: &Memory,
        actor_optimizer: &mut (impl Optimizer<AM, B> + Sized),
        baseline_optimizer: &mut (impl Optimizer<BM, B> + Sized),
        device: &B::Device,
    ) -> Result<(AM, BM, UpdateInfo)> {
        if memory.is_empty() {
            return Err(TaxiPpoError::EmptyRollout);
        }
        let tensors = memory.to_tensors::<B>(device);
        let mini_batch_size = self.config.mini_batch_size.min(memory.len());

        let mut update_info = UpdateInfo::new();
        let mut num_batches = 0usize;
        for epoch in 0..self.config.update_epochs {
            let mut epoch_kl = 0f32;
            let mini_batch_iter = memory.mini_batch_iter(&tensors, mini_batch_size, &mut self.rng);
            let epoch_batches = mini_batch_iter.len();
            for batch in mini_batch_iter {
                let (new_actor, stats) = self.update_actor(actor_net, &batch, actor_optimizer);
                actor_net = new_actor;
                let (new_baseline, value_loss) =
                    self.update_baseline(baseline_net, &batch, baseline_optimizer);
                baseline_net = new_baseline;

                update_info.policy_gradient_loss += stats.policy_gradient_loss;
                update_info.value_loss += value_loss;
                update_info.entropy_loss += stats.entropy_loss;
                update_info.approx_kl += stats.approx_kl;
                update_info.clip_fraction += stats.clip_fraction;
                epoch_kl += stats.approx_kl;
                num_batches += 1;
            }
            debug!(
                "epoch={} mean approx_kl={}",
                epoch,
                epoch_kl / epoch_batches.max(1) as f32
            );
        }
        self.n_updates += self.config.update_epochs;

        let denom = num_batches.max(1) as f32;
        update_info.policy_gradient_loss /= denom;
        update_info.value_loss /= denom;
        update_info.entropy_loss /= denom;
        update_info.approx_kl /= denom;
        update_info.clip_fraction /= denom;
        update_info.explained_variance =
            rl_utils::explained_variance(&memory.values(), &memory.returns());
        update_info.n_updates = self.n_updates;
        Ok((actor_net, baseline_net, update_info))
    }
}
