use burn::config::Config;

use crate::error::{self, TaxiPpoError};
use crate::rl_algorithm::ppo::config::PPOTrainingConfig;

/// Everything one train-then-evaluate run needs. Built once, never mutated.
#[derive(Config, Debug)]
pub struct RunConfig {
    pub learning_rate: f64,
    /// Label printed in the run banner.
    pub run_name: String,
    #[config(default = 0.99)]
    pub gamma: f32,
    #[config(default = 0.95)]
    pub gae_lambda: f32,
    /// Environment steps per env collected before every update.
    #[config(default = 2048)]
    pub n_steps: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 0.01)]
    pub ent_coef: f32,
    #[config(default = 500000)]
    pub total_timesteps: usize,
    #[config(default = 10)]
    pub n_epochs: usize,
    #[config(default = 0.2)]
    pub clip_range: f32,
    #[config(default = 0.5)]
    pub vf_coef: f32,
    #[config(default = 0.5)]
    pub max_grad_norm: f32,
    #[config(default = true)]
    pub normalize_advantage: bool,
    #[config(default = 1e-5)]
    pub adam_eps: f32,
    /// Hidden layer widths of both the policy and the value network.
    #[config(default = "vec![64, 64]")]
    pub net_arch: Vec<usize>,
    #[config(default = 1)]
    pub n_envs: usize,
    #[config(default = 10)]
    pub n_eval_episodes: usize,
    /// Iterations between two training log dumps.
    #[config(default = 1)]
    pub log_interval: usize,
    /// Directory the model is saved into.
    #[config(default = "String::from(\".\")")]
    pub output_dir: String,
    pub seed: Option<u64>,
    pub tensorboard_log: Option<String>,
}

impl RunConfig {
    pub fn ppo_train_config(&self) -> PPOTrainingConfig {
        PPOTrainingConfig::new(self.learning_rate)
            .with_gae_gamma(self.gamma)
            .with_gae_lambda(self.gae_lambda)
            .with_epsilon_clip(self.clip_range)
            .with_entropy_coef(self.ent_coef)
            .with_value_coef(self.vf_coef)
            .with_update_epochs(self.n_epochs)
            .with_mini_batch_size(self.batch_size)
            .with_max_grad_norm(self.max_grad_norm)
            .with_adam_epsilon(self.adam_eps)
            .with_normalize_advantage(self.normalize_advantage)
    }

    pub fn validate(&self) -> error::Result<()> {
        if !(self.learning_rate > 0.0) {
            return Err(TaxiPpoError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.n_steps == 0 || self.n_envs == 0 {
            return Err(TaxiPpoError::InvalidConfig(
                "n_steps and n_envs must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TaxiPpoError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
