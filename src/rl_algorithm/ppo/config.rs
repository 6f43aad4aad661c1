use burn::config::Config;

#[derive(Config, Debug)]
pub struct PPOTrainingConfig {
    pub learning_rate: f64,
    #[config(default = 0.99)]
    pub gae_gamma: f32,
    #[config(default = 0.95)]
    pub gae_lambda: f32,
    #[config(default = 0.2)]
    pub epsilon_clip: f32,
    #[config(default = 0.0)]
    pub entropy_coef: f32,
    #[config(default = 0.5)]
    pub value_coef: f32,
    #[config(default = 10)]
    pub update_epochs: usize,
    #[config(default = 64)]
    pub mini_batch_size: usize,
    #[config(default = 0.5)]
    pub max_grad_norm: f32,
    #[config(default = 1e-5)]
    pub adam_epsilon: f32,
    #[config(default = true)]
    pub normalize_advantage: bool,
}
