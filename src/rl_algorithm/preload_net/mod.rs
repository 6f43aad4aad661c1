pub mod actor_critic;
pub mod categorical_mlp_policy;
pub mod mlp_critic;
