use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::cast::ToElement;
use burn::tensor::{Element, Int, Tensor, TensorData};
use burn::LearningRate;

use ndarray::{Array1, Array2, ArrayView2};
use num_traits::{ToPrimitive, Zero};

pub(crate) fn update_parameters<B: AutodiffBackend, M: AutodiffModule<B>>(
    loss: Tensor<B, 1>,
    module: M,
    optimizer: &mut impl Optimizer<M, B>,
    learning_rate: LearningRate,
) -> M {
    let gradients = loss.backward();
    let gradient_params = GradientsParams::from_grads(gradients, &module);
    optimizer.step(learning_rate, module, gradient_params)
}

pub fn normalize<B: Backend>(tensor: Tensor<B, 1>) -> Tensor<B, 1> {
    let mean = tensor.clone().mean().into_scalar().to_f32();
    let std = tensor.clone().var(0).sqrt().into_scalar().to_f32();
    tensor.sub_scalar(mean).div_scalar(std + 1e-8)
}

/// Averages over the minibatches of one update, plus rollout-wide stats.
#[derive(Debug, Default, Clone)]
pub struct UpdateInfo {
    pub policy_gradient_loss: f32,
    pub value_loss: f32,
    pub entropy_loss: f32,
    pub approx_kl: f32,
    pub clip_fraction: f32,
    pub explained_variance: f32,
    pub n_updates: usize,
}

impl UpdateInfo {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) struct GAEOutput {
    pub advantages: Array2<f32>,
    pub returns: Array2<f32>,
}

/// Generalized advantage estimation over a (n_steps, n_envs) rollout.
///
/// `episode_starts[t]` marks that the observation at `t` is the first of a new
/// episode, so nothing is bootstrapped across it. `last_values` and `dones`
/// describe the state reached after the final stored step.
pub(crate) fn get_gae(
    values: ArrayView2<f32>,
    rewards: ArrayView2<f32>,
    episode_starts: ArrayView2<bool>,
    last_values: &[f32],
    dones: &[bool],
    gamma: f32,
    gae_lambda: f32,
) -> GAEOutput {
    let (n_steps, n_envs) = values.dim();
    let mut advantages = Array2::<f32>::zeros((n_steps, n_envs));
    for env in 0..n_envs {
        let mut last_gae_lam = 0f32;
        for step in (0..n_steps).rev() {
            let (next_non_terminal, next_value) = if step == n_steps - 1 {
                (1.0 - dones[env] as i8 as f32, last_values[env])
            } else {
                (
                    1.0 - episode_starts[[step + 1, env]] as i8 as f32,
                    values[[step + 1, env]],
                )
            };
            let delta = rewards[[step, env]] + gamma * next_value * next_non_terminal
                - values[[step, env]];
            last_gae_lam = delta + gamma * gae_lambda * next_non_terminal * last_gae_lam;
            advantages[[step, env]] = last_gae_lam;
        }
    }
    let returns = &advantages + &values;
    GAEOutput {
        advantages,
        returns,
    }
}

/// `1 - Var[y_true - y_pred] / Var[y_true]`, NaN when `y_true` is constant.
pub fn explained_variance(y_pred: &[f32], y_true: &[f32]) -> f32 {
    let y_true = Array1::from_vec(y_true.to_vec());
    let y_pred = Array1::from_vec(y_pred.to_vec());
    let var_y = y_true.var(0.0);
    if var_y == 0.0 {
        return f32::NAN;
    }
    1.0 - (&y_true - &y_pred).var(0.0) / var_y
}

pub fn one_hot_obs<B: Backend>(obs: &[usize], obs_dim: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut vec = vec![0f32; obs.len() * obs_dim];
    for (i, &o) in obs.iter().enumerate() {
        vec[i * obs_dim + o] = 1.0;
    }
    let tensor_data = TensorData::new(vec, [obs.len(), obs_dim]);
    Tensor::<B, 2>::from_data(tensor_data, device)
}

pub fn vec2tensor1<B: Backend, T: Element + Zero + ToPrimitive>(
    vec: Vec<T>,
    device: &B::Device,
) -> Tensor<B, 1> {
    let shape = [vec.len()];
    let tensor_data = TensorData::new(vec, shape);
    Tensor::<B, 1>::from_data(tensor_data, device)
}

pub fn usize2int_tensor1<B: Backend>(vec: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let vec = vec.iter().map(|x| *x as i64).collect::<Vec<i64>>();
    let shape = [vec.len()];
    Tensor::<B, 1, Int>::from_data(TensorData::new(vec, shape), device)
}

pub fn tensor2vec1<B: Backend>(tensor: Tensor<B, 1>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}

pub fn int_tensor2vec1<B: Backend>(tensor: Tensor<B, 1, Int>) -> Vec<usize> {
    tensor
        .into_data()
        .iter::<i64>()
        .map(|x| x as usize)
        .collect()
}
