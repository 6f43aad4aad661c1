use super::env::{GymEnv, Info};
use crate::error::EnvError;

/// Builds one fresh environment. Plain `fn` so a factory list carries no state.
pub type EnvFactory<E> = fn() -> E;

#[derive(Debug, Clone, Default)]
pub struct VecInfo {
    pub info: Info,
    /// Last observation of the finished episode; `obs` already holds the reset one.
    pub terminal_observation: Option<usize>,
    /// Episode hit the step limit without reaching a terminal state.
    pub time_limit_truncated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VecStep {
    pub obs: Vec<usize>,
    pub rewards: Vec<f64>,
    pub dones: Vec<bool>,
    pub infos: Vec<VecInfo>,
}

/// Steps every copy sequentially on the calling thread and resets the ones
/// that finish.
pub struct DummyVecEnv<E: GymEnv> {
    envs: Vec<E>,
}

impl<E: GymEnv> DummyVecEnv<E> {
    pub fn new(env_fns: &[EnvFactory<E>]) -> Self {
        Self {
            envs: env_fns.iter().map(|make_env| make_env()).collect(),
        }
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    pub fn get_obs_dim(&self) -> usize {
        self.envs[0].get_obs_dim()
    }

    pub fn get_action_dim(&self) -> usize {
        self.envs[0].get_action_dim()
    }

    pub fn reset(&mut self, seed: Option<u64>) -> Vec<usize> {
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| env.reset(seed.map(|seed| seed + i as u64)).0)
            .collect()
    }

    pub fn step(&mut self, actions: &[usize]) -> Result<VecStep, EnvError> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::ActionCount {
                expected: self.envs.len(),
                got: actions.len(),
            });
        }
        let mut vec_step = VecStep::default();
        for (env, &action) in self.envs.iter_mut().zip(actions) {
            let step_info = env.step(action)?;
            let done = step_info.done();
            let mut vec_info = VecInfo {
                time_limit_truncated: step_info.truncated && !step_info.terminated,
                info: step_info.info,
                terminal_observation: None,
            };
            let mut obs = step_info.obs;
            if done {
                vec_info.terminal_observation = Some(obs);
                obs = env.reset(None).0;
            }
            vec_step.obs.push(obs);
            vec_step.rewards.push(step_info.reward);
            vec_step.dones.push(done);
            vec_step.infos.push(vec_info);
        }
        Ok(vec_step)
    }

    pub fn close(&mut self) {
        for env in self.envs.iter_mut() {
            env.close();
        }
    }
}
