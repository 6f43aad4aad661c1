use std::time::Instant;

use super::env::{EpisodeStats, GymEnv, Info, StepInfo};
use crate::error::EnvError;

/// Truncates an episode once it reaches `max_episode_steps`.
pub struct TimeLimit<E: GymEnv> {
    env: E,
    max_episode_steps: usize,
    elapsed_steps: usize,
}

impl<E: GymEnv> TimeLimit<E> {
    pub fn new(env: E, max_episode_steps: usize) -> Self {
        Self {
            env,
            max_episode_steps,
            elapsed_steps: 0,
        }
    }

}

impl<E: GymEnv> GymEnv for TimeLimit<E> {
    fn reset(&mut self, seed: Option<u64>) -> (usize, Info) {
        self.elapsed_steps = 0;
        self.env.reset(seed)
    }

    fn step(&mut self, action: usize) -> Result<StepInfo, EnvError> {
        let mut step_info = self.env.step(action)?;
        self.elapsed_steps += 1;
        if self.elapsed_steps >= self.max_episode_steps {
            step_info.truncated = true;
        }
        Ok(step_info)
    }

    fn get_obs_dim(&self) -> usize {
        self.env.get_obs_dim()
    }

    fn get_action_dim(&self) -> usize {
        self.env.get_action_dim()
    }

    fn close(&mut self) {
        self.env.close();
    }
}

/// Records reward, length and wall time of every episode and attaches them
/// to the info of the step that ends it.
pub struct Monitor<E: GymEnv> {
    env: E,
    start: Instant,
    episode_reward: f64,
    episode_length: usize,
}

impl<E: GymEnv> Monitor<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            start: Instant::now(),
            episode_reward: 0.0,
            episode_length: 0,
        }
    }
}

impl<E: GymEnv> GymEnv for Monitor<E> {
    fn reset(&mut self, seed: Option<u64>) -> (usize, Info) {
        self.episode_reward = 0.0;
        self.episode_length = 0;
        self.env.reset(seed)
    }

    fn step(&mut self, action: usize) -> Result<StepInfo, EnvError> {
        let mut step_info = self.env.step(action)?;
        self.episode_reward += step_info.reward;
        self.episode_length += 1;
        if step_info.done() {
            let stats = EpisodeStats {
                reward: self.episode_reward,
                length: self.episode_length,
                elapsed: self.start.elapsed().as_secs_f64(),
            };
            step_info.info.episode = Some(stats);
            self.episode_reward = 0.0;
            self.episode_length = 0;
        }
        Ok(step_info)
    }

    fn get_obs_dim(&self) -> usize {
        self.env.get_obs_dim()
    }

    fn get_action_dim(&self) -> usize {
        self.env.get_action_dim()
    }

    fn close(&mut self) {
        self.env.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_env::taxi_v3::{self, TaxiEnv};

    #[test]
    fn test_time_limit_truncates() {
        let mut env = TaxiEnv::make();
        env.reset(Some(7));
        let mut steps = 0;
        loop {
            // bumping into the north wall never ends the episode
            let step = env.step(taxi_v3::NORTH).unwrap();
            steps += 1;
            if step.done() {
                assert!(step.truncated);
                assert!(!step.terminated);
                break;
            }
        }
        assert_eq!(steps, taxi_v3::MAX_EPISODE_STEPS);
    }

    #[test]
    fn test_monitor_records_episode() {
        let mut env = Monitor::new(TimeLimit::new(TaxiEnv::new(), 3));
        env.reset(Some(1));
        let first = env.step(taxi_v3::PICKUP).unwrap();
        assert!(first.info.episode.is_none());
        env.step(taxi_v3::NORTH).unwrap();
        let last = env.step(taxi_v3::NORTH).unwrap();
        let stats = last.info.episode.expect("episode stats on the last step");
        assert_eq!(stats.length, 3);
        // the pickup may be legal or not depending on the start state
        assert!(stats.reward == -12.0 || stats.reward == -3.0);
        // counters restart with the next episode
        env.reset(None);
        env.step(taxi_v3::NORTH).unwrap();
        env.step(taxi_v3::NORTH).unwrap();
        let stats = env.step(taxi_v3::NORTH).unwrap().info.episode.unwrap();
        assert_eq!(stats.length, 3);
        assert_eq!(stats.reward, -3.0);
    }
}
