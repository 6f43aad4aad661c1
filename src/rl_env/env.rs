use crate::error::EnvError;

/// Statistics of one finished episode, attached by [`super::wrappers::Monitor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    pub reward: f64,
    pub length: usize,
    // seconds since the monitor was created
    pub elapsed: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    pub action_mask: Vec<u8>,
    pub episode: Option<EpisodeStats>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInfo {
    pub obs: usize,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

impl StepInfo {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// An environment with discrete observation and action spaces.
pub trait GymEnv {
    fn reset(&mut self, seed: Option<u64>) -> (usize, Info);
    fn step(&mut self, action: usize) -> Result<StepInfo, EnvError>;
    fn get_obs_dim(&self) -> usize;
    fn get_action_dim(&self) -> usize;
    fn close(&mut self) {}
}
