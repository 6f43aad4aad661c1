// modify from gymnasium toy_text taxi (Taxi-v3)
// https://github.com/Farama-Foundation/Gymnasium/blob/main/gymnasium/envs/toy_text/taxi.py

use super::env::{GymEnv, Info, StepInfo};
use super::wrappers::TimeLimit;
use crate::error::EnvError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAP: [&[u8; 11]; 7] = [
    b"+---------+",
    b"|R: | : :G|",
    b"| : | : : |",
    b"| : : : : |",
    b"| | : | : |",
    b"|Y| : |B: |",
    b"+---------+",
];

pub const NUM_ROWS: usize = 5;
pub const NUM_COLUMNS: usize = 5;
/// R, G, Y, B
pub const LOCS: [(usize, usize); 4] = [(0, 0), (0, 4), (4, 0), (4, 3)];
/// passenger location index meaning "riding in the taxi"
pub const IN_TAXI: usize = 4;
pub const NUM_STATES: usize = 500;
pub const NUM_ACTIONS: usize = 6;
pub const MAX_EPISODE_STEPS: usize = 200;

pub const SOUTH: usize = 0;
pub const NORTH: usize = 1;
pub const EAST: usize = 2;
pub const WEST: usize = 3;
pub const PICKUP: usize = 4;
pub const DROPOFF: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    next_state: usize,
    reward: f64,
    terminated: bool,
}

pub fn encode(taxi_row: usize, taxi_col: usize, pass_loc: usize, dest_idx: usize) -> usize {
    ((taxi_row * NUM_COLUMNS + taxi_col) * (LOCS.len() + 1) + pass_loc) * LOCS.len() + dest_idx
}

/// Inverse of [`encode`]: `(taxi_row, taxi_col, pass_loc, dest_idx)`.
pub fn decode(state: usize) -> (usize, usize, usize, usize) {
    let dest_idx = state % LOCS.len();
    let state = state / LOCS.len();
    let pass_loc = state % (LOCS.len() + 1);
    let state = state / (LOCS.len() + 1);
    let taxi_col = state % NUM_COLUMNS;
    let taxi_row = state / NUM_COLUMNS;
    (taxi_row, taxi_col, pass_loc, dest_idx)
}

fn can_move_east(row: usize, col: usize) -> bool {
    MAP[1 + row][2 * col + 2] == b':'
}

fn can_move_west(row: usize, col: usize) -> bool {
    MAP[1 + row][2 * col] == b':'
}

fn build_transition(
    row: usize,
    col: usize,
    pass_loc: usize,
    dest_idx: usize,
    action: usize,
) -> Transition {
    let taxi_loc = (row, col);
    let (mut new_row, mut new_col, mut new_pass_loc) = (row, col, pass_loc);
    let mut reward = -1.0;
    let mut terminated = false;
    match action {
        SOUTH => new_row = (row + 1).min(NUM_ROWS - 1),
        NORTH => new_row = row.saturating_sub(1),
        EAST if can_move_east(row, col) => new_col = (col + 1).min(NUM_COLUMNS - 1),
        WEST if can_move_west(row, col) => new_col = col.saturating_sub(1),
        PICKUP => {
            if pass_loc < IN_TAXI && taxi_loc == LOCS[pass_loc] {
                new_pass_loc = IN_TAXI;
            } else {
                reward = -10.0;
            }
        }
        DROPOFF => {
            let landmark = LOCS.iter().position(|loc| *loc == taxi_loc);
            if pass_loc == IN_TAXI && taxi_loc == LOCS[dest_idx] {
                new_pass_loc = dest_idx;
                terminated = true;
                reward = 20.0;
            } else if let (IN_TAXI, Some(loc_idx)) = (pass_loc, landmark) {
                new_pass_loc = loc_idx;
            } else {
                reward = -10.0;
            }
        }
        // blocked by a wall
        _ => {}
    }
    Transition {
        next_state: encode(new_row, new_col, new_pass_loc, dest_idx),
        reward,
        terminated,
    }
}

/// Actions that change the state, 1 = useful.
pub fn action_mask(state: usize) -> Vec<u8> {
    let (row, col, pass_loc, dest_idx) = decode(state);
    let taxi_loc = (row, col);
    let mut mask = vec![0u8; NUM_ACTIONS];
    mask[SOUTH] = (row < NUM_ROWS - 1) as u8;
    mask[NORTH] = (row > 0) as u8;
    mask[EAST] = (col < NUM_COLUMNS - 1 && can_move_east(row, col)) as u8;
    mask[WEST] = (col > 0 && can_move_west(row, col)) as u8;
    mask[PICKUP] = (pass_loc < IN_TAXI && taxi_loc == LOCS[pass_loc]) as u8;
    mask[DROPOFF] = (pass_loc == IN_TAXI
        && (taxi_loc == LOCS[dest_idx] || LOCS.contains(&taxi_loc))) as u8;
    mask
}

pub struct TaxiEnv {
    transitions: Vec<[Transition; NUM_ACTIONS]>,
    initial_states: Vec<usize>,
    state: Option<usize>,
    rng: StdRng,
}

impl TaxiEnv {
    pub fn new() -> Self {
        let mut transitions = Vec::with_capacity(NUM_STATES);
        let mut initial_states = Vec::new();
        for row in 0..NUM_ROWS {
            for col in 0..NUM_COLUMNS {
                for pass_loc in 0..=IN_TAXI {
                    for dest_idx in 0..LOCS.len() {
                        let state = encode(row, col, pass_loc, dest_idx);
                        debug_assert_eq!(state, transitions.len());
                        if pass_loc < IN_TAXI && pass_loc != dest_idx {
                            initial_states.push(state);
                        }
                        transitions.push(std::array::from_fn(|action| {
                            build_transition(row, col, pass_loc, dest_idx, action)
                        }));
                    }
                }
            }
        }
        Self {
            transitions,
            initial_states,
            state: None,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Same as `gym.make("Taxi-v3")`: the raw env under a 200 step limit.
    pub fn make() -> TimeLimit<TaxiEnv> {
        TimeLimit::new(Self::new(), MAX_EPISODE_STEPS)
    }

}

impl Default for TaxiEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl GymEnv for TaxiEnv {
    fn reset(&mut self, seed: Option<u64>) -> (usize, Info) {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let state = self.initial_states[self.rng.random_range(0..self.initial_states.len())];
        self.state = Some(state);
        let info = Info {
            action_mask: action_mask(state),
            episode: None,
        };
        (state, info)
    }

    fn step(&mut self, action: usize) -> Result<StepInfo, EnvError> {
        if action >= NUM_ACTIONS {
            return Err(EnvError::InvalidAction {
                action,
                n: NUM_ACTIONS,
            });
        }
        let state = self.state.ok_or(EnvError::ResetNeeded)?;
        let transition = self.transitions[state][action];
        self.state = Some(transition.next_state);
        Ok(StepInfo {
            obs: transition.next_state,
            reward: transition.reward,
            terminated: transition.terminated,
            truncated: false,
            info: Info {
                action_mask: action_mask(transition.next_state),
                episode: None,
            },
        })
    }

    fn get_obs_dim(&self) -> usize {
        NUM_STATES
    }

    fn get_action_dim(&self) -> usize {
        NUM_ACTIONS
    }

    fn close(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_at(state: usize) -> TaxiEnv {
        let mut env = TaxiEnv::new();
        env.state = Some(state);
        env
    }

    #[test]
    fn test_encode_decode() {
        for state in 0..NUM_STATES {
            let (row, col, pass_loc, dest_idx) = decode(state);
            assert_eq!(encode(row, col, pass_loc, dest_idx), state);
        }
        assert_eq!(encode(4, 4, 4, 3), NUM_STATES - 1);
    }

    #[test]
    fn test_initial_states() {
        let env = TaxiEnv::new();
        assert_eq!(env.initial_states.len(), 300);
        for &state in &env.initial_states {
            let (_, _, pass_loc, dest_idx) = decode(state);
            assert!(pass_loc < IN_TAXI);
            assert_ne!(pass_loc, dest_idx);
        }
    }

    #[test]
    fn test_walls() {
        // "|R: | : :G|": wall between column 1 and 2 on the top row
        let mut env = env_at(encode(0, 1, 0, 1));
        let step = env.step(EAST).unwrap();
        assert_eq!(decode(step.obs), (0, 1, 0, 1));
        assert_eq!(step.reward, -1.0);

        let mut env = env_at(encode(0, 0, 0, 1));
        let step = env.step(EAST).unwrap();
        assert_eq!(decode(step.obs), (0, 1, 0, 1));

        let mut env = env_at(encode(0, 0, 0, 1));
        let step = env.step(NORTH).unwrap();
        assert_eq!(decode(step.obs), (0, 0, 0, 1));
        let step = env.step(WEST).unwrap();
        assert_eq!(decode(step.obs), (0, 0, 0, 1));
    }

    #[test]
    fn test_pickup_and_dropoff() {
        // passenger waiting at R, destination G
        let mut env = env_at(encode(0, 0, 0, 1));
        let step = env.step(PICKUP).unwrap();
        assert_eq!(step.reward, -1.0);
        assert_eq!(decode(step.obs), (0, 0, IN_TAXI, 1));

        let step = env.step(PICKUP).unwrap();
        assert_eq!(step.reward, -10.0);

        let mut env = env_at(encode(0, 4, IN_TAXI, 1));
        let step = env.step(DROPOFF).unwrap();
        assert_eq!(step.reward, 20.0);
        assert!(step.terminated);
        assert_eq!(decode(step.obs), (0, 4, 1, 1));
    }

    #[test]
    fn test_dropoff_at_wrong_landmark() {
        // taxi at Y carrying a passenger bound for B
        let mut env = env_at(encode(4, 0, IN_TAXI, 3));
        let step = env.step(DROPOFF).unwrap();
        assert_eq!(step.reward, -1.0);
        assert!(!step.terminated);
        assert_eq!(decode(step.obs), (4, 0, 2, 3));

        let mut env = env_at(encode(2, 2, IN_TAXI, 3));
        let step = env.step(DROPOFF).unwrap();
        assert_eq!(step.reward, -10.0);
    }

    #[test]
    fn test_action_mask() {
        let mask = action_mask(encode(0, 0, 0, 1));
        assert_eq!(mask, vec![1, 0, 1, 0, 1, 0]);
        let mask = action_mask(encode(4, 3, IN_TAXI, 3));
        assert_eq!(mask, vec![0, 1, 1, 0, 0, 1]);
    }

    #[test]
    fn test_step_errors() {
        let mut env = TaxiEnv::new();
        assert!(matches!(env.step(SOUTH), Err(EnvError::ResetNeeded)));
        env.reset(Some(0));
        assert!(matches!(
            env.step(NUM_ACTIONS),
            Err(EnvError::InvalidAction { action: 6, n: 6 })
        ));
    }

    #[test]
    fn test_seeded_reset() {
        let mut a = TaxiEnv::new();
        let mut b = TaxiEnv::new();
        let first: Vec<usize> = (0..5)
            .map(|i| a.reset(if i == 0 { Some(42) } else { None }).0)
            .collect();
        let second: Vec<usize> = (0..5)
            .map(|i| b.reset(if i == 0 { Some(42) } else { None }).0)
            .collect();
        assert_eq!(first, second);
    }
}
