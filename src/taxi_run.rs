use std::io::Write;
use std::path::Path;

use burn::config::Config;
use burn::module::AutodiffModule;
use burn::prelude::Backend;
use burn::tensor::backend::AutodiffBackend;
use log::info;

use crate::error::Result;
use crate::rl_algorithm::base::config::RunConfig;
use crate::rl_algorithm::base::on_policy_runner::OnPolicyRunner;
use crate::rl_algorithm::ppo::ppo_agent::PPO;
use crate::rl_algorithm::preload_net::actor_critic::{MlpActorCritic, MlpActorCriticConfig};
use crate::rl_env::env::GymEnv;
use crate::rl_env::taxi_v3::TaxiEnv;
use crate::rl_env::vec_env::{DummyVecEnv, EnvFactory};
use crate::rl_env::wrappers::{Monitor, TimeLimit};

pub const STANDARD_LR: f64 = 0.0003;
pub const AGGRESSIVE_LR: f64 = 0.001;
pub const TOTAL_TIMESTEPS: usize = 500_000;

const BANNER_WIDTH: usize = 80;

pub fn standard_config() -> RunConfig {
    RunConfig::new(STANDARD_LR, "(standard LR)".to_string())
        .with_total_timesteps(TOTAL_TIMESTEPS)
}

pub fn aggressive_config() -> RunConfig {
    RunConfig::new(AGGRESSIVE_LR, "(aggressive LR)".to_string())
        .with_total_timesteps(TOTAL_TIMESTEPS)
}

pub fn make_train_env() -> Monitor<TimeLimit<TaxiEnv>> {
    Monitor::new(TaxiEnv::make())
}

/// `0.0003` -> `ppo_taxi_lr_0_0003`, the recorder adds the extension.
pub fn model_file_name(learning_rate: f64) -> String {
    format!("ppo_taxi_lr_{}", learning_rate.to_string().replace('.', "_"))
}

/// Runs greedy episodes and prints one line per episode. Returns the totals.
pub fn evaluate<B: Backend, E: GymEnv>(
    policy: &MlpActorCritic<B>,
    env: &mut E,
    n_episodes: usize,
    seed: Option<u64>,
    out: &mut impl Write,
) -> Result<Vec<f64>> {
    let mut totals = Vec::with_capacity(n_episodes);
    for episode in 0..n_episodes {
        let (mut obs, _) = env.reset(if episode == 0 { seed } else { None });
        let mut total_reward = 0.0;
        loop {
            let step = env.step(policy.predict_one(obs))?;
            total_reward += step.reward;
            obs = step.obs;
            if step.done() {
                break;
            }
        }
        writeln!(out, "Episode {}: Total Reward = {}", episode + 1, total_reward)?;
        totals.push(total_reward);
    }
    Ok(totals)
}

/// Trains one PPO agent on Taxi-v3 under `config`, saves it, then tests it.
pub fn train_and_test<B: AutodiffBackend>(
    config: RunConfig,
    device: B::Device,
    out: &mut impl Write,
) -> Result<Vec<f64>> {
    config.validate()?;
    writeln!(out, "\n{}", "=".repeat(BANNER_WIDTH))?;
    writeln!(
        out,
        "Training PPO on Taxi-v3 | lr={} {}",
        config.learning_rate, config.run_name
    )?;
    writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;
    out.flush()?;

    let env_fns = vec![make_train_env as EnvFactory<_>; config.n_envs];
    let env = DummyVecEnv::new(&env_fns);
    let net_config = MlpActorCriticConfig::new(env.get_obs_dim(), env.get_action_dim())
        .with_layer_dims(config.net_arch.clone());
    let actor_net = net_config.init_actor::<B>(&device);
    let baseline_net = net_config.init_critic::<B>(&device);
    info!("actor_net={}", actor_net);
    info!("baseline_net={}", baseline_net);

    let ppo_algo = PPO::new(config.ppo_train_config(), config.seed);
    let mut runner =
        OnPolicyRunner::<_, B>::new(device, env, config.clone(), "ppo", "Taxi-v3");
    let (actor_net, baseline_net) =
        runner.learn(actor_net, baseline_net, ppo_algo, config.total_timesteps)?;
    runner.close();
    info!(
        "{} finished after {} timesteps",
        runner.exp_name(),
        runner.num_timesteps()
    );

    let policy = MlpActorCritic::new(actor_net.valid(), baseline_net.valid());
    let output_dir = Path::new(&config.output_dir);
    std::fs::create_dir_all(output_dir)?;
    let model_path = output_dir.join(model_file_name(config.learning_rate));
    policy.save_policy(&model_path)?;
    config.save(model_path.with_extension("json"))?;
    info!("model saved to {}", model_path.display());

    writeln!(out, "\nTesting the trained agent...")?;
    let mut eval_env = TaxiEnv::make();
    let totals = evaluate(
        &policy,
        &mut eval_env,
        config.n_eval_episodes,
        config.seed,
        out,
    )?;
    eval_env.close();
    Ok(totals)
}

pub fn run_all<B: AutodiffBackend>(
    configs: Vec<RunConfig>,
    device: B::Device,
    out: &mut impl Write,
) -> Result<()> {
    for config in configs {
        train_and_test::<B>(config, device.clone(), out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnvError;
    use crate::rl_env::env::{Info, StepInfo};
    use crate::rl_env::taxi_v3;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;

    #[test]
    fn test_model_file_name() {
        assert_eq!(model_file_name(0.0003), "ppo_taxi_lr_0_0003");
        assert_eq!(model_file_name(0.001), "ppo_taxi_lr_0_001");
    }

    #[test]
    fn test_fixed_configs() {
        let standard = standard_config();
        let aggressive = aggressive_config();
        assert_eq!(standard.total_timesteps, 500_000);
        assert_eq!(aggressive.total_timesteps, 500_000);
        assert_eq!(standard.learning_rate, 0.0003);
        assert_eq!(aggressive.learning_rate, 0.001);
        assert_eq!(standard.run_name, "(standard LR)");
        assert_eq!(aggressive.run_name, "(aggressive LR)");
        assert_eq!(standard.n_eval_episodes, 10);
    }

    #[test]
    fn test_evaluate_prints_every_episode() {
        let device = NdArrayDevice::Cpu;
        let policy = MlpActorCriticConfig::new(taxi_v3::NUM_STATES, taxi_v3::NUM_ACTIONS)
            .with_layer_dims(vec![8])
            .init::<NdArray>(&device);
        let mut env = TaxiEnv::make();
        let mut out = Vec::new();
        let totals = evaluate(&policy, &mut env, 10, Some(0), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(totals.len(), 10);
        for (i, (line, total)) in lines.iter().zip(&totals).enumerate() {
            assert_eq!(*line, format!("Episode {}: Total Reward = {}", i + 1, total));
            // at least one step, at most the time limit; each step earns -10, -1 or 20
            assert!(*total <= 20.0 && *total >= -10.0 * taxi_v3::MAX_EPISODE_STEPS as f64);
        }
    }

    /// Pays 2.5 per step. Odd episodes terminate on step 3, even ones are
    /// truncated on step 5.
    #[derive(Default)]
    struct ScriptedEnv {
        episode: usize,
        t: usize,
        steps: usize,
        resets: usize,
    }

    impl GymEnv for ScriptedEnv {
        fn reset(&mut self, _seed: Option<u64>) -> (usize, Info) {
            self.resets += 1;
            self.episode = self.resets;
            self.t = 0;
            (0, Info::default())
        }

        fn step(&mut self, action: usize) -> std::result::Result<StepInfo, EnvError> {
            assert!(action < taxi_v3::NUM_ACTIONS);
            self.steps += 1;
            self.t += 1;
            Ok(StepInfo {
                obs: self.t,
                reward: 2.5,
                terminated: self.episode % 2 == 1 && self.t == 3,
                truncated: self.episode % 2 == 0 && self.t == 5,
                info: Info::default(),
            })
        }

        fn get_obs_dim(&self) -> usize {
            taxi_v3::NUM_STATES
        }

        fn get_action_dim(&self) -> usize {
            taxi_v3::NUM_ACTIONS
        }
    }

    #[test]
    fn test_evaluate_stops_on_first_done() {
        let device = NdArrayDevice::Cpu;
        let policy = MlpActorCriticConfig::new(taxi_v3::NUM_STATES, taxi_v3::NUM_ACTIONS)
            .with_layer_dims(vec![8])
            .init::<NdArray>(&device);
        let mut env = ScriptedEnv::default();
        let mut out = Vec::new();
        let totals = evaluate(&policy, &mut env, 10, None, &mut out).unwrap();

        let expected: Vec<f64> = (1..=10)
            .map(|episode| if episode % 2 == 1 { 7.5 } else { 12.5 })
            .collect();
        assert_eq!(totals, expected);
        assert_eq!(env.steps, 5 * 3 + 5 * 5);
        assert_eq!(env.resets, 10);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Episode 1: Total Reward = 7.5");
        assert_eq!(lines[1], "Episode 2: Total Reward = 12.5");
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_train_and_test_output_order() {
        let output_dir = std::env::temp_dir()
            .join(format!("taxi_ppo_run_{}", std::process::id()))
            .to_string_lossy()
            .to_string();
        let tiny = |config: RunConfig| {
            config
                .with_total_timesteps(64)
                .with_n_steps(32)
                .with_batch_size(16)
                .with_n_epochs(1)
                .with_net_arch(vec![8])
                .with_seed(Some(1))
                .with_output_dir(output_dir.clone())
        };
        let configs = vec![tiny(standard_config()), tiny(aggressive_config())];
        let mut out = Vec::new();
        run_all::<Autodiff<NdArray>>(configs, NdArrayDevice::Cpu, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let banner = "=".repeat(80);
        // two blocks: "", banner, title, banner, "", testing, 10 episodes
        assert_eq!(lines.len(), 2 * 16);
        for (block, title) in lines.chunks(16).zip([
            "Training PPO on Taxi-v3 | lr=0.0003 (standard LR)",
            "Training PPO on Taxi-v3 | lr=0.001 (aggressive LR)",
        ]) {
            assert_eq!(block[0], "");
            assert_eq!(block[1], banner);
            assert_eq!(block[2], title);
            assert_eq!(block[3], banner);
            assert_eq!(block[4], "");
            assert_eq!(block[5], "Testing the trained agent...");
            for (i, line) in block[6..].iter().enumerate() {
                assert!(line.starts_with(&format!("Episode {}: Total Reward = ", i + 1)));
            }
        }

        let model = Path::new(&output_dir).join("ppo_taxi_lr_0_0003.mpk");
        assert!(model.exists());
        assert!(Path::new(&output_dir).join("ppo_taxi_lr_0_001.json").exists());
        let _ = std::fs::remove_dir_all(&output_dir);
    }
}
