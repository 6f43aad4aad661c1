mod burn_utils;
mod error;
mod rl_algorithm;
mod rl_env;
mod taxi_run;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::record::FullPrecisionSettings;
use tracing_subscriber::EnvFilter;

pub type MyPrecisionSettings = FullPrecisionSettings;
type MyBackend = Autodiff<NdArray>;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let device = NdArrayDevice::Cpu;
    let configs = vec![taxi_run::standard_config(), taxi_run::aggressive_config()];
    let mut stdout = std::io::stdout().lock();
    taxi_run::run_all::<MyBackend>(configs, device, &mut stdout)?;
    Ok(())
}
