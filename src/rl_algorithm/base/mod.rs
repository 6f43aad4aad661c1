use std::collections::BTreeMap;

use log::info;
use tensorboard_rs::summary_writer::SummaryWriter;

pub mod config;
pub mod memory;
pub mod model;
pub mod on_policy_runner;
pub mod rl_utils;

/// Collects scalars during one training iteration, then prints them as a
/// block and, if a log dir was given, writes them as tensorboard scalars.
pub struct EpochLogger {
    log_info: BTreeMap<(String, String), f32>,
    writer: Option<SummaryWriter>,
}

impl EpochLogger {
    pub fn new(logdir: Option<String>) -> Self {
        Self {
            log_info: BTreeMap::new(),
            writer: logdir.map(SummaryWriter::new),
        }
    }

    pub fn add_scalar(&mut self, main_tag_sub_tag: (&str, &str), val: f32) {
        let main_tag_sub_tag = (
            main_tag_sub_tag.0.to_string(),
            main_tag_sub_tag.1.to_string(),
        );
        self.log_info.insert(main_tag_sub_tag, val);
    }

    /// Dumps and clears the scalars of iteration `iteration`; tensorboard
    /// points are placed at `step` env timesteps.
    pub fn log(&mut self, iteration: usize, step: usize) {
        let header = Self::header(iteration, step);
        info!("{}", header);
        let log_info = std::mem::take(&mut self.log_info);
        for ((main_tag, sub_tag), scalar) in log_info {
            if let Some(writer) = self.writer.as_mut() {
                writer.add_scalar(&format!("{}/{}", main_tag, sub_tag), scalar, step);
            }
            info!("{}/{}={}", main_tag, sub_tag, scalar);
        }
        info!("{}", header);
        if let Some(writer) = self.writer.as_mut() {
            writer.flush();
        }
    }

    fn header(iteration: usize, step: usize) -> String {
        format!("************iter={} timesteps={}************", iteration, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_scalar_replaces() {
        let mut logger = EpochLogger::new(None);
        logger.add_scalar(("train", "loss"), 1.0);
        logger.add_scalar(("train", "loss"), 2.0);
        assert_eq!(logger.log_info.len(), 1);
        assert_eq!(
            logger.log_info.get(&("train".to_string(), "loss".to_string())),
            Some(&2.0)
        );
    }

    #[test]
    fn test_log_drains_scalars() {
        let mut logger = EpochLogger::new(None);
        logger.add_scalar(("rollout", "ep_rew_mean"), -200.0);
        logger.log(1, 2048);
        assert!(logger.log_info.is_empty());
    }

    #[test]
    fn test_header_labels_iteration_and_timesteps() {
        assert_eq!(
            EpochLogger::header(3, 6144),
            "************iter=3 timesteps=6144************"
        );
    }
}
