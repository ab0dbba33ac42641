pub mod chunk;
pub mod match_profile;
pub mod skills;
pub mod validate;

use anyhow::Result;

use crate::cli::DataArgs;
use crate::config::PipelineConfig;

impl DataArgs {
    /// Config file (or defaults) with any path flags applied on top.
    pub fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(path) = &self.skills_path {
            config.skills_path = path.clone();
        }
        if let Some(path) = &self.stopwords_path {
            config.stopwords_path = path.clone();
        }
        if let Some(path) = &self.fewshot_path {
            config.fewshot_path = path.clone();
        }

        Ok(config)
    }
}
