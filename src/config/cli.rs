use crate::config::toml_config::AppConfig;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "enrollment-address")]
#[command(about = "Enrollment and postal address management backed by a postal directory")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override directory.base_url from config
    #[arg(long)]
    pub directory_url: Option<String>,

    /// Override storage.data_path from config
    #[arg(long)]
    pub data_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve a postal code against the postal directory
    Lookup { code: String },
    /// Show an owner's enrollment with its address
    Show { owner_id: u64 },
    /// Create or update an owner's enrollment and address from a JSON file
    Upsert {
        owner_id: u64,
        #[arg(long)]
        payload: PathBuf,
    },
}

impl CliArgs {
    /// 載入配置檔並套用命令列覆蓋
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(url) = &self.directory_url {
            config.directory.base_url = url.clone();
        }
        if let Some(path) = &self.data_path {
            config.storage.data_path = Some(path.clone());
        }

        Ok(config)
    }
}
