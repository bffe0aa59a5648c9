pub mod config;

pub use config::{load_dotenv, Config, HttpConfig, JiraConfig, PollConfig, ReputationConfig};
