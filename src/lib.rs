pub mod archive;
pub mod cli;
pub mod commands;
pub mod error;
pub mod history;
pub mod settings;
pub mod slack;
pub mod timestamp;

pub use cli::Cli;
pub use error::{AppError, Result};

use settings::Settings;

/// Resolve the API credential: the `--token` flag wins, then the
/// `SLACK_TOKEN` environment variable, then the settings file.
pub fn load_token(cli_token: Option<String>) -> Result<String> {
    if let Some(token) = cli_token {
        return Ok(token);
    }
    if let Ok(token) = std::env::var("SLACK_TOKEN")
        && !token.is_empty()
    {
        return Ok(token);
    }
    let settings = Settings::load()?;
    if !settings.slack.token.is_empty() {
        return Ok(settings.slack.token);
    }
    Err(AppError::MissingToken)
}
