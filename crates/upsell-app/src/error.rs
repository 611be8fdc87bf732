use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(
        "missing config at {}\nCreate ~/.config/kactus-upsell/config.toml and see README.md for setup instructions.",
        path.display()
    )]
    MissingConfig { path: PathBuf },
    #[error(
        "invalid config at {}: {message}\nFix the config and retry. See README.md for setup instructions.",
        path.display()
    )]
    InvalidConfig { path: PathBuf, message: String },
}
