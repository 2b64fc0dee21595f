use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;

/// Runtime configuration, read from the process environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket holding one `weather_<city>.json` blob per city.
    pub bucket_name: String,

    /// Google Cloud project the generation model runs in.
    pub project_id: String,

    /// Listening port for the HTTP server.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `BUCKET_NAME` and a project id (`GOOGLE_CLOUD_PROJECT`, falling back
    /// to `PROJECT_ID`) are required; `PORT` defaults to 8080.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// Lets tests exercise the parsing rules without touching the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bucket_name = lookup("BUCKET_NAME").ok_or_else(|| anyhow!("BUCKET_NAME is not set"))?;

        let project_id = lookup("GOOGLE_CLOUD_PROJECT")
            .or_else(|| lookup("PROJECT_ID"))
            .ok_or_else(|| anyhow!("Neither GOOGLE_CLOUD_PROJECT nor PROJECT_ID is set"))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Failed to parse PORT value: {raw}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self { bucket_name, project_id, port })
    }
}
