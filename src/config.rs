use clap::Parser;
use std::time::Duration;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "feedback-edge")]
#[command(about = "Public edge functions for feedback boards, roadmaps and changelogs")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Hosted backend base URL; without it records live in memory
    #[arg(short, long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    // Key for writes and staff lookups against the backend
    #[arg(long, env = "BACKEND_SERVICE_KEY", default_value = "", hide_env_values = true)]
    pub service_key: String,

    // Key for anonymous reads, subject to row-level security
    #[arg(long, env = "BACKEND_ANON_KEY", default_value = "", hide_env_values = true)]
    pub anon_key: String,

    // Response cache TTL in seconds
    #[arg(short, long, default_value_t = 30)]
    pub cache_ttl: u64,

    // Seconds between rate limit bucket sweeps
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // Seconds a bucket may stay idle before the sweep drops it
    #[arg(long, default_value_t = 3600)]
    pub bucket_retention: u64,

    // Print the board access SQL and exit
    #[arg(long)]
    pub print_rls_sql: bool,
}

impl Args {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn bucket_retention(&self) -> Duration {
        Duration::from_secs(self.bucket_retention)
    }
}
