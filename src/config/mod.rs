use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for comment queues and the global log
    pub redis_url: String,

    /// Intent classifier base URL
    pub intent_service_url: String,

    /// Visual matcher base URL
    pub vision_service_url: String,

    /// Order service base URL
    pub order_service_url: String,

    /// Directory service base URL (lists currently active sources)
    pub directory_service_url: String,

    /// Frame capture base URL; frames are fetched from {base}/{source_id}/frame
    pub capture_service_url: String,

    /// Object storage bucket for captured frames
    pub frames_bucket: String,

    /// Object storage access key (S3-compatible)
    pub frames_access_key: String,

    /// Object storage secret key (S3-compatible)
    pub frames_secret_key: String,

    /// Object storage endpoint URL
    pub frames_endpoint: String,

    /// Public base URL used to build frame locators handed to the matcher
    pub frames_public_url: String,

    /// Frame collector poll interval in seconds
    #[serde(default = "default_capture_interval_secs")]
    pub capture_interval_secs: u64,

    /// Minimum classifier confidence to treat a batch as buying intent
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: f64,

    /// Minimum matcher confidence to accept a catalog match
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_capture_interval_secs() -> u64 {
    10
}

fn default_buy_threshold() -> f64 {
    0.5
}

fn default_match_threshold() -> f64 {
    0.7
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
