#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    /// Worker tasks pulling from the priority queues.
    /// Set via FANOUT_WORKERS env var. Default: 4.
    pub workers: usize,
    /// Per-queue capacity before enqueue applies backpressure.
    pub queue_capacity: usize,
    /// Bounded retry cap per job before dead-lettering.
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Minimum hours between moderation assignments for one moderator.
    pub moderation_cooldown_hours: i64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    Ok(Config {
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/fanout".into()),
        workers: std::env::var("FANOUT_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4),
        queue_capacity: std::env::var("FANOUT_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024),
        max_attempts: std::env::var("FANOUT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        base_backoff_ms: std::env::var("FANOUT_BASE_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500),
        max_backoff_ms: std::env::var("FANOUT_MAX_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60_000),
        moderation_cooldown_hours: std::env::var("FANOUT_MODERATION_COOLDOWN_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(672),
    })
}
