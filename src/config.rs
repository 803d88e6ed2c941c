#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Work factor used when hashing client secrets and user passwords
    /// from the CLI. Stored hashes carry their own cost, so changing this
    /// never invalidates existing credentials.
    /// Set via NOTES_BCRYPT_COST env var. Default: bcrypt::DEFAULT_COST.
    pub bcrypt_cost: u32,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    Ok(Config {
        port: std::env::var("NOTES_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/notes".into()),
        bcrypt_cost: std::env::var("NOTES_BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(bcrypt::DEFAULT_COST),
    })
}
