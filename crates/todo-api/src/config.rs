use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
}

impl Config {
    /// Reads settings from the environment, falling back to local-dev
    /// defaults. `DATABASE_PATH` accepts `:memory:` for a throwaway store.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "todos.db".to_string()),
        }
    }
}
