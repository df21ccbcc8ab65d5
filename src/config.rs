use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use crate::analyzer::external::AnalyzerCommand;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub storage_root: PathBuf,
    pub analyzer: AnalyzerCommand,
    pub clone_timeout: Duration,
    pub parse_batch_size: usize,
    pub progress_queue_capacity: usize,
    pub database_url: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_port: u16 = env_parse("API_PORT", 8080);
        let bind_host = env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_addr: SocketAddr = format!("{bind_host}:{api_port}").parse()?;

        let storage_root = PathBuf::from(env::var("STORAGE_ROOT").unwrap_or_else(|_| "repos".to_string()));
        std::fs::create_dir_all(&storage_root)?;
        let storage_root = std::fs::canonicalize(&storage_root)?;

        let command_line =
            env::var("ANALYZER_COMMAND").unwrap_or_else(|_| "java me.codvis.ast.Main".to_string());
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("ANALYZER_COMMAND must name a program"))?;
        let analyzer = AnalyzerCommand {
            program,
            args: parts.collect(),
            working_dir: env::var("ANALYZER_DIR").ok().map(PathBuf::from),
            timeout: Duration::from_millis(env_parse("ANALYZER_TIMEOUT_MS", 60_000)),
        };

        Ok(Self {
            bind_addr,
            storage_root,
            analyzer,
            clone_timeout: Duration::from_millis(env_parse("CLONE_TIMEOUT_MS", 600_000)),
            parse_batch_size: env_parse::<usize>("PARSE_BATCH_SIZE", 10).max(1),
            progress_queue_capacity: env_parse::<usize>("PROGRESS_QUEUE_CAPACITY", 64).max(1),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
        })
    }
}
