use std::time::{SystemTime, UNIX_EPOCH};

/// Environment variable consulted when no seed is passed on the command line.
pub const SEED_ENV: &str = "CAPTURE_SEED";

/// Resolve seed from CLI, then env (`CAPTURE_SEED`), else time.
pub fn resolve_seed(cli_seed: Option<u64>) -> u64 {
    resolve_seed_or(cli_seed, None)
}

/// Like [`resolve_seed`], with a configured seed consulted before falling back to time.
pub fn resolve_seed_or(cli_seed: Option<u64>, configured: Option<u64>) -> u64 {
    if let Some(s) = cli_seed {
        return s;
    }
    if let Some(parsed) = std::env::var(SEED_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return parsed;
    }
    if let Some(s) = configured {
        return s;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}
