//! Configuration for the Sisyphus worker loop.

use std::env;

use olympus_common::Language;

/// Languages this worker instance serves. One Tokio task per entry, each
/// running its own `blocking_pop` loop against that language's queue.
///
/// Defaults to all five judged languages; set `WORKER_LANGUAGES` to a
/// comma-separated subset (e.g. `python,cpp`) to dedicate an instance to a
/// slice of the workload.
pub const ALL_LANGUAGES: [Language; 5] = [
    Language::Python,
    Language::Cpp,
    Language::C,
    Language::Go,
    Language::Java,
];

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub redis_url: String,
    pub metrics_port: u16,
    pub worker_languages: Vec<Language>,
    pub minos: minos::Config,
}

impl Config {
    pub fn from_env() -> Self {
        let worker_languages = env::var("WORKER_LANGUAGES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .filter_map(|tag| Language::from_tag(tag.trim()))
                    .collect::<Vec<_>>()
            })
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(|| ALL_LANGUAGES.to_vec());

        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            metrics_port: env::var("METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9092),
            worker_languages,
            minos: minos::Config::from_env(),
        }
    }
}
