use std::{fs, path::PathBuf};

use ip_network::IpNetwork;
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "config/config.toml";

lazy_static::lazy_static! {
    pub static ref CONFIG: GlobalConfig = load();
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GlobalConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub log_level: usize,
    #[serde(default)]
    pub opentelemetry: Option<String>,
    #[serde(default)]
    pub coach: Coach,
    #[serde(default)]
    pub dashboard: Dashboard,
    #[serde(default)]
    pub grpc: GrpcOption,
}

fn default_bind_address() -> String {
    "0.0.0.0:8081".to_string()
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Database {
    pub path: String,
    pub salt: String,
    #[serde(default)]
    pub migrate: Option<bool>,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: "database/backend.sqlite".to_owned(),
            salt: "be sure to change it".to_owned(),
            migrate: None,
        }
    }
}

/// LLM coach upstream, OpenAI-compatible chat completion
#[derive(Serialize, Deserialize, Debug)]
pub struct Coach {
    #[serde(default = "default_coach_url")]
    pub api_url: String,
    /// unset disables the coach entirely
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_coach_model")]
    pub model: String,
    /// per-student daily message quota, indexed by assignment ai_level(0-4)
    #[serde(default = "default_daily_limits")]
    pub daily_limits: [u32; 5],
}

fn default_coach_url() -> String {
    "https://api.openai.com/v1".to_owned()
}
fn default_coach_model() -> String {
    "gpt-4o-mini".to_owned()
}
fn default_daily_limits() -> [u32; 5] {
    [0, 6, 12, 20, 40]
}

impl Default for Coach {
    fn default() -> Self {
        Self {
            api_url: default_coach_url(),
            api_key: None,
            model: default_coach_model(),
            daily_limits: default_daily_limits(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Dashboard {
    /// a student passing strictly less than this percentage of
    /// assigned problems counts as struggling
    #[serde(default = "default_struggling_percent")]
    pub struggling_percent: u32,
    /// answer-seeking phrases, matched case-insensitively as substrings
    #[serde(default = "default_cheating_phrases")]
    pub cheating_phrases: Vec<String>,
}

fn default_struggling_percent() -> u32 {
    30
}

fn default_cheating_phrases() -> Vec<String> {
    [
        "정답 알려",
        "정답 좀",
        "코드 줘",
        "코드 짜줘",
        "답만 알려",
        "전체 코드 줘",
        "give me the answer",
        "write the code for me",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            struggling_percent: default_struggling_percent(),
            cheating_phrases: default_cheating_phrases(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GrpcOption {
    /// upstream proxies allowed to set X-Forwarded-For
    #[serde(default = "default_trust_host")]
    pub trust_host: Vec<IpNetwork>,
    pub public_pem: Option<PathBuf>,
    pub private_pem: Option<PathBuf>,
}

fn default_trust_host() -> Vec<IpNetwork> {
    vec!["127.0.0.0/8".parse().unwrap()]
}

impl Default for GrpcOption {
    fn default() -> Self {
        Self {
            trust_host: default_trust_host(),
            public_pem: None,
            private_pem: None,
        }
    }
}

fn load() -> GlobalConfig {
    if let Ok(raw) = fs::read_to_string(CONFIG_PATH) {
        return toml::from_str(&raw)
            .unwrap_or_else(|err| panic!("malformed config {}: {}", CONFIG_PATH, err));
    }

    println!("Unable to find {}, generating default config", CONFIG_PATH);
    let config: GlobalConfig = toml::from_str("").unwrap();

    fs::create_dir_all("config").expect("cannot create config directory");
    fs::write(CONFIG_PATH, toml::to_string(&config).unwrap()).expect("cannot write default config");

    println!(
        "Config generated, please edit {} before restart",
        CONFIG_PATH
    );
    println!("Finished, exiting...");
    std::process::exit(0);
}

#[cfg(test)]
mod test {
    use super::GlobalConfig;

    #[test]
    fn default() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8081");
        assert_eq!(config.dashboard.struggling_percent, 30);
        assert!(config
            .dashboard
            .cheating_phrases
            .iter()
            .any(|x| x == "코드 줘"));
        assert_eq!(config.coach.daily_limits[0], 0);
        assert!(config.coach.api_key.is_none());
    }

    #[test]
    fn override_dashboard() {
        let config: GlobalConfig = toml::from_str(
            r#"
[dashboard]
struggling_percent = 50
cheating_phrases = ["정답"]
"#,
        )
        .unwrap();
        assert_eq!(config.dashboard.struggling_percent, 50);
        assert_eq!(config.dashboard.cheating_phrases, vec!["정답".to_owned()]);
    }
}
