#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Transport {
    #[serde(rename = "stdio")]
    Stdio,
    #[serde(rename = "http_streamable")]
    HttpStreamable,
}
impl Default for Transport {
    fn default() -> Self {
        Transport::Stdio
    }
}

impl std::str::FromStr for Transport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(Transport::Stdio),
            "http_streamable" | "http" => Ok(Transport::HttpStreamable),
            _ => Err(anyhow::anyhow!("unknown transport: {s}")),
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_timeout_sec() -> u64 {
    60
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QdrantConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
            timeout_sec: default_timeout_sec(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            addr: default_addr(),
        }
    }
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads `path` when it exists, otherwise starts from defaults. Environment
    /// overrides are applied in both cases.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            Self::load(path)?
        } else {
            log::info!("Config file {} not found, using defaults", path);
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(url) = var("QDRANT_URL") {
            self.qdrant.url = url;
        }
        if let Some(api_key) = var("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(api_key).filter(|k| !k.is_empty());
        }
        if let Some(timeout) = var("QDRANT_TIMEOUT") {
            self.qdrant.timeout_sec = timeout
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid QDRANT_TIMEOUT: {timeout}"))?;
        }
        Ok(())
    }
}
