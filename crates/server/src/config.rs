use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub catalog_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            catalog_size: 1000,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings);

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    if let Some(value) = file_cfg.get("bind_addr").and_then(|v| v.as_str()) {
        settings.server_bind = value.to_string();
    }
    if let Some(value) = file_cfg.get("catalog_size").and_then(|v| v.as_integer()) {
        if let Ok(parsed) = u32::try_from(value) {
            settings.catalog_size = parsed;
        }
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(value) = std::env::var("SERVER_BIND") {
        settings.server_bind = value;
    }
    if let Ok(value) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = value;
    }
    if let Ok(value) = std::env::var("APP__CATALOG_SIZE") {
        if let Ok(parsed) = value.parse::<u32>() {
            settings.catalog_size = parsed;
        }
    }
}
