// src/config/settings.rs

use std::env;

use anyhow::{anyhow, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Configuração lida uma única vez na inicialização.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub admin_emails: Vec<String>,
    pub environment: Environment,
    pub admin_open_access: Option<bool>,
    pub bind_addr: String,
    pub landing_route: String,
}

impl Settings {
    /// Lê o `.env` (se existir) e as variáveis de ambiente.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = non_empty("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL deve ser definida"))?;
        let jwt_secret = non_empty("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET deve ser definido"))?;

        let environment = match non_empty("GROOVY_ENV").map(|v| v.to_lowercase()).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let admin_open_access = non_empty("ADMIN_OPEN_ACCESS")
            .map(|v| parse_bool(&v).ok_or_else(|| anyhow!("ADMIN_OPEN_ACCESS inválido: '{}'", v)))
            .transpose()?;

        let database_max_connections = non_empty("DATABASE_MAX_CONNECTIONS")
            .map(|v| v.parse::<u32>().context("DATABASE_MAX_CONNECTIONS deve ser um número"))
            .transpose()?
            .unwrap_or(5);

        Ok(Settings {
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_issuer: non_empty("JWT_ISSUER"),
            jwt_audience: non_empty("JWT_AUDIENCE"),
            admin_emails: parse_admin_emails(lookup("ADMIN_EMAILS").as_deref().unwrap_or_default()),
            environment,
            admin_open_access,
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            landing_route: non_empty("LANDING_ROUTE").unwrap_or_else(|| "/".to_string()),
        })
    }

    /// Admin aberto só com a allowlist vazia e, sem override explícito,
    /// fora de produção.
    pub fn admin_open_by_default(&self) -> bool {
        self.admin_emails.is_empty()
            && self
                .admin_open_access
                .unwrap_or(self.environment != Environment::Production)
    }
}

/// Lista separada por vírgulas: aparada, minúscula, sem entradas vazias.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
