//! Process configuration, loaded once at startup from the environment.
//!
//! Branding strings are plain immutable values handed to the presentation
//! layer; nothing here is mutated after load.

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub site: SiteConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Site branding shown on every rendered page.
#[derive(Clone)]
pub struct SiteConfig {
    pub header: String,
    pub title: String,
    pub index_title: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server = ServerConfig {
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        };
        let database = DatabaseConfig {
            url: env_or(
                "DATABASE_URL",
                "postgres://backoffice:@localhost:5432/backoffice",
            ),
        };
        let site = SiteConfig {
            header: env_or("SITE_HEADER", "Company Intranet"),
            title: env_or("SITE_TITLE", "Company Intranet"),
            index_title: env_or("SITE_INDEX_TITLE", "Site administration"),
        };
        Self {
            server,
            database,
            site,
        }
    }

    pub fn database_url(&self) -> String {
        self.database.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let cfg = AppConfig::from_env();
        assert!(!cfg.site.header.is_empty());
        assert!(cfg.server.port > 0);
    }
}
