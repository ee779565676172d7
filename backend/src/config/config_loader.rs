use anyhow::{Context, Result, bail};
use std::{env, str::FromStr};

use super::{
    config_model::{AuthSecret, BackendServer, Database, DotEnvyConfig},
    stage::Stage,
};

const DEFAULT_JWT_EXPIRES_IN: u64 = 60 * 60 * 24;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let stage = get_stage();

    let backend_server = BackendServer {
        port: required("SERVER_PORT")?,
        body_limit: required("SERVER_BODY_LIMIT")?,
        timeout: required("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: optional("DATABASE_MAX_CONNECTIONS")?.unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };

    let jwt_secret: String = required("JWT_SECRET")?;
    if jwt_secret.trim().is_empty() {
        bail!("JWT_SECRET must not be empty");
    }

    let auth = AuthSecret {
        jwt_secret,
        expires_in_seconds: optional("JWT_EXPIRES_IN")?.unwrap_or(DEFAULT_JWT_EXPIRES_IN),
        cookie_secure: optional("COOKIE_SECURE")?.unwrap_or(stage == Stage::Production),
    };

    Ok(DotEnvyConfig {
        stage,
        backend_server,
        database,
        auth,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = env::var("STAGE").unwrap_or_default();
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn required<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).with_context(|| format!("{key} is missing"))?;
    raw.trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} is invalid")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parsing_accepts_aliases() {
        assert_eq!(Stage::try_from(&"PROD".to_string()).unwrap(), Stage::Production);
        assert_eq!(Stage::try_from(&" dev ".to_string()).unwrap(), Stage::Development);
        assert!(Stage::try_from(&"staging".to_string()).is_err());
    }

    #[test]
    fn optional_treats_blank_as_unset() {
        unsafe {
            env::set_var("SUBTRACK_TEST_BLANK", "  ");
        }
        let value: Option<u32> = optional("SUBTRACK_TEST_BLANK").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn required_reports_unparsable_values() {
        unsafe {
            env::set_var("SUBTRACK_TEST_PORT", "eighty");
        }
        let err = required::<u16>("SUBTRACK_TEST_PORT").unwrap_err();
        assert!(err.to_string().contains("SUBTRACK_TEST_PORT is invalid"));
    }
}
