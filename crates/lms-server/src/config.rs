//! Server configuration from the environment.
//!
//! Every setting has a default; `LMS_*` variables (optionally from a
//! `.env` file) override them.

use std::env;
use std::str::FromStr;

use lms_db::DbConfig;
use lms_service::{ReviewConfig, TenantConfig};

use crate::error::ServerError;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub review: ReviewConfig,
    pub tenant: TenantConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();

        if let Some(v) = lookup("LMS_DB_URL") {
            config.db.url = v;
        }
        if let Some(v) = lookup("LMS_DB_NAMESPACE") {
            config.db.namespace = v;
        }
        if let Some(v) = lookup("LMS_DB_DATABASE") {
            config.db.database = v;
        }
        if let Some(v) = lookup("LMS_DB_USERNAME") {
            config.db.username = v;
        }
        if let Some(v) = lookup("LMS_DB_PASSWORD") {
            config.db.password = v;
        }

        if let Some(v) = lookup("LMS_REVIEW_DEFAULT_PAGE_SIZE") {
            config.review.default_page_size = parse("LMS_REVIEW_DEFAULT_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("LMS_REVIEW_MAX_PAGE_SIZE") {
            config.review.max_page_size = parse("LMS_REVIEW_MAX_PAGE_SIZE", &v)?;
        }
        if config.review.default_page_size == 0
            || config.review.default_page_size > config.review.max_page_size
        {
            return Err(ServerError::Config(
                "LMS_REVIEW_DEFAULT_PAGE_SIZE must be between 1 and LMS_REVIEW_MAX_PAGE_SIZE"
                    .into(),
            ));
        }

        if let Some(v) = lookup("LMS_TENANT_DATABASE_PREFIX") {
            config.tenant.database_prefix = v;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ServerError> {
    value
        .parse()
        .map_err(|_| ServerError::Config(format!("{key} has an invalid value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db.namespace, "lms");
        assert_eq!(config.review.default_page_size, 10);
        assert_eq!(config.tenant.database_prefix, "tenant_");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("LMS_DB_URL", "db.internal:8000"),
            ("LMS_REVIEW_MAX_PAGE_SIZE", "50"),
        ]))
        .unwrap();
        assert_eq!(config.db.url, "db.internal:8000");
        assert_eq!(config.review.max_page_size, 50);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("LMS_REVIEW_MAX_PAGE_SIZE", "lots")]));
        assert!(matches!(err, Err(ServerError::Config(_))));

        let err = ServerConfig::from_lookup(lookup(&[("LMS_REVIEW_DEFAULT_PAGE_SIZE", "0")]));
        assert!(matches!(err, Err(ServerError::Config(_))));
    }
}
