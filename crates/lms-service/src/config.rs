//! Service configuration.

/// Configuration for the review service.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Page size used when the caller asks for less than one item.
    pub default_page_size: u64,
    /// Upper bound on the page size (larger requests are clamped).
    pub max_page_size: u64,
    /// Maximum review title length in characters.
    pub max_title_length: usize,
    /// Maximum review comment length in characters.
    pub max_comment_length: usize,
    /// Maximum report reason length in characters.
    pub max_reason_length: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            max_title_length: 200,
            max_comment_length: 2000,
            max_reason_length: 500,
        }
    }
}

impl ReviewConfig {
    /// Normalize a 1-based page request: `page < 1` becomes 1, a page
    /// size below 1 falls back to the default and sizes above the
    /// maximum are clamped.
    pub fn normalize_page(&self, page: u64, page_size: u64) -> (u64, u64) {
        let page = page.max(1);
        let page_size = match page_size {
            0 => self.default_page_size,
            n => n.min(self.max_page_size),
        };
        (page, page_size)
    }
}

/// Configuration for tenant provisioning.
#[derive(Debug, Clone)]
pub struct TenantConfig {
    /// Prefix of every tenant database name.
    pub database_prefix: String,
    pub min_slug_length: usize,
    pub max_slug_length: usize,
    pub max_name_length: usize,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            database_prefix: "tenant_".into(),
            min_slug_length: 3,
            max_slug_length: 63,
            max_name_length: 255,
        }
    }
}

impl TenantConfig {
    /// Database name for a slug: the prefix followed by the slug with
    /// `-` replaced by `_`.
    pub fn database_name(&self, slug: &str) -> String {
        format!("{}{}", self.database_prefix, slug.replace('-', "_"))
    }
}
