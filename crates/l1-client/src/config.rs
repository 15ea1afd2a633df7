use serde::{Deserialize, Serialize};

/// Number of items Blockfrost returns per page at most.
pub const MAX_PAGE_SIZE: usize = 100;

/// L1ClientConfig describes how to reach a Blockfrost instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1ClientConfig {
    /// Base URL including the API version, e.g. `https://cardano-preprod.blockfrost.io/api/v0`.
    pub(crate) url: String,

    /// Project id sent in the `project_id` header.
    pub(crate) project_id: String,

    /// Items requested per page, defaults to [`MAX_PAGE_SIZE`].
    pub(crate) page_size: usize,
}

impl L1ClientConfig {
    /// Creates a config for the API at `url`, authenticated with `project_id`.
    pub fn new(url: &str, project_id: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Updates the page size, capped at [`MAX_PAGE_SIZE`].
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// The API base URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}
