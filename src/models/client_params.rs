use std::time::Duration;

use typed_builder::TypedBuilder;

/// Default origin for the OpenAI API
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration shared by every request a client issues
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct ClientParams {
    /// Base origin requests are resolved against
    #[builder(setter(into), default = String::from(DEFAULT_BASE_URL))]
    pub base_url: String,
    /// Overall timeout applied to each request
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
    /// Organization sent with every request
    #[builder(default, setter(strip_option, into))]
    pub organization: Option<String>,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self::builder().build()
    }
}
