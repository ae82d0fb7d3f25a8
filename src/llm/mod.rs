pub mod chat;
pub mod image;
pub mod transcribe;

/// Connection settings for one provider client. Built from `Args` once at
/// startup; read-only afterwards.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(api_key: Option<String>, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            model,
            base_url,
        }
    }
}
