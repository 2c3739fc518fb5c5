use anyhow::{anyhow, Context};

const DEFAULT_CHAT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_VISION_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: String,
    /// OpenAI-compatible chat completions endpoint.
    pub chat_api_base: String,
    pub chat_api_key: String,
    pub chat_model: String,
    /// Gemini-style generateContent endpoint used for document extraction.
    pub vision_api_base: String,
    pub vision_api_key: String,
    pub vision_model: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL not found"))?;

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow!("JWT_SECRET not found"))?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let chat_api_base =
            std::env::var("CHAT_API_BASE").unwrap_or_else(|_| DEFAULT_CHAT_API_BASE.to_string());

        // Missing AI credentials are not fatal at startup: the responder and
        // extractor degrade to their configuration-error fallbacks instead.
        let chat_api_key = std::env::var("CHAT_API_KEY").unwrap_or_default();

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());

        let vision_api_base = std::env::var("VISION_API_BASE")
            .unwrap_or_else(|_| DEFAULT_VISION_API_BASE.to_string());

        let vision_api_key = std::env::var("VISION_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .unwrap_or_default();

        let vision_model =
            std::env::var("VISION_MODEL").unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string());

        Ok(AppConfig {
            database_url,
            jwt_secret,
            bind_address,
            chat_api_base,
            chat_api_key,
            chat_model,
            vision_api_base,
            vision_api_key,
            vision_model,
        })
    }

    pub fn server_addr(&self) -> Result<std::net::SocketAddr, anyhow::Error> {
        self.bind_address
            .parse()
            .with_context(|| format!("invalid BIND_ADDRESS: {}", self.bind_address))
    }
}
