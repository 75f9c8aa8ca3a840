use {
    crate::domain::error::PipelineError,
    secrecy::SecretString,
    std::{env, net::SocketAddr, str::FromStr, time::Duration},
    url::Url,
};

const DEFAULT_FORM_URL: &str = "https://rc-epay.esewa.com.np/api/epay/main/v2/form";

/// Gateway credentials and endpoints. Passed explicitly to everything that
/// signs, verifies or builds gateway forms.
#[derive(Debug, Clone)]
pub struct EsewaConfig {
    pub secret_key: SecretString,
    pub product_code: String,
    pub form_url: Url,
    /// Reject callbacks that carry no `signature` field at all.
    pub require_signature: bool,
}

impl EsewaConfig {
    pub fn new(secret_key: impl Into<String>, product_code: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::from(secret_key.into()),
            product_code: product_code.into(),
            form_url: Url::parse(DEFAULT_FORM_URL).expect("default form url is valid"),
            require_signature: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Public origin used for gateway return URLs and browser redirects.
    pub app_base_url: Url,
    pub request_timeout: Duration,
    pub esewa: EsewaConfig,
    pub identity_webhook_secret: Option<SecretString>,
}

impl Settings {
    pub fn from_env() -> Result<Self, PipelineError> {
        let database_url = required("DATABASE_URL")?;
        let bind_addr = parsed("BIND_ADDR", "0.0.0.0:3000")?;
        let app_base_url = url_var("APP_BASE_URL", "http://localhost:3000")?;
        if app_base_url.cannot_be_a_base() {
            return Err(PipelineError::Config(format!(
                "APP_BASE_URL must be an http(s) url, got: {app_base_url}"
            )));
        }
        let request_timeout = Duration::from_secs(parsed("REQUEST_TIMEOUT_SECS", "10")?);

        let esewa = EsewaConfig {
            secret_key: SecretString::from(required("ESEWA_SECRET_KEY")?),
            product_code: optional("ESEWA_PRODUCT_CODE").unwrap_or_else(|| "EPAYTEST".into()),
            form_url: url_var("ESEWA_FORM_URL", DEFAULT_FORM_URL)?,
            require_signature: parsed("ESEWA_REQUIRE_SIGNATURE", "true")?,
        };

        let identity_webhook_secret = optional("IDENTITY_WEBHOOK_SECRET").map(SecretString::from);

        Ok(Self {
            database_url,
            bind_addr,
            app_base_url,
            request_timeout,
            esewa,
            identity_webhook_secret,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, PipelineError> {
    optional(key).ok_or_else(|| PipelineError::Config(format!("{key} must be set")))
}

fn parsed<T: FromStr>(key: &str, default: &str) -> Result<T, PipelineError> {
    let raw = optional(key).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|_| PipelineError::Config(format!("{key} has an invalid value: {raw}")))
}

fn url_var(key: &str, default: &str) -> Result<Url, PipelineError> {
    let raw = optional(key).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| PipelineError::Config(format!("{key} is not a valid url: {e}")))
}

/// `path` under `base`, keeping any path prefix the base carries, so the app
/// can be mounted below the site root (`https://host/shop/`).
pub fn app_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
    }
    url
}
