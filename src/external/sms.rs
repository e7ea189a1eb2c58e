use crate::config::SmsConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;

const DEFAULT_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Delivers verification codes over SMS. Without credentials the service
/// runs in log-only mode, which is what local development uses.
#[derive(Clone)]
pub struct SmsService {
    client: Client,
    config: SmsConfig,
    api_base: String,
}

impl SmsService {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.config.account_sid.is_empty()
    }

    pub async fn send_verification_code(&self, phone: &str, code: &str) -> AppResult<()> {
        let body = verification_message(code);

        if !self.is_configured() {
            log::info!("SMS provider not configured, code for {phone}: {code}");
            return Ok(());
        }

        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.config.account_sid
        );

        let params = [
            ("To", phone),
            ("From", self.config.from_phone.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Verification code SMS sent: {phone}");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Verification code SMS failed: {phone}, error: {error_text}");
            Err(AppError::ExternalApiError(format!(
                "SMS sending failed: {error_text}"
            )))
        }
    }
}

fn verification_message(code: &str) -> String {
    format!("Your verification code is {code}. It is valid for 5 minutes.")
}
