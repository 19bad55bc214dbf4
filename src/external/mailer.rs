use crate::config::MailerConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
}

#[derive(Clone)]
pub struct MailerService {
    client: Client,
    config: MailerConfig,
}

impl MailerService {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn set_password_link(&self, email: &str, token: &str) -> String {
        format!(
            "{}/set-password?email={}&token={}",
            self.config.dashboard_url, email, token
        )
    }

    /// Callers treat this as fire-and-forget and spawn it off the request path.
    pub async fn send_set_password_email(
        &self,
        address: &str,
        link: &str,
        role_label: &str,
    ) -> AppResult<()> {
        if self.config.api_key.is_empty() {
            log::warn!("Mailer not configured, skipping set-password email to {address}");
            return Ok(());
        }

        let url = format!("{}/emails", self.config.base_url);
        let body = SendEmailRequest {
            from: &self.config.from_address,
            to: vec![address],
            subject: format!("Set up your {role_label} account"),
            html: format!(
                "<p>Welcome! Your {role_label} account has been created.</p>\
                 <p><a href=\"{link}\">Set your password</a> to sign in to the dashboard.</p>"
            ),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Sent set-password email to {address}");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Failed to send email: {error_text}"
            )))
        }
    }
}
