use crate::error::{AppError, AppResult};
use crate::external::MailerService;
use crate::models::*;
use crate::utils::password::{hash_password, validate_password, verify_password};
use crate::utils::receipt::password_token;
use crate::utils::JwtService;
use chrono::{Duration, Utc};
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

const SET_PASSWORD_TOKEN_TTL_HOURS: i64 = 72;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    jwt_service: JwtService,
    mailer: MailerService,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_service: JwtService, mailer: MailerService) -> Self {
        Self {
            pool,
            jwt_service,
            mailer,
        }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let account = self
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

        let hash = account.password_hash.as_deref().ok_or_else(|| {
            AppError::AuthError("Password not set; use the link from your email".to_string())
        })?;

        if !verify_password(&request.password, hash)? {
            return Err(AppError::AuthError("Invalid email or password".to_string()));
        }

        self.issue_tokens(account)
    }

    pub async fn refresh(&self, request: RefreshRequest) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(&request.refresh_token)?;
        let account_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let account = self
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::AuthError("Account no longer exists".to_string()))?;

        self.issue_tokens(account)
    }

    /// Completes the emailed set-password link. Single use: the token is
    /// cleared on success.
    pub async fn set_password(&self, request: SetPasswordRequest) -> AppResult<AccountResponse> {
        validate_password(&request.password)?;

        let account = self
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::ValidationError("Invalid or expired token".to_string()))?;

        let token_matches = account.set_password_token.as_deref() == Some(request.token.as_str());
        let token_fresh = account
            .set_password_expires_at
            .map(|exp| exp > Utc::now())
            .unwrap_or(false);
        if !token_matches || !token_fresh {
            return Err(AppError::ValidationError(
                "Invalid or expired token".to_string(),
            ));
        }

        let hash = hash_password(&request.password)?;
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET password_hash = $2, set_password_token = NULL,
                set_password_expires_at = NULL, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await?;

        log::info!("Password set for account {}", account.id);
        Ok(AccountResponse::from(account))
    }

    /// Find-or-create the parent account behind a public demo booking. New
    /// accounts get a set-password email, sent off the request path.
    pub async fn ensure_parent_account(&self, email: &str, name: &str) -> AppResult<Account> {
        validate_email(email)?;

        if let Some(existing) = self.find_by_email(email).await? {
            return Ok(existing);
        }

        let account = self
            .create_account_with_token(email, name, AccountRole::Parent)
            .await?;
        self.send_set_password_email(&account, "parent");
        Ok(account)
    }

    /// Admin-created coach account; same set-password flow as parents.
    pub async fn create_coach(&self, request: CreateCoachRequest) -> AppResult<AccountResponse> {
        validate_email(&request.email)?;

        let account = self
            .create_account_with_token(&request.email, &request.name, AccountRole::Coach)
            .await?;
        self.send_set_password_email(&account, "coach");
        Ok(AccountResponse::from(account))
    }

    pub async fn list_coaches(&self) -> AppResult<Vec<AccountResponse>> {
        let coaches = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE role = 'COACH' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(coaches.into_iter().map(AccountResponse::from).collect())
    }

    pub async fn find_by_id(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn create_account_with_token(
        &self,
        email: &str,
        name: &str,
        role: AccountRole,
    ) -> AppResult<Account> {
        let token = password_token();
        let expires_at = Utc::now() + Duration::hours(SET_PASSWORD_TOKEN_TTL_HOURS);

        let result = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (email, name, role, set_password_token, set_password_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(role)
        .bind(&token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(account) => Ok(account),
            Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some("accounts_email_key") => {
                Err(AppError::ValidationError(
                    "Email is already registered".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn send_set_password_email(&self, account: &Account, role_label: &str) {
        let token = match account.set_password_token.as_deref() {
            Some(t) => t.to_string(),
            None => return,
        };
        let mailer = self.mailer.clone();
        let email = account.email.clone();
        let role_label = role_label.to_string();
        tokio::spawn(async move {
            let link = mailer.set_password_link(&email, &token);
            if let Err(e) = mailer
                .send_set_password_email(&email, &link, &role_label)
                .await
            {
                log::error!("Failed to send set-password email to {email}: {e:?}");
            }
        });
    }

    fn issue_tokens(&self, account: Account) -> AppResult<AuthResponse> {
        let access_token = self
            .jwt_service
            .generate_access_token(account.id, account.role.as_str())?;
        let refresh_token = self
            .jwt_service
            .generate_refresh_token(account.id, account.role.as_str())?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
            account: AccountResponse::from(account),
        })
    }
}

pub(crate) fn validate_email(email: &str) -> AppResult<()> {
    let re = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .map_err(|e| AppError::InternalError(format!("email pattern: {e}")))?;

    if re.is_match(email) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "Invalid email address: {email}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("parent@example.com").is_ok());
        assert!(validate_email("a.b+tag@sub.domain.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("missing@tld").is_err());
        assert!(validate_email("").is_err());
    }
}
