use crate::modules::api::{ApiClient, ApiRequest};
use crate::modules::credentials::stored_access_token;
use crate::modules::error::ApiError;
use crate::modules::protocol::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, LOGIN_PATH, REGISTER_PATH,
};
use crate::modules::store::{
    KeyValueStore, StoreError, ACCESS_TOKEN_KEY, EMAIL_KEY, NAME_KEY, REFRESH_TOKEN_KEY,
};
use std::sync::Arc;
use tracing::info;

/// Profile data as persisted; missing keys read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    pub access_token: String,
    pub name: String,
    pub email: String,
}

pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn store(&self) -> &dyn KeyValueStore {
        self.api.store().as_ref()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = ApiRequest::post_json(
            LOGIN_PATH,
            &LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            },
        )?;
        let resp: LoginResponse = self.api.send_json(&request).await?;

        self.persist_session(
            resp.name.as_deref(),
            resp.email.as_deref().unwrap_or(email),
            &resp.access_token,
            resp.refresh_token.as_deref(),
        )?;
        info!(has_refresh_token = resp.refresh_token.is_some(), "logged in");
        Ok(resp)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, ApiError> {
        let request = ApiRequest::post_json(
            REGISTER_PATH,
            &RegisterRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
        )?;
        let resp: RegisterResponse = self.api.send_json(&request).await?;

        self.persist_session(
            Some(resp.display_name().unwrap_or(name)),
            &resp.email,
            &resp.access_token,
            resp.refresh_token.as_deref(),
        )?;
        info!("registered new account");
        Ok(resp)
    }

    fn persist_session(
        &self,
        name: Option<&str>,
        email: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let store = self.store();
        if let Some(name) = name {
            store.set(NAME_KEY, name)?;
        }
        store.set(EMAIL_KEY, email)?;
        store.set(ACCESS_TOKEN_KEY, access_token)?;
        if let Some(rt) = refresh_token.filter(|t| !t.is_empty()) {
            store.set(REFRESH_TOKEN_KEY, rt)?;
        }
        Ok(())
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        self.store().clear()?;
        info!("logged out");
        Ok(())
    }

    /// True when a non-empty access token is stored. The token is not validated
    /// locally; the server is the only judge of expiry.
    pub fn is_logged_in(&self) -> Result<bool, StoreError> {
        Ok(self.access_token()?.is_some())
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        stored_access_token(self.store())
    }

    pub fn user_data(&self) -> Result<UserData, StoreError> {
        let store = self.store();
        Ok(UserData {
            access_token: store.get(ACCESS_TOKEN_KEY)?.unwrap_or_default(),
            name: store.get(NAME_KEY)?.unwrap_or_default(),
            email: store.get(EMAIL_KEY)?.unwrap_or_default(),
        })
    }
}
