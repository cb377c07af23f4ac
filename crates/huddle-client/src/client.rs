use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use huddle_types::api::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest, SendMessageRequest};
use huddle_types::models::{Group, Message, User};

use crate::error::ClientError;

/// A signed-in user and the bearer token that proves it.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// HTTP client for the chat API. Holds at most one session; protected calls
/// fail with [`ClientError::Unauthorized`] when there is none.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    session: Option<Session>,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        }
    }

    /// Pick up a session persisted from an earlier run.
    pub fn resume(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            session: Some(session),
            ..Self::new(base_url)
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("Session for {} ended", session.user.username);
        }
    }

    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> Result<&Session, ClientError> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = send(self.http.post(self.url("/api/auth/register")).json(&body)).await?;
        Ok(self.start_session(auth))
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = send(self.http.post(self.url("/api/auth/login")).json(&body)).await?;
        Ok(self.start_session(auth))
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        send(self.authorized(self.http.get(self.url("/api/auth/me")))?).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ClientError> {
        send(self.http.get(self.url("/api/groups"))).await
    }

    /// `None` when the group does not exist.
    pub async fn group(&self, group_id: i64) -> Result<Option<Group>, ClientError> {
        send(self.http.get(self.url(&format!("/api/groups/{group_id}")))).await
    }

    pub async fn messages(&self, group_id: i64) -> Result<Vec<Message>, ClientError> {
        send(self.http.get(self.url(&format!("/api/groups/{group_id}/messages")))).await
    }

    pub async fn post_message(&self, group_id: i64, text: &str) -> Result<Message, ClientError> {
        let body = SendMessageRequest {
            message: text.to_string(),
        };
        let req = self.http.post(self.url(&format!("/api/groups/{group_id}/messages"))).json(&body);
        send(self.authorized(req)?).await
    }

    fn start_session(&mut self, auth: AuthResponse) -> &Session {
        debug!("Signed in as {}", auth.user.username);
        self.session.insert(Session {
            token: auth.token,
            user: auth.user,
        })
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| ClientError::Unauthorized("Not signed in".into()))?;
        Ok(req.bearer_auth(&session.token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
    let res = req.send().await?;
    if res.status().is_success() {
        return Ok(res.json().await?);
    }
    Err(error_from(res).await)
}

async fn error_from(res: Response) -> ClientError {
    let status = res.status();
    let message = match res.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("Request failed").to_string(),
    };

    if status == StatusCode::UNAUTHORIZED {
        ClientError::Unauthorized(message)
    } else {
        ClientError::Api { status, message }
    }
}
