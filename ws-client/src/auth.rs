use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

impl UserCredentials {
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split(':').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid credentials format. Expected email:password");
        }
        Ok(Self {
            email: parts[0].to_string(),
            password: parts[1].to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub session_cookie: String,
}

impl AuthenticatedUser {
    /// Value of the Cookie header both the API and the WebSocket handshake
    /// expect.
    pub fn cookie_header(&self) -> String {
        format!("id={}", self.session_cookie)
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: LoginData,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    id: String,
}

pub async fn login(
    client: &Client,
    base_url: &str,
    credentials: &UserCredentials,
) -> Result<AuthenticatedUser> {
    let url = format!("{}/login", base_url);

    let response = client
        .post(&url)
        .form(&[
            ("email", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
        ])
        .send()
        .await
        .context("Failed to send login request")?;

    if !response.status().is_success() {
        anyhow::bail!("Login failed: {}", response.status());
    }

    // The session layer sets the `id` cookie on successful login.
    let session_cookie = response
        .cookies()
        .find(|cookie| cookie.name() == "id")
        .context("No session cookie in response")?
        .value()
        .to_string();

    let login_response: LoginResponse = response
        .json()
        .await
        .context("Failed to parse login response")?;

    Ok(AuthenticatedUser {
        user_id: login_response.data.id,
        session_cookie,
    })
}
