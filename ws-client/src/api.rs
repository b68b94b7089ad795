use crate::auth::AuthenticatedUser;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

const API_VERSION: &str = "0.1.0";

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn post(&self, user: &AuthenticatedUser, path: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Cookie", user.cookie_header())
            .header("x-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed to send"))?;

        if !response.status().is_success() {
            anyhow::bail!("POST {path} returned {}", response.status());
        }

        let envelope: Value = response
            .json()
            .await
            .with_context(|| format!("POST {path} returned non-JSON"))?;
        envelope
            .get("data")
            .cloned()
            .with_context(|| format!("POST {path} response had no data"))
    }

    pub async fn create_subtable(&self, user: &AuthenticatedUser, name: &str) -> Result<Value> {
        self.post(
            user,
            "/subtables",
            json!({"name": name, "description": "ws-test-client scenario data"}),
        )
        .await
    }

    pub async fn create_post(
        &self,
        user: &AuthenticatedUser,
        subtable_id: &str,
        title: &str,
    ) -> Result<Value> {
        self.post(
            user,
            "/posts",
            json!({
                "subtable_id": subtable_id,
                "title": title,
                "body": "posted by the ws-test-client"
            }),
        )
        .await
    }

    pub async fn create_comment(
        &self,
        user: &AuthenticatedUser,
        post_id: &str,
        body: &str,
    ) -> Result<Value> {
        self.post(
            user,
            "/comments",
            json!({"post_id": post_id, "parent_comment_id": null, "body": body}),
        )
        .await
    }

    pub async fn send_message(
        &self,
        user: &AuthenticatedUser,
        recipient_id: &str,
        body: &str,
    ) -> Result<Value> {
        self.post(
            user,
            "/messages",
            json!({"recipient_id": recipient_id, "body": body}),
        )
        .await
    }
}
