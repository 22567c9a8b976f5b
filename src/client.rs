use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::Zeroize;

use crate::error::{ChatError, Result};
use crate::models::*;

pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ChatClient {
    pub fn new(base_url: &str, access_token: Option<String>) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            access_token,
        }
    }

    /// Create an independent copy for background tasks (token is cloned, zeroized on drop)
    pub fn clone_for_background(&self) -> Self {
        Self {
            client: self.client.clone(), // cheap: reqwest::Client is Arc internally
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "request");
        let builder = self.client.request(method, url);
        match self.access_token {
            Some(ref token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Sends and fails on any non-2xx status, or on a 2xx other than `expected`.
    async fn send(&self, builder: RequestBuilder, expected: Option<StatusCode>) -> Result<Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Request { status, body });
        }
        if let Some(expected) = expected {
            if status != expected {
                return Err(ChatError::Request {
                    status,
                    body: format!("expected {}", expected),
                });
            }
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        expected: Option<StatusCode>,
    ) -> Result<T> {
        let resp = self.send(builder, expected).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let builder = self.request(Method::GET, path).query(query);
        self.send_json(builder, None).await
    }

    fn file_part(attachment: &Attachment) -> Part {
        Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone())
    }

    // ---- Rooms ----

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.get("rooms/", &[]).await
    }

    pub async fn create_room(&self, room: &NewRoom) -> Result<Room> {
        let builder = self.request(Method::POST, "rooms/").json(room);
        self.send_json(builder, Some(StatusCode::CREATED)).await
    }

    pub async fn update_room(&self, room_id: RoomId, patch: &RoomPatch) -> Result<Room> {
        let builder = self
            .request(Method::PATCH, &format!("rooms/{}/", room_id))
            .json(patch);
        self.send_json(builder, None).await
    }

    pub async fn delete_room(&self, room_id: RoomId) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("rooms/{}/", room_id));
        self.send(builder, Some(StatusCode::NO_CONTENT)).await?;
        Ok(())
    }

    // ---- Messages ----

    pub async fn list_messages(&self, room_id: RoomId) -> Result<Vec<Message>> {
        self.get("messages/", &[("roomId", room_id.to_string())])
            .await
    }

    pub async fn send_message(&self, outgoing: &OutgoingMessage) -> Result<Message> {
        let mut form = Form::new()
            .text("content", outgoing.content.clone())
            .text("room", outgoing.room.to_string())
            .text("sender", outgoing.sender.to_string());
        if let Some(ref file) = outgoing.file {
            form = form.part("file", Self::file_part(file));
        }
        let builder = self.request(Method::POST, "messages/").multipart(form);
        self.send_json(builder, Some(StatusCode::CREATED)).await
    }

    // ---- Users ----

    pub async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        self.get("users/", &[("search", query.to_string())]).await
    }

    pub async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.get("users/", &[("ids", joined)]).await
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User> {
        self.get(&format!("users/{}/", user_id), &[]).await
    }

    pub async fn update_user(
        &self,
        user_id: UserId,
        username: &str,
        avatar: Option<&Attachment>,
    ) -> Result<()> {
        let mut form = Form::new().text("username", username.to_string());
        if let Some(avatar) = avatar {
            form = form.part("avatar", Self::file_part(avatar));
        }
        let builder = self
            .request(Method::PATCH, &format!("users/{}/", user_id))
            .multipart(form);
        self.send(builder, None).await?;
        Ok(())
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        avatar: Option<&Attachment>,
    ) -> Result<User> {
        let mut form = Form::new()
            .text("username", username.to_string())
            .text("email", email.to_string())
            .text("password", password.to_string());
        if let Some(avatar) = avatar {
            form = form.part("avatar", Self::file_part(avatar));
        }
        let builder = self.request(Method::POST, "register/").multipart(form);
        self.send_json(builder, None).await
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        if let Some(ref mut token) = self.access_token {
            token.zeroize();
        }
    }
}
