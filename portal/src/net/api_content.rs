//! Calendar events, inboxes, media files, informative videos, mothers,
//! chat messages and push-channel authorization.

use reqwest::Method;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ApiClient, resource_path};
use crate::net::error::ApiError;
use crate::net::push_socket::ChannelAuthorizer;
use crate::net::types::{ApiResponse, CalendarEvent, ChatMessage, Inbox, InformativeVideo, MediaFile, Mother, Page};
use crate::state::table::{ParamStyle, TableQuery};
use crate::validation::files::MediaUpload;
use crate::validation::forms::{EventForm, MessageForm, VideoForm};

pub(crate) const EVENTS: &str = "events";
pub(crate) const INBOXES: &str = "inboxes";
pub(crate) const MEDIA_FILES: &str = "mother-media-files";
pub(crate) const INFORMATIVE_VIDEOS: &str = "informative-videos";
pub(crate) const MOTHERS: &str = "mothers";
pub(crate) const MESSAGES: &str = "messages";

pub(crate) fn event_endpoint(id: i64) -> String {
    resource_path("/api/events", id)
}

pub(crate) fn inbox_endpoint(id: i64) -> String {
    resource_path("/api/inboxes", id)
}

pub(crate) fn media_file_endpoint(id: i64) -> String {
    resource_path("/api/media-files", id)
}

pub(crate) fn video_endpoint(id: i64) -> String {
    resource_path("/api/informative-videos", id)
}

pub(crate) fn messages_endpoint(recipient_id: i64) -> String {
    resource_path("/api/messages", recipient_id)
}

/// Bare list or `{ "data": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

impl ApiClient {
    // =========================================================================
    // CALENDAR
    // =========================================================================

    pub async fn events(&self) -> Result<Vec<CalendarEvent>, ApiError> {
        let body: ListBody<CalendarEvent> = self.cached_get(EVENTS, "/api/events", &[]).await?;
        Ok(body.into_vec())
    }

    /// Create when `id` is `None`, patch otherwise.
    pub async fn save_event(&self, id: Option<i64>, form: &EventForm) -> Result<ApiResponse, ApiError> {
        match id {
            Some(id) => self.mutate(Method::PATCH, &event_endpoint(id), Some(form), &[EVENTS]).await,
            None => self.mutate(Method::POST, "/api/events", Some(form), &[EVENTS]).await,
        }
    }

    // =========================================================================
    // INBOX
    // =========================================================================

    pub async fn inboxes(&self, query: &TableQuery) -> Result<Page<Inbox>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(INBOXES, "/api/inboxes", &params).await
    }

    pub async fn delete_inbox(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.mutate::<(), _>(Method::DELETE, &inbox_endpoint(id), None, &[INBOXES]).await
    }

    // =========================================================================
    // MEDIA FILES
    // =========================================================================

    pub async fn media_files(&self, query: &TableQuery) -> Result<Page<MediaFile>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(MEDIA_FILES, "/api/mothers/media-files", &params).await
    }

    /// Upload one or more documents as `files[]`.
    pub async fn upload_media_files(&self, upload: &MediaUpload) -> Result<ApiResponse, ApiError> {
        let mut form = Form::new();
        for file in &upload.files {
            form = form.part("files[]", super::file_part(file)?);
        }
        self.upload("/api/mothers/upload-media-files", form, &[MEDIA_FILES]).await
    }

    pub async fn delete_media_file(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.mutate::<(), _>(Method::DELETE, &media_file_endpoint(id), None, &[MEDIA_FILES])
            .await
    }

    // =========================================================================
    // INFORMATIVE VIDEOS
    // =========================================================================

    pub async fn informative_videos(&self, query: &TableQuery) -> Result<Page<InformativeVideo>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(INFORMATIVE_VIDEOS, "/api/informative-videos", &params).await
    }

    /// Videos published to mothers (unpaginated).
    pub async fn mother_videos(&self) -> Result<Vec<InformativeVideo>, ApiError> {
        let body: ListBody<InformativeVideo> = self
            .cached_get(INFORMATIVE_VIDEOS, "/api/mothers/informative-videos", &[])
            .await?;
        Ok(body.into_vec())
    }

    pub async fn save_video(&self, id: Option<i64>, form: &VideoForm) -> Result<ApiResponse, ApiError> {
        match id {
            Some(id) => {
                self.mutate(Method::PATCH, &video_endpoint(id), Some(form), &[INFORMATIVE_VIDEOS])
                    .await
            }
            None => {
                self.mutate(Method::POST, "/api/informative-videos", Some(form), &[INFORMATIVE_VIDEOS])
                    .await
            }
        }
    }

    pub async fn delete_video(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.mutate::<(), _>(Method::DELETE, &video_endpoint(id), None, &[INFORMATIVE_VIDEOS])
            .await
    }

    // =========================================================================
    // MOTHERS
    // =========================================================================

    pub async fn mothers(&self, query: &TableQuery) -> Result<Page<Mother>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(MOTHERS, "/api/mothers", &params).await
    }

    // =========================================================================
    // CHAT
    // =========================================================================

    /// Conversation between the signed-in user and `recipient_id`.
    pub async fn messages(&self, recipient_id: i64) -> Result<Vec<ChatMessage>, ApiError> {
        let body: ListBody<ChatMessage> = self
            .cached_get(MESSAGES, &messages_endpoint(recipient_id), &[])
            .await?;
        Ok(body.into_vec())
    }

    /// Drop cached conversations so the next read refetches.
    pub fn invalidate_messages(&self) {
        self.invalidate(MESSAGES);
    }

    pub async fn send_message(&self, recipient_id: i64, form: &MessageForm) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::POST, &messages_endpoint(recipient_id), Some(form), &[MESSAGES])
            .await
    }

    /// Ask the backend to sign a private-channel subscription for a socket.
    pub async fn authorize_channel(&self, socket_id: &str, channel_name: &str) -> Result<Value, ApiError> {
        let body = json!({ "socket_id": socket_id, "channel_name": channel_name });
        let (_, text) = self
            .send(self.request(Method::POST, "/api/broadcasting/auth").json(&body))
            .await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait::async_trait]
impl ChannelAuthorizer for ApiClient {
    async fn authorize(&self, socket_id: &str, channel: &str) -> Result<Value, ApiError> {
        self.authorize_channel(socket_id, channel).await
    }
}
