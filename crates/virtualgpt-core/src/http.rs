use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::{redirect, Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::api::{
    ChatBackend, ChatReply, ChatRequest, ConversationTranscript, GuestChatRequest,
    MutationResponse, OutgoingMessage, RenameRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::{ClientVariant, ConversationId, ConversationSummary};

static ITEM_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[a-zA-Z]+\b[^>]*\bclass\s*=\s*"[^"]*\bconversation-item\b[^"]*"[^>]*>"#)
        .expect("conversation item pattern")
});

static DATA_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdata-id\s*=\s*"(\d+)""#).expect("data-id pattern"));

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bclass\s*=\s*"[^"]*\bconversation-title\b[^"]*"[^>]*>([^<]*)<"#)
        .expect("conversation title pattern")
});

static USER_AVATAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bclass\s*=\s*"[^"]*\buser-avatar\b[^"]*"[^>]*>\s*([^<]*?)\s*<"#)
        .expect("user avatar pattern")
});

/// [`ChatBackend`] over the server's JSON endpoints.
///
/// Redirects are not followed: the server answers unauthenticated requests
/// with a redirect to its login page, which is reported instead of parsed.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `session_cookie` is the value of the server's `user_id` remember-me
    /// cookie. Every request is bounded by `timeout`.
    pub fn new(base_url: &str, session_cookie: Option<&str>, timeout: Duration) -> ApiResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let url = Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let jar = Arc::new(Jar::default());
        if let Some(value) = session_cookie {
            jar.add_cookie_str(&format!("user_id={}", value), &url);
        }

        let client = Client::builder()
            .cookie_provider(jar)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange the remember-me cookie for a server session and return the
    /// initial the chat page shows in its user avatar, if any.
    ///
    /// The home page redirects to the chat page when the cookie names a
    /// known user and renders the landing page otherwise.
    pub async fn open_session(&self) -> ApiResult<Option<String>> {
        let response = self.client.get(self.url("/")).send().await?;
        if !response.status().is_redirection() {
            return Err(ApiError::Rejected(
                "No hay una sesión válida. Inicia sesión en el navegador y configura la cookie user_id."
                    .to_string(),
            ));
        }
        log::info!("session opened against {}", self.base_url);

        let page = self.chat_page().await?;
        Ok(parse_user_initial(&page))
    }

    /// `GET /chat`, the page the conversation list is rendered into.
    async fn chat_page(&self) -> ApiResult<String> {
        let response = self.client.get(self.url("/chat")).send().await?;
        let status = response.status();

        if status.is_redirection() {
            return Err(ApiError::Rejected("La sesión ha expirado".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(response.text().await?)
    }
}

async fn expect_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Edit/delete answer with a JSON body even on 4xx, so the body is
/// consulted before the status.
async fn expect_mutation(response: Response) -> ApiResult<Option<String>> {
    let status = response.status();
    let text = response.text().await?;
    match serde_json::from_str::<MutationResponse>(&text) {
        Ok(body) => body.into_result(),
        Err(_) if !status.is_success() => Err(ApiError::Status { status, body: text }),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<ChatReply> {
        let request = match message.variant {
            ClientVariant::Authenticated => self.client.post(self.url("/chat")).json(&ChatRequest {
                message: &message.text,
                conversation_id: message.conversation_id,
            }),
            ClientVariant::Guest => self
                .client
                .post(self.url("/guest_chat"))
                .json(&GuestChatRequest { message: &message.text }),
        };

        let response = request.send().await?;
        expect_json(response).await
    }

    async fn conversation_messages(&self, id: ConversationId) -> ApiResult<ConversationTranscript> {
        let response = self
            .client
            .get(self.url(&format!("/conversation/{}/messages", id)))
            .send()
            .await?;
        expect_json(response).await
    }

    async fn rename_conversation(&self, id: ConversationId, title: &str) -> ApiResult<String> {
        let response = self
            .client
            .put(self.url(&format!("/conversation/{}/edit", id)))
            .json(&RenameRequest { title })
            .send()
            .await?;

        let stored = expect_mutation(response).await?;
        Ok(stored.unwrap_or_else(|| title.to_string()))
    }

    async fn delete_conversation(&self, id: ConversationId) -> ApiResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/conversation/{}/delete", id)))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        expect_mutation(response).await.map(|_| ())
    }

    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
        let page = self.chat_page().await?;
        Ok(parse_conversation_list(&page))
    }

    async fn logout(&self) -> ApiResult<()> {
        let response = self.client.get(self.url("/logout")).send().await?;
        let status = response.status();
        if status.is_redirection() || status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

/// Extract `(data-id, title)` pairs from the server-rendered chat page.
///
/// Each `.conversation-item[data-id]` opens a region that runs to the next
/// item; the first `.conversation-title` inside it names the conversation.
/// Items without a numeric `data-id` are skipped.
pub fn parse_conversation_list(page: &str) -> Vec<ConversationSummary> {
    let tags: Vec<_> = ITEM_TAG.find_iter(page).collect();
    let mut conversations = Vec::with_capacity(tags.len());

    for (i, tag) in tags.iter().enumerate() {
        let Some(id) = DATA_ID
            .captures(tag.as_str())
            .and_then(|c| c[1].parse::<ConversationId>().ok())
        else {
            continue;
        };

        let region_end = tags.get(i + 1).map(|next| next.start()).unwrap_or(page.len());
        let region = &page[tag.end()..region_end];
        let title = TITLE
            .captures(region)
            .map(|c| unescape_html(c[1].trim()))
            .unwrap_or_default();

        conversations.push(ConversationSummary { id, title });
    }

    conversations
}

/// Text of the page's `.user-avatar` element, when present and non-blank.
pub fn parse_user_initial(page: &str) -> Option<String> {
    let initial = unescape_html(USER_AVATAR.captures(page)?.get(1)?.as_str().trim());
    (!initial.is_empty()).then_some(initial)
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
