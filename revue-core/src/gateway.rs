//! Contract with the backend and its HTTP implementation.
//!
//! The paginator, comment cache and hidden-post store only ever see the
//! [`RemoteDataGateway`] trait, so tests can script responses without a
//! network and the transport stays swappable.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::config::BackendConfig;
use crate::error::GatewayError;
use crate::records::{
    CommentLikeRecord, CommentRecord, HiddenPostRecord, PostRecord, ToggleRecord,
};

#[async_trait]
pub trait RemoteDataGateway: Send + Sync {
    async fn get_for_you_feed(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError>;

    async fn get_friends_feed(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError>;

    async fn get_user_posts(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError>;

    async fn get_user_hidden_posts(&self) -> Result<Vec<HiddenPostRecord>, GatewayError>;

    async fn get_post_comments(&self, post_id: &str) -> Result<Vec<CommentRecord>, GatewayError>;

    async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_comment_id: Option<&str>,
    ) -> Result<CommentRecord, GatewayError>;

    async fn toggle_comment_like(&self, comment_id: &str)
        -> Result<CommentLikeRecord, GatewayError>;

    async fn toggle_post_like(&self, post_id: &str) -> Result<ToggleRecord, GatewayError>;

    async fn toggle_bookmark(&self, post_id: &str) -> Result<ToggleRecord, GatewayError>;

    async fn hide_post(&self, post_id: &str) -> Result<(), GatewayError>;

    async fn unhide_post(&self, post_id: &str) -> Result<(), GatewayError>;

    async fn report_post(&self, post_id: &str, reason: &str) -> Result<(), GatewayError>;
}

/// Gateway speaking the backend's PostgREST dialect: `POST /rest/v1/rpc/<fn>`
/// for procedures and `GET /rest/v1/<table>` for plain reads.
#[derive(Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    api_key: String,
    access_token: RwLock<Option<String>>,
}

impl HttpGateway {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("revue-core/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &BackendConfig) -> Result<Self, GatewayError> {
        let mut base_url = Url::parse(&config.url)?;
        // Url::join drops the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            api_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Sets the bearer token of the signed-in viewer. `None` falls back to the anon key.
    pub fn set_access_token(&self, token: Option<String>) {
        match self.access_token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    fn bearer(&self) -> String {
        let token = match self.access_token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        token.unwrap_or_else(|| self.api_key.clone())
    }

    async fn rpc<T: DeserializeOwned>(&self, function: &str, params: Value) -> Result<T, GatewayError> {
        let url = self.base_url.join(&format!("rest/v1/rpc/{function}"))?;
        debug!(%function, "calling rpc");
        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .json(&params)
            .send()
            .await?;
        decode(response).await
    }

    /// Like [`Self::rpc`] for procedures returning `void`; the body is ignored.
    async fn rpc_unit(&self, function: &str, params: Value) -> Result<(), GatewayError> {
        let url = self.base_url.join(&format!("rest/v1/rpc/{function}"))?;
        debug!(%function, "calling rpc");
        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .json(&params)
            .send()
            .await?;
        check_status(response).await.map(drop)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
    ) -> Result<T, GatewayError> {
        let mut url = self.base_url.join(&format!("rest/v1/{table}"))?;
        url.query_pairs_mut().append_pair("select", columns);
        debug!(%table, "selecting rows");
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .send()
            .await?;
        decode(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl RemoteDataGateway for HttpGateway {
    async fn get_for_you_feed(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError> {
        self.rpc(
            "get_for_you_feed",
            json!({ "p_limit": limit, "p_offset": offset }),
        )
        .await
    }

    async fn get_friends_feed(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError> {
        self.rpc(
            "get_friends_feed",
            json!({ "p_limit": limit, "p_offset": offset }),
        )
        .await
    }

    async fn get_user_posts(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>, GatewayError> {
        self.rpc(
            "get_user_posts",
            json!({ "p_user_id": user_id, "p_limit": limit, "p_offset": offset }),
        )
        .await
    }

    async fn get_user_hidden_posts(&self) -> Result<Vec<HiddenPostRecord>, GatewayError> {
        self.select("hidden_posts", "post_id,reason,report_reason,created_at")
            .await
    }

    async fn get_post_comments(&self, post_id: &str) -> Result<Vec<CommentRecord>, GatewayError> {
        self.rpc("get_post_comments", json!({ "p_post_id": post_id }))
            .await
    }

    async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_comment_id: Option<&str>,
    ) -> Result<CommentRecord, GatewayError> {
        self.rpc(
            "create_comment",
            json!({
                "p_post_id": post_id,
                "p_content": content,
                "p_parent_comment_id": parent_comment_id,
            }),
        )
        .await
    }

    async fn toggle_comment_like(
        &self,
        comment_id: &str,
    ) -> Result<CommentLikeRecord, GatewayError> {
        self.rpc("toggle_comment_like", json!({ "p_comment_id": comment_id }))
            .await
    }

    async fn toggle_post_like(&self, post_id: &str) -> Result<ToggleRecord, GatewayError> {
        self.rpc("toggle_post_like", json!({ "p_post_id": post_id }))
            .await
    }

    async fn toggle_bookmark(&self, post_id: &str) -> Result<ToggleRecord, GatewayError> {
        self.rpc("toggle_bookmark", json!({ "p_post_id": post_id }))
            .await
    }

    async fn hide_post(&self, post_id: &str) -> Result<(), GatewayError> {
        self.rpc_unit("hide_post", json!({ "p_post_id": post_id }))
            .await
    }

    async fn unhide_post(&self, post_id: &str) -> Result<(), GatewayError> {
        self.rpc_unit("unhide_post", json!({ "p_post_id": post_id }))
            .await
    }

    async fn report_post(&self, post_id: &str, reason: &str) -> Result<(), GatewayError> {
        self.rpc_unit(
            "report_post",
            json!({ "p_post_id": post_id, "p_reason": reason }),
        )
        .await
    }
}
