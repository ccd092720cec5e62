//! Typed Microsoft Graph client.

use std::sync::Arc;

use reqwest::Method;
use tracing::{info, instrument};

use crate::adapter::GraphRequestAdapter;
use crate::models::{CreatedUser, UserDraft};
use crate::OnboardResult;

/// Typed entry point to the Graph resources this tool uses.
#[derive(Debug, Clone)]
pub struct GraphServiceClient {
    adapter: Arc<GraphRequestAdapter>,
}

impl GraphServiceClient {
    #[must_use]
    pub fn new(adapter: GraphRequestAdapter) -> Self {
        Self {
            adapter: Arc::new(adapter),
        }
    }

    /// The underlying request adapter.
    #[must_use]
    pub fn adapter(&self) -> &GraphRequestAdapter {
        &self.adapter
    }

    /// Requests against the `/users` collection.
    #[must_use]
    pub fn users(&self) -> UsersRequestBuilder<'_> {
        UsersRequestBuilder {
            adapter: &self.adapter,
        }
    }
}

/// Builder for `/users` requests.
#[derive(Debug)]
pub struct UsersRequestBuilder<'a> {
    adapter: &'a GraphRequestAdapter,
}

impl UsersRequestBuilder<'_> {
    /// Creates a user. The request is sent once and never retried.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error unchanged, including `OnboardError::GraphApi`
    /// when the directory rejects the user (e.g. a duplicate nickname).
    #[instrument(skip(self, user), fields(upn = %user.user_principal_name()))]
    pub async fn post(&self, user: UserDraft) -> OnboardResult<CreatedUser> {
        let created: CreatedUser = self
            .adapter
            .send_json(Method::POST, "users", Some(&user))
            .await?;

        info!("User created with ID: {}", created.id);

        Ok(created)
    }
}
