//! User queries.

use async_trait::async_trait;
use errand::{HandlerModule, HandlerResult, Registrar, Request, RequestHandler};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

const USERS: [&str; 3] = ["Alice", "Bob", "Charlie"];

/// Lists every user name.
#[derive(Debug, Request)]
#[request(response = Vec<String>)]
pub struct GetUserQuery;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: usize,
    pub name: String,
}

/// Looks up one user by id.
#[derive(Debug, Request)]
#[request(response = User)]
pub struct GetUserById {
    pub id: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("no user with id {0}")]
pub struct UserNotFound(pub usize);

pub struct GetUserQueryHandler;

#[async_trait]
impl RequestHandler<GetUserQuery> for GetUserQueryHandler {
    async fn handle(
        &self,
        _request: &GetUserQuery,
        _cancel: &CancellationToken,
    ) -> HandlerResult<Vec<String>> {
        Ok(USERS.iter().map(|name| name.to_string()).collect())
    }
}

pub struct GetUserByIdHandler;

#[async_trait]
impl RequestHandler<GetUserById> for GetUserByIdHandler {
    async fn handle(
        &self,
        request: &GetUserById,
        _cancel: &CancellationToken,
    ) -> HandlerResult<User> {
        let name = USERS.get(request.id).ok_or(UserNotFound(request.id))?;
        Ok(User {
            id: request.id,
            name: name.to_string(),
        })
    }
}

/// Registers the user query handlers.
pub struct UsersModule;

impl HandlerModule for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    fn register(&self, registrar: &mut Registrar<'_>) {
        registrar
            .handler::<GetUserQuery, _>(|| GetUserQueryHandler)
            .handler::<GetUserById, _>(|| GetUserByIdHandler);
    }
}
