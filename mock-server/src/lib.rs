//! In-memory backend that follows the error-header convention, used to
//! exercise the request builder over real HTTP.
//!
//! Routes, all under `/v1`:
//! - `/users` and `/users/{id}`: a small CRUD resource.
//! - `/echo`: reflects method, raw query, headers and body for any verb.
//! - `/locked`: answers 200 with `ERROR: true` and an error envelope.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ERROR_HEADER: &str = "ERROR";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Error envelope sent in the body of every failed response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct UserFilter {
    pub name: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    let v1 = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user)
                .put(replace_user)
                .patch(patch_user)
                .delete(delete_user),
        )
        .route("/echo", any(echo))
        .route("/locked", get(locked))
        .with_state(db);
    Router::new().nest("/v1", v1)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            code: "NOT_FOUND".to_string(),
            message: format!("user {id} does not exist"),
        }),
    )
        .into_response()
}

async fn list_users(State(db): State<Db>, Query(filter): Query<UserFilter>) -> Json<Vec<User>> {
    let users = db.read().await;
    let mut found: Vec<User> = users
        .values()
        .filter(|u| filter.name.as_ref().map_or(true, |name| &u.name == name))
        .cloned()
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Json(found)
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> (StatusCode, Json<User>) {
    let user = User {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
    };
    db.write().await.insert(user.id, user.clone());
    log::debug!("created user {}", user.id);
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Response {
    let users = db.read().await;
    match users.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found(id),
    }
}

async fn replace_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateUser>,
) -> Response {
    let mut users = db.write().await;
    match users.get_mut(&id) {
        Some(user) => {
            user.name = input.name;
            user.email = input.email;
            Json(user.clone()).into_response()
        }
        None => not_found(id),
    }
}

async fn patch_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<PatchUser>,
) -> Response {
    let mut users = db.write().await;
    let Some(user) = users.get_mut(&id) else {
        return not_found(id);
    };
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = Some(email);
    }
    Json(user.clone()).into_response()
}

async fn delete_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Response {
    let mut users = db.write().await;
    match users.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(id),
    }
}

async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Json<serde_json::Value> {
    let mut echoed: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in &headers {
        echoed
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().unwrap_or_default().to_string());
    }
    Json(serde_json::json!({
        "method": method.as_str(),
        "query": query,
        "headers": echoed,
        "body": body,
    }))
}

async fn locked() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            HeaderName::from_static("error"),
            HeaderValue::from_static("true"),
        )],
        Json(ApiError {
            code: "USER_LOCKED".to_string(),
            message: "the account is locked".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: Uuid::nil(),
            name: "Ana".to_string(),
            email: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Ana");
        assert!(json["email"].is_null());
    }

    #[test]
    fn create_user_email_is_optional() {
        let input: CreateUser = serde_json::from_str(r#"{"name":"No email"}"#).unwrap();
        assert_eq!(input.name, "No email");
        assert!(input.email.is_none());
    }

    #[test]
    fn create_user_rejects_missing_name() {
        let result: Result<CreateUser, _> = serde_json::from_str(r#"{"email":"a@b.c"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn patch_user_all_fields_optional() {
        let input: PatchUser = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.email.is_none());
    }

    #[test]
    fn error_header_name_matches_convention() {
        // Header names are case-insensitive on the wire; axum lowercases them.
        assert!(ERROR_HEADER.eq_ignore_ascii_case(HeaderName::from_static("error").as_str()));
    }
}
