/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Accounts, tokens, password reset and the caller's memberships
/// - `groups`: Group CRUD and the games of a group
/// - `games`: Game CRUD
/// - `membership`: Join requests and members, shared by groups and games
///
/// Every successful body carries `"success": true`; the shapes below are
/// shared by all handlers.

pub mod auth;
pub mod games;
pub mod groups;
pub mod health;
pub mod membership;

use axum::Json;
use huddle_shared::models::Paginated;
use serde::{Deserialize, Serialize};

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

/// `{"success": true, "count": n, "data": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

/// A list page with links to its neighbours
#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub success: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

/// `{"success": true, "token": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

pub fn data<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse {
        success: true,
        data,
    })
}

pub fn list<T: Serialize>(items: Vec<T>) -> Json<ListResponse<T>> {
    Json(ListResponse {
        success: true,
        count: items.len(),
        data: items,
    })
}

pub fn page<T: Serialize>(result: Paginated<T>) -> Json<PageResponse<T>> {
    let link = |page| PageLink {
        page,
        limit: result.limit,
    };

    let pagination = Pagination {
        page: result.page,
        limit: result.limit,
        total: result.total,
        next: result.has_next().then(|| link(result.page + 1)),
        prev: result.has_prev().then(|| link(result.page - 1)),
    };

    Json(PageResponse {
        success: true,
        count: result.items.len(),
        pagination,
        data: result.items,
    })
}

pub fn token(token: String) -> Json<TokenResponse> {
    Json(TokenResponse {
        success: true,
        token,
    })
}
