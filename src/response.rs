//! Standard response envelope helpers: `{ "data": ..., "meta": ... }`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
    /// Rows matching the query across all pages, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

fn many<T: Serialize>(status: StatusCode, data: Vec<T>, total: Option<i64>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        status,
        Json(SuccessMany {
            data,
            meta: MetaCount { count, total },
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    many(StatusCode::OK, data, None)
}

pub fn success_many_created<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    many(StatusCode::CREATED, data, None)
}

pub fn success_many_with_total<T: Serialize>(data: Vec<T>, total: i64) -> (StatusCode, Json<SuccessMany<T>>) {
    many(StatusCode::OK, data, Some(total))
}

/// Work was accepted and continues in the background.
pub fn accepted() -> StatusCode {
    StatusCode::ACCEPTED
}

pub fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}
