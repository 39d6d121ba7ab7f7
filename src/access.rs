//! Request access checks.
//!
//! The board UI talks to this backend over AJAX only, so every data endpoint
//! requires the `x-requested-with: XMLHttpRequest` header. On top of that a
//! board role travels in `x-board-role`: viewers can read everything but
//! mutate nothing, members and admins may add, edit and split stories.

use worker::{Method, Request};

const AJAX_HEADER: &str = "x-requested-with";
const BOARD_ROLE_HEADER: &str = "x-board-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRole {
    /// Read-only access to board data.
    Viewer,
    /// May add and edit stories and tasks.
    Member,
    /// All rights.
    Admin,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("only AJAX requests allowed")]
    NotAjax,

    #[error("invalid x-board-role (expected viewer|member|admin)")]
    InvalidRole,

    #[error("viewer role is read-only")]
    ReadOnly,
}

/// Gate a request: AJAX header present, role parseable, role allowed to
/// perform the request's method.
pub fn check(req: &Request) -> Result<(), AccessError> {
    let headers = req.headers();

    let ajax = headers.get(AJAX_HEADER).ok().flatten();
    if !is_ajax(ajax.as_deref()) {
        return Err(AccessError::NotAjax);
    }

    let role = parse_role(
        headers
            .get(BOARD_ROLE_HEADER)
            .ok()
            .flatten()
            .unwrap_or_else(|| "viewer".into())
            .as_str(),
    )?;
    authorize(role, &req.method())
}

fn is_ajax(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
}

fn parse_role(v: &str) -> Result<BoardRole, AccessError> {
    match v.to_ascii_lowercase().as_str() {
        "viewer" => Ok(BoardRole::Viewer),
        "member" => Ok(BoardRole::Member),
        "admin" => Ok(BoardRole::Admin),
        _ => Err(AccessError::InvalidRole),
    }
}

fn authorize(role: BoardRole, method: &Method) -> Result<(), AccessError> {
    let is_read = matches!(method, Method::Get | Method::Head | Method::Options);
    if !is_read && role == BoardRole::Viewer {
        return Err(AccessError::ReadOnly);
    }
    Ok(())
}
