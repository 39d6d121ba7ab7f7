use serde::Serialize;
use worker::*;

mod access;
mod db;
mod models;
mod split;
mod store;
#[cfg(test)]
mod testutil;

use db::D1Store;
use models::{SplitStoryBody, SplitStoryResponse, StoryAddView, StoryEditView};
use split::{SplitError, SplitRequest};
use store::{RecordStore, StoreError};

const DB_BINDING: &str = "DB";

#[derive(Serialize)]
struct HealthResponse<'a> {
    service: &'a str,
    status: &'a str,
}

#[event(fetch)]
pub async fn fetch(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    let router = Router::new();

    router
        // health
        .get("/", |_, _| Response::ok("taskboard-worker online"))
        .get("/health", |_, _| {
            Response::from_json(&HealthResponse {
                service: "taskboard",
                status: "ok",
            })
        })
        // story view data
        .get_async("/v1/stories/add", story_add_data)
        .get_async("/v1/stories/:id", story_edit_data)
        .get_async("/v1/stories/:id/tasks", story_tasks)
        .get_async("/v1/sprints/:id/stories", sprint_stories)
        // split workflow
        .post_async("/v1/stories/:id/split", split_story)
        .run(req, env)
        .await
}

// ── Handlers ────────────────────────────────────────────────────

/// Data for the "add story" dialog: target ids echoed back plus the
/// project's milestones, deadline-ordered.
async fn story_add_data(req: Request, ctx: RouteContext<()>) -> Result<Response> {
    if let Err(err) = access::check(&req) {
        return Response::error(err.to_string(), 403);
    }

    let url = req.url()?;
    let (Some(project_id), Some(sprint_id)) =
        (query_id(&url, "projectId"), query_id(&url, "sprintId"))
    else {
        return Response::error("required input data missing", 400);
    };

    match store_from(&ctx)?.milestones_for_project(project_id).await {
        Ok(milestones) => Response::from_json(&StoryAddView {
            project_id,
            sprint_id,
            milestones,
        }),
        Err(err) => store_error_response(err),
    }
}

/// Data for the "edit story" dialog. The milestone list depends on the
/// loaded story's project, so the two reads are sequential.
async fn story_edit_data(req: Request, ctx: RouteContext<()>) -> Result<Response> {
    if let Err(err) = access::check(&req) {
        return Response::error(err.to_string(), 403);
    }
    let Some(id) = route_id(&ctx) else {
        return Response::error("required input data missing", 400);
    };

    let store = store_from(&ctx)?;
    let story = match store.find_story(id).await {
        Ok(Some(story)) => story,
        Ok(None) => return Response::error("story not found", 404),
        Err(err) => return store_error_response(err),
    };
    match store.milestones_for_project(story.project_id).await {
        Ok(milestones) => Response::from_json(&StoryEditView { story, milestones }),
        Err(err) => store_error_response(err),
    }
}

async fn story_tasks(req: Request, ctx: RouteContext<()>) -> Result<Response> {
    if let Err(err) = access::check(&req) {
        return Response::error(err.to_string(), 403);
    }
    let Some(id) = route_id(&ctx) else {
        return Response::error("required input data missing", 400);
    };

    match store_from(&ctx)?.tasks_for_story(id).await {
        Ok(tasks) => Response::from_json(&tasks),
        Err(err) => store_error_response(err),
    }
}

async fn sprint_stories(req: Request, ctx: RouteContext<()>) -> Result<Response> {
    if let Err(err) = access::check(&req) {
        return Response::error(err.to_string(), 403);
    }
    let Some(id) = route_id(&ctx) else {
        return Response::error("required input data missing", 400);
    };

    match store_from(&ctx)?.stories_for_sprint(id).await {
        Ok(stories) => Response::from_json(&stories),
        Err(err) => store_error_response(err),
    }
}

/// Split a story: clone it into the requested sprint, move the original's
/// open-phase tasks onto the clone, then flag the original done.
async fn split_story(mut req: Request, ctx: RouteContext<()>) -> Result<Response> {
    if let Err(err) = access::check(&req) {
        return Response::error(err.to_string(), 403);
    }

    let body: SplitStoryBody = req.json().await.unwrap_or_default();
    let request = match SplitRequest::parse(
        ctx.param("id").map(String::as_str),
        param_value(body.sprint_id.as_ref()).as_deref(),
        param_value(body.project_id.as_ref()).as_deref(),
    ) {
        Ok(request) => request,
        Err(err) => return split_error_response(&err),
    };

    let split_id = generate_id()?;
    match split::split_story(&store_from(&ctx)?, &request).await {
        Ok(outcome) => {
            worker::console_log!(
                "split {split_id}: story {} -> {} ({} tasks migrated)",
                request.story_id,
                outcome.new_story.id,
                outcome.migrated_count
            );
            Response::from_json(&SplitStoryResponse {
                split_id,
                original_story: outcome.original_story,
                new_story: outcome.new_story,
                migrated_tasks: outcome.migrated_tasks,
                migrated_count: outcome.migrated_count,
            })
        }
        Err(err) => {
            worker::console_warn!("split {split_id}: story {}: {err}", request.story_id);
            split_error_response(&err)
        }
    }
}

// ── Plumbing ────────────────────────────────────────────────────

fn store_from(ctx: &RouteContext<()>) -> Result<D1Store> {
    Ok(D1Store::new(ctx.env.d1(DB_BINDING)?))
}

fn route_id(ctx: &RouteContext<()>) -> Option<i64> {
    ctx.param("id").and_then(|v| v.parse().ok())
}

fn query_id(url: &Url, name: &str) -> Option<i64> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .and_then(|(_, v)| v.trim().parse().ok())
}

/// Stringify a form-style parameter that may arrive as a JSON number or a
/// numeric string; anything else counts as missing.
fn param_value(value: Option<&serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn store_error_response(err: StoreError) -> Result<Response> {
    let status = match &err {
        StoreError::NotFound { .. } => 404,
        StoreError::Backend(_) => 500,
    };
    Response::error(err.to_string(), status)
}

fn split_error_response(err: &SplitError) -> Result<Response> {
    let status = match err {
        SplitError::InvalidInput(_) => 400,
        SplitError::StoryNotFound(_) => 404,
        SplitError::Persistence { .. } => 500,
    };
    Response::error(err.to_string(), status)
}

fn generate_id() -> Result<String> {
    let mut buf = [0u8; 8];
    getrandom::getrandom(&mut buf)
        .map_err(|err| Error::RustError(format!("failed to generate id: {err}")))?;
    Ok(hex::encode(buf))
}
