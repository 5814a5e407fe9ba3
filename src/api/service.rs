use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::context::CallContext;
use crate::api::dispatch::{param, selector, Dispatcher, Operation, OperationRequest};
use crate::api::handlers;
use crate::binding::Binding;
use crate::error::{last_result_key, CmisError, ErrorKind, ErrorRecord, LAST_RESULT_PREFIX};
use crate::model::BaseTypeId;
use crate::session::AttributeValue;

const CHALLENGE: &str = "Basic realm=\"CMIS\"";

pub struct GatewayState {
    pub binding: Arc<Binding>,
    repository_dispatcher: Dispatcher,
    root_dispatcher: Dispatcher,
}

pub fn create_router(binding: Arc<Binding>) -> Router {
    let state = Arc::new(GatewayState {
        binding,
        repository_dispatcher: handlers::repository_dispatcher(),
        root_dispatcher: handlers::root_dispatcher(),
    });
    Router::new()
        .route("/", get(list_repositories))
        .route(
            "/:repository_id",
            get(repository_endpoint).post(repository_endpoint),
        )
        .route("/:repository_id/root", get(root_endpoint).post(root_endpoint))
        .fallback(unknown_operation)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The GET selector used when the request names none. Documents default to
/// their content, folders to their children, everything else, including
/// objects that could not be inspected, falls back to the object itself.
pub fn default_selector(base_type_id: Option<BaseTypeId>) -> &'static str {
    match base_type_id {
        Some(BaseTypeId::Document) => selector::CONTENT,
        Some(BaseTypeId::Folder) => selector::CHILDREN,
        _ => selector::OBJECT,
    }
}

#[derive(Copy, Clone)]
enum Scope {
    Repository,
    Root,
}

async fn list_repositories(State(state): State<Arc<GatewayState>>) -> Response {
    let result = async {
        let infos = state
            .binding
            .repository_service()?
            .get_repository_infos()
            .await?;
        let items: Vec<_> = infos.iter().map(|i| i.as_ref().clone()).collect();
        Ok::<_, CmisError>(Json(serde_json::json!({
            "items": items,
            "total": items.len(),
        })))
    }
    .await;
    match result {
        Ok(body) => body.into_response(),
        Err(err) => error_response(&err, None, &state.binding),
    }
}

async fn repository_endpoint(
    State(state): State<Arc<GatewayState>>,
    Path(repository_id): Path<String>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(state, repository_id, Scope::Repository, method, params, headers, body).await
}

async fn root_endpoint(
    State(state): State<Arc<GatewayState>>,
    Path(repository_id): Path<String>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(state, repository_id, Scope::Root, method, params, headers, body).await
}

async fn unknown_operation(State(state): State<Arc<GatewayState>>) -> Response {
    error_response(
        &CmisError::not_supported("Unknown operation"),
        None,
        &state.binding,
    )
}

async fn handle(
    state: Arc<GatewayState>,
    repository_id: String,
    scope: Scope,
    method: Method,
    params: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut context = CallContext::new(repository_id.clone());
    context.username = CallContext::username_from(&headers);

    let payload = if method == Method::POST && !body.is_empty() {
        match serde_json::from_slice(&body) {
            Ok(payload) => Some(payload),
            Err(_) => {
                return error_response(
                    &CmisError::invalid_argument("Invalid JSON payload"),
                    Some(&context),
                    &state.binding,
                )
            }
        }
    } else {
        None
    };
    let request = OperationRequest {
        method: method.clone(),
        params,
        payload,
    };
    context.object_id = request.param(param::OBJECT_ID).map(str::to_string);
    context.transaction = request.param(param::TRANSACTION).map(str::to_string);

    let (resource, base_type_id) =
        match resolve_resource(&state.binding, scope, &repository_id, &request).await {
            Ok(resolved) => resolved,
            Err(err) => return error_response(&err, Some(&context), &state.binding),
        };
    context.base_type_id = base_type_id;

    let operation = Operation {
        context: &context,
        binding: &state.binding,
        repository_id: &repository_id,
        request: &request,
    };

    let dispatcher = match scope {
        Scope::Repository => &state.repository_dispatcher,
        Scope::Root => &state.root_dispatcher,
    };
    match dispatcher.dispatch(&resource, &operation).await {
        Some(Ok(response)) => response.into_response(),
        Some(Err(err)) => error_response(&err, Some(&context), &state.binding),
        None => error_response(
            &CmisError::not_supported("Unknown operation"),
            Some(&context),
            &state.binding,
        ),
    }
}

/// Picks the route key: the selector for GET (with base-type defaulting on
/// the root resource), the action for POST.
async fn resolve_resource(
    binding: &Binding,
    scope: Scope,
    repository_id: &str,
    request: &OperationRequest,
) -> Result<(String, Option<BaseTypeId>), CmisError> {
    if request.method == Method::POST {
        return match request.param(param::ACTION) {
            Some(action) if !action.is_empty() => Ok((action.to_string(), None)),
            _ => Err(CmisError::not_supported("Unknown action")),
        };
    }

    if let Some(selector) = request.param(param::SELECTOR) {
        return Ok((selector.to_string(), None));
    }
    match scope {
        Scope::Repository => Ok((selector::REPOSITORY_INFO.to_string(), None)),
        Scope::Root => {
            // Inspect the target to pick a sensible default; a request
            // without an objectId addresses the root folder. Any failure
            // here falls back to the object selector and surfaces, if at
            // all, from the handler itself.
            let mut base_type_id = None;
            let object_id = match request.param(param::OBJECT_ID) {
                Some(object_id) => Some(object_id.to_string()),
                None => match binding.repository_service() {
                    Ok(service) => service
                        .get_repository_info(repository_id)
                        .await
                        .ok()
                        .map(|info| info.root_folder_id.clone()),
                    Err(_) => None,
                },
            };
            if let Some(object_id) = object_id {
                if let Ok(service) = binding.object_service() {
                    if let Ok(object) = service.get_object(repository_id, &object_id).await {
                        base_type_id = Some(object.base_type_id);
                    }
                }
            }
            Ok((default_selector(base_type_id).to_string(), base_type_id))
        }
    }
}

/// Upper bound on retained last-result records per gateway; client-chosen
/// transaction ids must not grow the session without limit.
const LAST_RESULT_LIMIT: usize = 64;

/// Translates an error into the wire response. Anonymous permission
/// failures get a `401` challenge and nothing else; every other failure
/// produces the taxonomy's status code with a JSON error body and is
/// memoized in the gateway session so a follow-up `lastResult` request can
/// retrieve it.
pub fn error_response(err: &CmisError, context: Option<&CallContext>, binding: &Binding) -> Response {
    if err.kind().is_runtime() {
        log::error!("{}: {}", err.exception_name(), err.message());
    }

    let anonymous = context.map_or(true, |c| c.username.is_none());
    if err.kind() == ErrorKind::PermissionDenied && anonymous {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, CHALLENGE)],
            "Authorization Required",
        )
            .into_response();
    }

    let record = ErrorRecord::from_error(err);
    if let Some(repository_id) = context.and_then(|c| c.repository_id.as_deref()) {
        if let Ok(session) = binding.session() {
            if let Ok(value) = serde_json::to_value(&record) {
                let key = last_result_key(
                    repository_id,
                    context.map_or("", |c| c.transaction_key()),
                );
                let mut guard = session.write();
                if !guard.contains(&key) {
                    let retained: Vec<String> = guard
                        .keys()
                        .into_iter()
                        .filter(|k| k.starts_with(LAST_RESULT_PREFIX))
                        .collect();
                    if retained.len() >= LAST_RESULT_LIMIT {
                        // Coarse eviction, same policy as the bounded caches.
                        for victim in retained.iter().take(retained.len() + 1 - LAST_RESULT_LIMIT)
                        {
                            guard.remove(victim);
                        }
                    }
                }
                guard.put(key, AttributeValue::Json(value));
            }
        }
    }

    (err.status(), Json(record.body())).into_response()
}
