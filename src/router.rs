// Regex route table and the request dispatcher behind the axum fallback
use std::collections::HashMap;
use std::future::Future;

use axum::body::{to_bytes, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub type HandlerResult = Result<Response, ApiError>;

type BoxedHandler = Box<dyn Fn(RequestContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

struct Route {
    method: Method,
    pattern: Regex,
    handler: BoxedHandler,
}

/// Ordered list of routes. Patterns are regular expressions anchored to the
/// whole path; the first entry whose pattern and method both match wins, so
/// registration order is significant.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Named capture groups in `pattern` become request
    /// parameters, available to the handler under the capture's name.
    pub fn register<H, Fut>(&mut self, method: Method, pattern: &str, handler: H)
    where
        H: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let anchored = format!("^{pattern}$");
        let pattern = Regex::new(&anchored).expect("route pattern must compile");
        let handler: BoxedHandler =
            Box::new(move |ctx| -> BoxFuture<'static, HandlerResult> { Box::pin(handler(ctx)) });
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
    }
}

/// Everything a handler gets for one request: shared state, the named path
/// parameters, the request headers and the buffered body.
pub struct RequestContext {
    pub state: AppState,
    pub headers: HeaderMap,
    params: HashMap<String, String>,
    body: Bytes,
}

impl RequestContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The named parameter parsed as an external identifier. Captures are
    /// plain strings; anything that is not a uuid is the client's mistake.
    pub fn uuid_param(&self, name: &str) -> Result<Uuid, ApiError> {
        self.param(name)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| ApiError::bad_request("Url is invalid"))
    }

    /// Decode the request body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|err| ApiError::bad_request(err.to_string()))
    }
}

/// Serves every request by scanning the route table in order.
///
/// Method mismatches on a matching pattern are collected rather than
/// terminal: once the scan ends they become a 405 whose Allow header is the
/// union of methods registered for that path. A path no pattern matches is a
/// plain 404.
pub struct Dispatcher {
    table: RouteTable,
    state: AppState,
}

impl Dispatcher {
    pub fn new(table: RouteTable, state: AppState) -> Self {
        Self { table, state }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        match self.try_dispatch(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn try_dispatch(&self, request: Request) -> HandlerResult {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, usize::MAX)
            .await
            .map_err(|_| ApiError::bad_request("Unreadable request body"))?;

        // JSON-only API: any request that carries a body must declare it,
        // before we even look at the route table.
        if !body.is_empty() && !declares_json(&parts.headers) {
            return Err(ApiError::bad_request("Content-Type must be application/json"));
        }

        let path = parts.uri.path();
        let mut matched: Option<(usize, HashMap<String, String>)> = None;
        let mut allow: Vec<String> = Vec::new();

        for (index, route) in self.table.routes.iter().enumerate() {
            let Some(caps) = route.pattern.captures(path) else {
                continue;
            };
            if parts.method != route.method {
                let method = route.method.to_string();
                if !allow.contains(&method) {
                    allow.push(method);
                }
                continue;
            }
            matched = Some((index, extract_params(&route.pattern, &caps)));
            break;
        }

        match matched {
            Some((index, params)) => {
                let ctx = RequestContext {
                    state: self.state.clone(),
                    headers: parts.headers,
                    params,
                    body,
                };
                (self.table.routes[index].handler)(ctx).await
            }
            None if !allow.is_empty() => Err(ApiError::method_not_allowed(allow)),
            None => Err(ApiError::not_found("Not Found")),
        }
    }
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn extract_params(pattern: &Regex, caps: &Captures) -> HashMap<String, String> {
    pattern
        .capture_names()
        .flatten()
        .filter_map(|name| {
            caps.name(name)
                .map(|value| (name.to_string(), value.as_str().to_string()))
        })
        .collect()
}
