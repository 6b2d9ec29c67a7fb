/// HTTP Transport
///
/// Actix Web server exposing the tool catalog over plain REST, JSON-RPC and
/// Server-Sent Events:
/// - `GET /health`, `GET /metrics`, `GET /` (endpoint overview page)
/// - `GET /tools`, `POST /tools/{tool_name}`
/// - `GET /resources`, `GET /resources/{name}`
/// - `GET /sse` (session event stream), `POST /message` (push to a session)
/// - `POST /mcp` and `POST /` (JSON-RPC 2.0)

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer,
    dev::Service,
    http::header,
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::{Value, json};
use std::time::Duration;

use crate::core::config::ServerConfig;
use crate::core::resources;
use crate::core::rpc::{self, RpcRequest};
use crate::core::state::AppState;

/// Header carrying the target session for `POST /message`.
pub const SESSION_HEADER: &str = "X-Session-ID";

/// Register every route. Shared by the server and the HTTP tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/", web::post().to(rpc_endpoint))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics))
        .route("/tools", web::get().to(list_tools))
        .route("/tools/{tool_name}", web::post().to(call_tool))
        .route("/resources", web::get().to(list_resources))
        .route("/resources/{name}", web::get().to(read_resource))
        .route("/sse", web::get().to(sse_stream))
        .route("/message", web::post().to(post_message))
        .route("/mcp", web::post().to(rpc_endpoint));
}

/// Health check endpoint for load balancers and monitoring.
async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "server": state.server_name,
        "version": state.server_version
    }))
}

async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "requests_total": state.metrics.requests_total(),
        "tool_calls_total": state.metrics.tool_calls_total(),
        "active_sessions": state.sessions.len(),
        "status": "ok"
    }))
}

/// REST tool listing. The schema is exposed as `parameters`.
async fn list_tools(state: web::Data<AppState>) -> HttpResponse {
    let tools: Vec<Value> = state
        .registry()
        .list()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema
            })
        })
        .collect();
    HttpResponse::Ok().json(json!({ "tools": tools }))
}

/// REST tool call. The request body is the arguments object; an empty body
/// means no arguments.
async fn call_tool(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Bytes,
) -> HttpResponse {
    let tool_name = path.into_inner();
    let arguments = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(arguments) => arguments,
            Err(e) => {
                return HttpResponse::BadRequest().json(json!({
                    "success": false,
                    "error": format!("invalid request body: {e}")
                }));
            }
        }
    };

    state.metrics.record_tool_call();
    match state.dispatcher.call(tool_name, arguments).await {
        Ok(result) => HttpResponse::Ok().json(json!({
            "success": true,
            "result": result
        })),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

async fn list_resources() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "resources": resources::list() }))
}

async fn read_resource(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let name = path.into_inner();
    // The notes snapshot takes the store lock; keep it off the executor.
    let lookup = {
        let state = state.clone();
        let name = name.clone();
        web::block(move || resources::read(&state, &name)).await
    };
    match lookup {
        Ok(Some((uri, content))) => HttpResponse::Ok().json(json!({
            "uri": uri,
            "content": content
        })),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": format!("Unknown resource: {}{name}", resources::URI_SCHEME)
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}

/// Server-Sent Events endpoint.
///
/// Opens a session for the connection. The first event carries the session
/// id; later events are whatever gets pushed to the session via
/// `POST /message`, plus `{"type": "ping"}` keepalives while idle. The
/// session is closed when the client disconnects.
async fn sse_stream(state: web::Data<AppState>) -> HttpResponse {
    let (session_id, events) = state.sessions.subscribe(state.keepalive);
    tracing::info!(session = %session_id, "SSE client connected");

    let body = events.map(|event| Ok::<_, actix_web::Error>(sse_frame(&event)));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        // Disable caching to ensure clients always get fresh data
        .insert_header(header::CacheControl(vec![
            header::CacheDirective::NoCache,
            header::CacheDirective::NoStore,
            header::CacheDirective::MustRevalidate,
        ]))
        // Compression would buffer events
        .insert_header(header::ContentEncoding::Identity)
        // Disable nginx buffering for real-time streaming
        .insert_header(("x-accel-buffering", "no"))
        .streaming(body)
}

/// Format one SSE event: `data: {json}\n\n`.
fn sse_frame(event: &Value) -> Bytes {
    Bytes::from(format!("data: {event}\n\n"))
}

/// Queue the JSON body onto the session named by the `X-Session-ID` header.
///
/// Unknown or missing session ids are accepted; the event is dropped.
async fn post_message(state: web::Data<AppState>, req: HttpRequest, body: Bytes) -> HttpResponse {
    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
        }
    };

    if let Some(session_id) = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        state.sessions.push(session_id, event);
    }

    HttpResponse::Ok().json(json!({ "status": "received" }))
}

/// JSON-RPC 2.0 endpoint. Notifications get `202 Accepted` with no body.
async fn rpc_endpoint(state: web::Data<AppState>, req: web::Json<RpcRequest>) -> HttpResponse {
    match rpc::handle_request(&state, req.into_inner()).await {
        Some(response) => HttpResponse::Ok().json(response),
        None => HttpResponse::Accepted().finish(),
    }
}

/// Endpoint overview page.
async fn index(state: web::Data<AppState>) -> HttpResponse {
    let tools: String = state
        .registry()
        .list()
        .iter()
        .map(|tool| {
            format!(
                "<li><code>{}</code> {}</li>\n",
                escape_html(&tool.name),
                escape_html(&tool.description)
            )
        })
        .collect();

    let page = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{name}</title></head>
<body>
<h1>{name} <small>v{version}</small></h1>
<h2>Endpoints</h2>
<ul>
<li><code>GET /health</code> server status</li>
<li><code>GET /tools</code> list tools</li>
<li><code>POST /tools/{{tool_name}}</code> call a tool with a JSON arguments body</li>
<li><code>GET /resources</code>, <code>GET /resources/{{name}}</code> read-only documents</li>
<li><code>GET /sse</code> event stream; the first event carries the session id</li>
<li><code>POST /message</code> push a JSON event to the session in <code>{header}</code></li>
<li><code>POST /mcp</code> JSON-RPC 2.0</li>
</ul>
<h2>Tools</h2>
<ul>
{tools}</ul>
<pre>curl -X POST http://localhost:8080/tools/calculate \
  -H "Content-Type: application/json" \
  -d '{{"expression": "sqrt(144) + 10"}}'</pre>
</body>
</html>
"#,
        name = escape_html(&state.server_name),
        version = escape_html(&state.server_version),
        header = SESSION_HEADER,
        tools = tools,
    );

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Run the HTTP transport.
///
/// # Configuration
/// The server is configured with:
/// - Worker threads: from config, defaulting to the CPU count (max 16)
/// - Max connections: 10,000 concurrent connections
/// - Connection rate limit: 1,000 connections per second
/// - Keep-alive: 30 seconds
/// - Request timeout: 30 seconds
/// - Disconnect timeout: 2 seconds
/// - Shutdown timeout: 10 seconds
pub async fn run_server_http(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let workers = config.worker_count();

    tracing::info!(
        name = %state.server_name,
        version = %state.server_version,
        bind = %bind_addr,
        workers,
        keepalive_secs = state.keepalive.as_secs(),
        "HTTP server starting"
    );

    let data = web::Data::new(state);

    HttpServer::new(move || {
        let counters = data.metrics.clone();
        App::new()
            .app_data(data.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            // %r = request line, %s = status, %Dms = duration in milliseconds
            .wrap(Logger::new("%r %s %Dms"))
            .wrap_fn(move |req, srv| {
                counters.record_request();
                srv.call(req)
            })
            .configure(routes)
    })
    .workers(workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}
