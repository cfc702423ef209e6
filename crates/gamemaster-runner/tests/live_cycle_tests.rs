//! Live-adapter tests against an in-process mock of the llama.cpp server
//! and the MCP tool server.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use gamemaster_core::collaborator::{NarrativeGenerator as _, VoteCollector as _};
use gamemaster_core::config::GameMasterConfig;
use gamemaster_runner::bootstrap;
use gamemaster_types::{ContentKind, CycleStatus};
use serde_json::{Value, json};

const SESSION: &str = "session-42";

const COMPOSITION: &str = "Here you go:\n```json\n{\n  \"outcome\": \"The crew seals the artifact.\",\n  \"content_prompts\": {\n    \"image\": \"sealed vault, cold light\",\n    \"3d_scene\": \"vault interior\",\n    \"voiceover\": \"Log entry: sealed.\",\n  }\n}\n```";

async fn models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "qwen3-30b-a3b"}]}))
}

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    let user = body
        .pointer("/messages/1/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let content = if user.starts_with("OUTCOME") {
        COMPOSITION.to_owned()
    } else {
        format!("reply to {user}")
    };
    Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
}

async fn mcp(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let method = body.get("method").and_then(Value::as_str).unwrap_or_default();
    let id = body.get("id").cloned().unwrap_or(Value::Null);
    let session = headers
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match method {
        "initialize" => (
            [("mcp-session-id", SESSION)],
            Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "pixelle-mock", "version": "0.0.1"}
                }
            })),
        )
            .into_response(),
        "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
        "tools/list" if session == SESSION => {
            let result = if body.pointer("/params/cursor").is_some() {
                json!({"tools": [
                    {"name": "i2v_lightx2v", "description": "Animate an image"},
                    {"name": "image_to_3d", "description": "TRELLIS 3D generation"},
                    {"name": "tts_chatterbox", "description": "Speech synthesis"}
                ]})
            } else {
                json!({
                    "tools": [{"name": "t2i_flux_nunchaku", "description": "Text to image"}],
                    "nextCursor": "page-2"
                })
            };
            let message = json!({"jsonrpc": "2.0", "id": id, "result": result});
            (
                [("content-type", "text/event-stream")],
                format!("event: message\ndata: {message}\n\n"),
            )
                .into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Serve the mock on an ephemeral port and return its base URL.
async fn spawn_mock() -> String {
    let app = Router::new()
        .route("/v1/models", get(models))
        .route("/v1/chat/completions", post(chat))
        .route("/mcp", post(mcp));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

fn template_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gamemaster_live_{tag}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    write_templates(&dir);
    dir
}

fn write_templates(dir: &Path) {
    let files = [
        ("system", "{% if npc %}You are {{ npc.name }}.{% else %}You are the Game Master.{% endif %}"),
        ("episode", "EPISODE day {{ day }}"),
        ("dialogue", "DIALOGUE {{ npc.name }}"),
        ("outcome", "OUTCOME {{ decisions | length }}"),
        ("teaser", "TEASER day {{ day }}"),
    ];
    for (name, body) in files {
        std::fs::write(dir.join(format!("{name}.j2")), body).unwrap();
    }
}

fn config(llm_url: &str, templates: &Path) -> GameMasterConfig {
    let mut config = GameMasterConfig::default();
    config.llm.api_url = format!("{llm_url}/v1");
    config.llm.request_timeout_ms = 5_000;
    config.llm.templates_dir = templates.display().to_string();
    config.tools.handshake_timeout_ms = 5_000;
    config
}

#[tokio::test]
async fn live_initialize_runs_a_cycle_through_the_backend() {
    let base = spawn_mock().await;
    let templates = template_dir("live");
    let config = config(&base, &templates);

    let mut orch = bootstrap::initialize(&format!("{base}/mcp"), &config)
        .await
        .unwrap();
    assert!(orch.degraded().is_empty());
    assert_eq!(orch.catalog().len(), 4);
    assert_eq!(
        orch.catalog()
            .tool_for(ContentKind::Scene3d)
            .map(|t| t.name.as_str()),
        Some("image_to_3d")
    );

    let result = orch.run_once().await;
    assert_eq!(result.status(), CycleStatus::Completed);
    assert_eq!(result.day, 2);

    let completed = result.completed().unwrap();
    assert_eq!(completed.snapshot.story, "reply to EPISODE day 1");
    assert_eq!(
        completed
            .snapshot
            .npc_dialogues
            .first()
            .map(|d| d.dialogue.as_str()),
        Some("reply to DIALOGUE Captain Eva Rodriguez")
    );
    assert_eq!(completed.snapshot.outcome, "The crew seals the artifact.");
    assert_eq!(completed.snapshot.content_prompts.len(), 4);
    assert_eq!(
        completed
            .snapshot
            .content_prompts
            .get(&ContentKind::Image)
            .map(String::as_str),
        Some("sealed vault, cold light")
    );
    assert_eq!(completed.teaser, "reply to TEASER day 1");
    assert_eq!(orch.world_state().story_summary, "reply to EPISODE day 1");

    std::fs::remove_dir_all(&templates).ok();
}

#[tokio::test]
async fn unreachable_backends_degrade_every_slot() {
    let templates = template_dir("degraded");
    let config = config("http://127.0.0.1:1", &templates);

    let mut orch = bootstrap::initialize("http://127.0.0.1:1/mcp", &config)
        .await
        .unwrap();
    assert_eq!(
        orch.degraded(),
        ["narrator", "dialogue", "composer", "publisher", "tools"]
    );
    assert!(orch.catalog().is_empty());
    assert_eq!(orch.collaborators().narrator.name(), "fallback-narrator");

    let result = orch.run_once().await;
    assert_eq!(result.status(), CycleStatus::Completed);
    assert_eq!(result.day, 2);

    std::fs::remove_dir_all(&templates).ok();
}

#[tokio::test]
async fn reinitialize_installs_backends_that_came_up() {
    let base = spawn_mock().await;
    let templates = template_dir("reinit");
    let down = config("http://127.0.0.1:1", &templates);

    let mut orch = bootstrap::initialize("http://127.0.0.1:1/mcp", &down)
        .await
        .unwrap();
    assert_eq!(orch.degraded().len(), 5);

    let up = config(&base, &templates);
    let still = bootstrap::reinitialize(&mut orch, "http://127.0.0.1:1/mcp", &up).await;
    assert_eq!(still, ["tools"]);
    assert_eq!(orch.collaborators().narrator.name(), "llama-narrator");
    assert_eq!(orch.collaborators().votes.name(), "simulated-ballot");

    let result = orch.run_once().await;
    assert_eq!(
        result.completed().map(|c| c.snapshot.story.as_str()),
        Some("reply to EPISODE day 1")
    );

    std::fs::remove_dir_all(&templates).ok();
}
