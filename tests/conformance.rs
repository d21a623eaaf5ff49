//! End-to-end protocol conformance.
//!
//! Each test binds a server on an ephemeral port, connects a real
//! WebSocket client and checks the traffic it observes.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use bidi_server::protocol::LogLevel;
use bidi_server::{EngineValue, ProtocolProfile, SandboxEngine, Server};

// ============================================================================
// Harness
// ============================================================================

/// Upper bound for any single frame to arrive.
const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Slow fixture used by navigation tests.
const SLOW_URL: &str = "https://slow.test/";

fn engine() -> SandboxEngine {
    SandboxEngine::new()
        .with_builtin_scripts()
        .with_page(SLOW_URL, "<h1>slow</h1>")
        .with_latency(SLOW_URL, Duration::from_millis(300))
        .with_script("() => console.log('hello', 42)", |scope, _| {
            scope.console(
                LogLevel::Info,
                "log",
                vec![
                    EngineValue::Json(json!("hello")),
                    EngineValue::Json(json!(42)),
                ],
            );
            Ok(EngineValue::Undefined)
        })
        .with_script("() => console.log(window)", |scope, _| {
            let window = scope.window();
            scope.console(LogLevel::Info, "log", vec![window]);
            Ok(EngineValue::Undefined)
        })
}

async fn start(engine: SandboxEngine, profile: ProtocolProfile) -> Result<String> {
    let server = Server::builder()
        .engine(engine)
        .port(0)
        .profile(profile)
        .bind()
        .await?;
    let url = server.ws_url();
    tokio::spawn(server.serve());
    Ok(url)
}

struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url).await?;
        Ok(Self { ws })
    }

    async fn open(engine: SandboxEngine) -> Result<Self> {
        let url = start(engine, ProtocolProfile::Current).await?;
        Self::connect(&url).await
    }

    async fn send(&mut self, value: Value) -> Result<()> {
        self.send_text(&value.to_string()).await
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Value> {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .context("timed out waiting for a frame")?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(text.as_str())?),
                Some(Ok(Message::Close(_))) | None => bail!("connection closed"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Sends a command and returns `(events before the response, response)`.
    async fn command(&mut self, id: u64, method: &str, params: Value) -> Result<(Vec<Value>, Value)> {
        self.send(json!({ "id": id, "method": method, "params": params }))
            .await?;
        let mut events = Vec::new();
        loop {
            let frame = self.recv().await?;
            if frame.get("id") == Some(&json!(id)) {
                return Ok((events, frame));
            }
            events.push(frame);
        }
    }

    async fn result(&mut self, id: u64, method: &str, params: Value) -> Result<Value> {
        let (_, response) = self.command(id, method, params).await?;
        response
            .get("result")
            .cloned()
            .with_context(|| format!("{method} failed: {response}"))
    }

    async fn root(&mut self) -> Result<String> {
        let tree = self.result(0, "browsingContext.getTree", json!({})).await?;
        tree["contexts"][0]["context"]
            .as_str()
            .map(str::to_string)
            .context("root context listed")
    }
}

fn assert_invalid_argument(response: &Value, message: &str) {
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"], "invalid argument");
    assert_eq!(response["message"], message);
}

// ============================================================================
// Frame Handling
// ============================================================================

#[tokio::test]
async fn test_invalid_json() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    client.send_text("this is not json").await?;
    assert_invalid_argument(&client.recv().await?, "Cannot parse data as JSON");
    Ok(())
}

#[tokio::test]
async fn test_empty_object() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    client.send(json!({})).await?;
    assert_invalid_argument(&client.recv().await?, "Expected unsigned integer but got undefined");
    Ok(())
}

#[tokio::test]
async fn test_binary_frame() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    client.ws.send(Message::Binary(b"{}".to_vec().into())).await?;
    assert_invalid_argument(&client.recv().await?, "not supported type (binary)");
    Ok(())
}

#[tokio::test]
async fn test_malformed_frame_does_not_disturb_session() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    client.send_text(r#"{"id":1,"method":"session.status","params":[]}"#).await?;
    assert_invalid_argument(&client.recv().await?, "Expected object but got array");

    let status = client.result(2, "session.status", json!({})).await?;
    assert_eq!(status["ready"], true);
    Ok(())
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn test_session_status() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let (_, response) = client.command(5, "session.status", json!({})).await?;
    assert_eq!(
        response,
        json!({ "id": 5, "result": { "ready": true, "message": "ready" } })
    );
    Ok(())
}

#[tokio::test]
async fn test_legacy_profile() -> Result<()> {
    let url = start(engine(), ProtocolProfile::Legacy).await?;
    let mut client = Client::connect(&url).await?;

    let (_, response) = client.command(5, "session.status", json!({})).await?;
    assert_eq!(response["value"]["ready"], true);
    assert_eq!(response["value"]["message"], "ready");

    let (events, response) = client
        .command(6, "PROTO.browsingContext.createContext", json!({}))
        .await?;
    assert_eq!(events[0]["params"]["type"], "window");
    assert_eq!(response["value"]["type"], "window");

    let (_, response) = client
        .command(7, "browsingContext.create", json!({}))
        .await?;
    assert_eq!(response["error"], "unknown command");
    Ok(())
}

#[tokio::test]
async fn test_unknown_command() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let (_, response) = client.command(9, "foo.bar", json!({})).await?;
    assert_eq!(
        response,
        json!({ "id": 9, "error": "unknown command", "message": "Unknown command 'foo.bar'" })
    );
    Ok(())
}

// ============================================================================
// Browsing Contexts
// ============================================================================

#[tokio::test]
async fn test_create_and_close_ordering() -> Result<()> {
    let mut client = Client::open(engine()).await?;

    let (events, response) = client.command(1, "browsingContext.create", json!({})).await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["method"], "browsingContext.contextCreated");
    let context = response["result"]["context"].clone();
    assert_eq!(events[0]["params"]["context"], context);
    assert_eq!(response["result"]["url"], "about:blank");

    let tree = client.result(2, "browsingContext.getTree", json!({})).await?;
    assert_eq!(tree["contexts"].as_array().map(Vec::len), Some(2));

    let (events, response) = client
        .command(3, "browsingContext.close", json!({ "context": context }))
        .await?;
    assert_eq!(response["result"], json!({}));
    assert_eq!(
        events,
        vec![json!({
            "method": "browsingContext.contextDestroyed",
            "params": { "context": context, "parent": null, "url": "about:blank" }
        })]
    );

    let (_, response) = client
        .command(4, "browsingContext.close", json!({ "context": context }))
        .await?;
    assert_eq!(response["error"], "unknown error");
    assert_eq!(
        response["message"],
        format!("Context {} not found", context.as_str().unwrap_or_default())
    );
    Ok(())
}

#[tokio::test]
async fn test_get_tree_is_stable() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let first = client.result(1, "browsingContext.getTree", json!({})).await?;
    let second = client.result(2, "browsingContext.getTree", json!({})).await?;
    assert_eq!(first, second);
    assert_eq!(first["contexts"][0]["url"], "about:blank");
    assert_eq!(first["contexts"][0]["children"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_nested_close_destroys_children_first() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let parent = client.result(1, "browsingContext.create", json!({})).await?["context"].clone();
    let child = client
        .result(2, "browsingContext.create", json!({ "parent": parent }))
        .await?["context"]
        .clone();

    let (events, _) = client
        .command(3, "browsingContext.close", json!({ "context": parent }))
        .await?;
    let destroyed: Vec<_> = events.iter().map(|e| e["params"]["context"].clone()).collect();
    assert_eq!(destroyed, vec![child, parent]);
    Ok(())
}

// ============================================================================
// Waits & Navigation
// ============================================================================

#[tokio::test]
async fn test_wait_for_selector_timeout() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;

    let started = Instant::now();
    let (_, response) = client
        .command(
            1,
            "browsingContext.waitForSelector",
            json!({ "context": context, "selector": "#missing", "timeout": 1000 }),
        )
        .await?;

    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(response["error"], "unknown error");
    assert_eq!(
        response["message"],
        "waiting for selector `#missing` failed: timeout 1000ms exceeded"
    );
    Ok(())
}

#[tokio::test]
async fn test_wait_for_existing_selector() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    client
        .result(
            1,
            "browsingContext.navigate",
            json!({ "context": context, "url": "data:text/html,<div class=ready>ok</div>" }),
        )
        .await?;

    let node = client
        .result(
            2,
            "browsingContext.waitForSelector",
            json!({ "context": context, "selector": ".ready" }),
        )
        .await?;
    assert_eq!(node["type"], "node");
    assert!(node["objectId"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_navigate_load_precedes_response() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;

    let (events, response) = client
        .command(
            1,
            "browsingContext.navigate",
            json!({ "context": context, "url": SLOW_URL, "waitUntil": ["load"] }),
        )
        .await?;
    assert_eq!(
        events,
        vec![json!({
            "method": "browsingContext.load",
            "params": { "context": context, "url": SLOW_URL }
        })]
    );
    assert_eq!(response["result"], json!({ "url": SLOW_URL }));
    Ok(())
}

#[tokio::test]
async fn test_navigate_timeout_then_late_load() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;

    let (events, response) = client
        .command(
            1,
            "browsingContext.navigate",
            json!({ "context": context, "url": SLOW_URL, "timeout": "1" }),
        )
        .await?;
    assert!(events.is_empty());
    assert_eq!(response["error"], "unknown error");
    assert_eq!(response["message"], "Navigation timeout of 1 ms exceeded");

    let load = client.recv().await?;
    assert_eq!(load["method"], "browsingContext.load");
    assert_eq!(load["params"]["url"], SLOW_URL);
    Ok(())
}

// ============================================================================
// Script & Input
// ============================================================================

#[tokio::test]
async fn test_evaluate_primitive() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    let result = client
        .result(
            1,
            "browsingContext.evaluate",
            json!({ "context": context, "function": "(a,b) => a+b", "args": [1, 2] }),
        )
        .await?;
    assert_eq!(result, json!("3"));
    Ok(())
}

#[tokio::test]
async fn test_evaluate_remote_object() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    let first = client
        .result(
            1,
            "browsingContext.evaluate",
            json!({ "context": context, "function": "() => window" }),
        )
        .await?;
    let second = client
        .result(
            2,
            "browsingContext.evaluate",
            json!({ "context": context, "function": "() => window" }),
        )
        .await?;
    assert_eq!(first["type"], "Window");
    assert_eq!(first["className"], "Window");
    assert_eq!(first["objectId"], second["objectId"]);
    Ok(())
}

#[tokio::test]
async fn test_console_log_event() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    let (events, response) = client
        .command(
            1,
            "browsingContext.evaluate",
            json!({ "context": context, "function": "() => console.log('hello', 42)" }),
        )
        .await?;

    assert_eq!(response["result"], json!({ "type": "undefined" }));
    let entry = &events[0]["params"];
    assert_eq!(events[0]["method"], "log.entryAdded");
    assert_eq!(entry["level"], "info");
    assert_eq!(entry["text"], "hello 42");
    assert_eq!(entry["source"]["context"], json!(context));
    assert_eq!(
        entry["stackTrace"],
        json!([{ "url": "about:blank", "functionName": "", "lineNumber": 0, "columnNumber": 14 }])
    );
    Ok(())
}

#[tokio::test]
async fn test_console_log_remote_argument() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    let (events, _) = client
        .command(
            1,
            "browsingContext.evaluate",
            json!({ "context": context, "function": "() => console.log(window)" }),
        )
        .await?;
    let window = client
        .result(
            2,
            "browsingContext.evaluate",
            json!({ "context": context, "function": "() => window" }),
        )
        .await?;

    let entry = &events[0]["params"];
    assert_eq!(entry["text"], "Window");
    assert_eq!(entry["args"][0]["type"], "Window");
    assert!(entry["args"][0]["objectId"].is_string());
    assert_eq!(entry["args"][0]["objectId"], window["objectId"]);
    Ok(())
}

#[tokio::test]
async fn test_element_object_id_is_stable() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    client
        .result(
            1,
            "browsingContext.navigate",
            json!({ "context": context, "url": "data:text/html,<button id=go>Go</button>" }),
        )
        .await?;

    let params = json!({ "context": context, "selector": "#go" });
    let first = client
        .result(2, "browsingContext.selectElement", params.clone())
        .await?;
    let second = client
        .result(3, "browsingContext.selectElement", params.clone())
        .await?;
    let waited = client
        .result(4, "browsingContext.waitForSelector", params)
        .await?;

    assert!(first["objectId"].is_string());
    assert_eq!(first["objectId"], second["objectId"]);
    assert_eq!(first["objectId"], waited["objectId"]);
    Ok(())
}

#[tokio::test]
async fn test_evaluate_object_and_array() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    let object = client
        .result(
            1,
            "browsingContext.evaluate",
            json!({ "context": context, "function": r#"{"answer":42}"# }),
        )
        .await?;
    let array = client
        .result(
            2,
            "browsingContext.evaluate",
            json!({ "context": context, "function": "[1, 2]" }),
        )
        .await?;

    assert_eq!(object["type"], "Object");
    assert_eq!(array["type"], "Array");
    assert_eq!(array["description"], "Array(2)");
    assert_ne!(object["objectId"], array["objectId"]);
    Ok(())
}

#[tokio::test]
async fn test_wait_for_selector_hidden() -> Result<()> {
    let engine = engine();
    let mut client = Client::open(engine.clone()).await?;
    let context = client.root().await?;
    client
        .result(
            1,
            "browsingContext.navigate",
            json!({ "context": context, "url": "data:text/html,<div id=spinner></div>" }),
        )
        .await?;

    let hider = {
        let context = bidi_server::ContextId::new(context.clone());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            engine.set_visible(&context, "#spinner", false)
        })
    };

    let started = Instant::now();
    let (_, response) = client
        .command(
            2,
            "browsingContext.waitForSelector",
            json!({ "context": context, "selector": "#spinner", "hidden": true, "timeout": 3000 }),
        )
        .await?;
    assert_eq!(response, json!({ "id": 2, "result": {} }));
    assert!(started.elapsed() < Duration::from_millis(2000));
    hider.await??;
    Ok(())
}

#[tokio::test]
async fn test_select_and_type() -> Result<()> {
    let mut client = Client::open(engine()).await?;
    let context = client.root().await?;
    client
        .result(
            1,
            "browsingContext.navigate",
            json!({ "context": context, "url": "data:text/html,<input id=name>" }),
        )
        .await?;

    let node = client
        .result(
            2,
            "browsingContext.selectElement",
            json!({ "context": context, "selector": "#name" }),
        )
        .await?;
    let element = json!({ "objectId": node["objectId"] });

    client
        .result(3, "browsingContext.click", json!({ "context": context, "element": element }))
        .await?;
    client
        .result(
            4,
            "browsingContext.type",
            json!({ "context": context, "element": element, "text": "ferris" }),
        )
        .await?;

    let value = client
        .result(
            5,
            "browsingContext.evaluate",
            json!({
                "context": context,
                "function": "(element) => element.value",
                "args": [element]
            }),
        )
        .await?;
    assert_eq!(value, json!("\"ferris\""));
    Ok(())
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[tokio::test]
async fn test_disconnect_releases_pages() -> Result<()> {
    let engine = engine();
    let url = start(engine.clone(), ProtocolProfile::Current).await?;

    let mut client = Client::connect(&url).await?;
    client.result(1, "browsingContext.create", json!({})).await?;
    assert_eq!(engine.page_count(), 2);
    client.ws.close(None).await?;
    drop(client);

    let deadline = Instant::now() + RECV_TIMEOUT;
    while engine.page_count() > 0 {
        assert!(Instant::now() < deadline, "pages were not released");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let mut second = Client::connect(&url).await?;
    let status = second.result(1, "session.status", json!({})).await?;
    assert_eq!(status["ready"], true);
    Ok(())
}
