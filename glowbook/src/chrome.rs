//! CDP-backed page driver.
//!
//! Attaches to a page in an already-running Chrome started with
//! `--remote-debugging-port`; launching and configuring the browser is
//! the operator's business. Element search runs as in-page JavaScript
//! over the document and every same-origin iframe (the booking widget
//! lives in one), returning remote object handles that clicks and fills
//! act on via `Runtime.callFunctionOn`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cdp::{CdpClient, CdpEvent};
use crate::driver::{ElementHandle, PageDriver};
use crate::errors::BookingError;
use crate::interceptor::{ResponseInterceptor, STARTUP_URL_MARKER};
use crate::selector::Selector;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const TEXT_FN: &str = "function() { return (this.innerText || this.textContent || '').trim(); }";

const FILL_FN: &str = r#"function(value) {
  this.focus();
  this.value = value;
  this.dispatchEvent(new Event('input', { bubbles: true }));
  this.dispatchEvent(new Event('change', { bubbles: true }));
}"#;

const CLICK_FN: &str = r#"function() {
  const r = this.getBoundingClientRect();
  if (r.width === 0 || r.height === 0) { throw new Error('element is not visible'); }
  this.scrollIntoView({ block: 'center' });
  this.click();
}"#;

const FORCE_CLICK_FN: &str = r#"function() {
  this.scrollIntoView({ block: 'center' });
  this.click();
}"#;

/// A debuggable target as listed by the DevTools `/json` endpoint.
#[derive(Debug, serde::Deserialize)]
struct TargetInfo {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    url: String,
    #[serde(default, rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
}

/// A live page attached over CDP.
pub struct ChromePage {
    client: Arc<CdpClient>,
    /// Extra delay before every driven action; zero disables it.
    slow_mo: Duration,
    observer: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ChromePage {
    /// Discover a page target whose URL contains `url_filter` via the
    /// DevTools `/json` endpoint and attach to it.
    pub async fn attach(
        port: u16,
        url_filter: &str,
        slow_mo: Duration,
        interceptor: ResponseInterceptor,
    ) -> Result<Self, BookingError> {
        let endpoint = format!("http://127.0.0.1:{port}/json");
        let targets: Vec<TargetInfo> = reqwest::get(&endpoint)
            .await
            .map_err(|e| BookingError::Connection {
                url: endpoint.clone(),
                reason: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| BookingError::Connection {
                url: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let target = targets
            .into_iter()
            .find(|t| t.kind == "page" && t.url.contains(url_filter))
            .ok_or_else(|| BookingError::Connection {
                url: endpoint.clone(),
                reason: format!("no page target matching {url_filter:?}"),
            })?;

        let ws_url = target
            .web_socket_debugger_url
            .ok_or_else(|| BookingError::Connection {
                url: endpoint,
                reason: "target has no webSocketDebuggerUrl".to_string(),
            })?;

        info!(url = %target.url, "attaching to page target");
        Self::connect(&ws_url, slow_mo, interceptor).await
    }

    /// Attach to a known DevTools WebSocket URL.
    pub async fn connect(
        ws_url: &str,
        slow_mo: Duration,
        interceptor: ResponseInterceptor,
    ) -> Result<Self, BookingError> {
        let (client, events) = CdpClient::connect(ws_url).await?;
        let client = Arc::new(client);

        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;
        client.enable_domain("Network").await?;

        let observer = tokio::spawn(observe_responses(events, client.clone(), interceptor));

        Ok(Self {
            client,
            slow_mo,
            observer: std::sync::Mutex::new(Some(observer)),
        })
    }

    /// Release the page: stop the response observer and close the
    /// WebSocket. Safe to call more than once.
    pub async fn close(&self) {
        if let Some(handle) = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.client.close().await;
    }

    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    /// Evaluate an expression expecting a DOM node; `None` when it
    /// evaluates to undefined.
    async fn eval_object(&self, expression: &str) -> Result<Option<String>, BookingError> {
        let result = self
            .client
            .send_command(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": false }),
            )
            .await?;
        check_exception(&result)?;
        Ok(result
            .pointer("/result/objectId")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Evaluate an expression by value.
    async fn eval_value(&self, expression: &str) -> Result<Value, BookingError> {
        let result = self
            .client
            .send_command(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;
        check_exception(&result)?;
        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    /// Call a function with a remote object as `this`.
    async fn call_on(
        &self,
        object_id: &str,
        function: &str,
        arguments: Value,
    ) -> Result<Value, BookingError> {
        let result = self
            .client
            .send_command(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object_id,
                    "functionDeclaration": function,
                    "arguments": arguments,
                    "returnByValue": true,
                }),
            )
            .await?;
        check_exception(&result)?;
        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    async fn handle_at(
        &self,
        selector: &Selector,
        index: usize,
    ) -> Result<Option<ElementHandle>, BookingError> {
        let script = build_search_script(selector, &format!("matches[{index}]"))?;
        let Some(object_id) = self.eval_object(&script).await? else {
            return Ok(None);
        };
        let text = self
            .call_on(&object_id, TEXT_FN, json!([]))
            .await
            .ok()
            .and_then(|v| v.as_str().map(str::to_string));
        Ok(Some(ElementHandle { object_id, text }))
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn find_element(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<ElementHandle, BookingError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(handle) = self.handle_at(selector, 0).await? {
                return Ok(handle);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BookingError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_elements(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>, BookingError> {
        let count_script = build_search_script(selector, "matches.length")?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let count = self
                .eval_value(&count_script)
                .await?
                .as_u64()
                .unwrap_or(0) as usize;

            if count > 0 {
                let mut handles = Vec::with_capacity(count);
                for index in 0..count {
                    // An element can detach between the count and the
                    // fetch; skip the gap rather than failing the batch.
                    if let Some(handle) = self.handle_at(selector, index).await? {
                        handles.push(handle);
                    }
                }
                if !handles.is_empty() {
                    return Ok(handles);
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(BookingError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, element: &ElementHandle, force: bool) -> Result<(), BookingError> {
        self.pace().await;
        debug!(text = ?element.text, force, "clicking element");
        let function = if force { FORCE_CLICK_FN } else { CLICK_FN };
        self.call_on(&element.object_id, function, json!([]))
            .await
            .map(|_| ())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<(), BookingError> {
        self.pace().await;
        debug!(text = ?element.text, "filling element");
        self.call_on(&element.object_id, FILL_FN, json!([{ "value": text }]))
            .await
            .map(|_| ())
    }
}

/// Consume protocol events and feed startup responses to the
/// interceptor. Bodies are fetched only after `Network.loadingFinished`;
/// at `responseReceived` they may still be streaming.
async fn observe_responses(
    mut events: mpsc::UnboundedReceiver<CdpEvent>,
    client: Arc<CdpClient>,
    interceptor: ResponseInterceptor,
) {
    let mut pending: HashMap<String, String> = HashMap::new();

    while let Some(event) = events.recv().await {
        match event.method.as_str() {
            "Network.responseReceived" => {
                let url = event
                    .params
                    .pointer("/response/url")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !url.contains(STARTUP_URL_MARKER) {
                    continue;
                }
                if let Some(request_id) = event.params.get("requestId").and_then(Value::as_str) {
                    pending.insert(request_id.to_string(), url.to_string());
                }
            }
            "Network.loadingFinished" => {
                let Some(request_id) = event.params.get("requestId").and_then(Value::as_str)
                else {
                    continue;
                };
                let Some(url) = pending.remove(request_id) else {
                    continue;
                };

                let result = client
                    .send_command("Network.getResponseBody", json!({ "requestId": request_id }))
                    .await;
                let result = match result {
                    Ok(r) => r,
                    Err(err) => {
                        warn!(url = %url, error = %err, "could not fetch startup response body");
                        continue;
                    }
                };

                let raw = result
                    .get("body")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let body = if result
                    .get("base64Encoded")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
                {
                    match BASE64.decode(raw).map(String::from_utf8) {
                        Ok(Ok(decoded)) => decoded,
                        _ => {
                            warn!(url = %url, "startup response body was not valid base64 text");
                            continue;
                        }
                    }
                } else {
                    raw.to_string()
                };

                match serde_json::from_str::<Value>(&body) {
                    Ok(value) => interceptor.handle_response(&url, &value),
                    Err(err) => warn!(url = %url, error = %err, "startup response body was not JSON"),
                }
            }
            _ => {}
        }
    }
    debug!("response observer stopped");
}

fn check_exception(result: &Value) -> Result<(), BookingError> {
    if let Some(exception) = result.get("exceptionDetails") {
        let message = exception
            .pointer("/exception/description")
            .and_then(Value::as_str)
            .or_else(|| exception.get("text").and_then(Value::as_str))
            .unwrap_or("unknown exception")
            .to_string();
        return Err(BookingError::JsException(message));
    }
    Ok(())
}

/// Quote a string as a JS literal.
fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// CSS covering a widget role, including its implicit-role elements.
fn role_css(role: &str) -> String {
    match role {
        "button" => r#"button, [role="button"], input[type="button"], input[type="submit"]"#
            .to_string(),
        "link" => r#"a, [role="link"]"#.to_string(),
        "textbox" => r#"input, textarea, [role="textbox"]"#.to_string(),
        "checkbox" => r#"input[type="checkbox"], [role="checkbox"]"#.to_string(),
        other => format!(r#"[role="{other}"]"#),
    }
}

/// A JS boolean expression over `el` for one selector.
fn js_condition(selector: &Selector) -> Result<String, BookingError> {
    match selector {
        Selector::Text(t) => Ok(format!("text(el) === {}", js_str(t))),
        Selector::TextContains(t) => Ok(format!("text(el).includes({})", js_str(t))),
        Selector::Css(css) => Ok(format!("el.matches({})", js_str(css))),
        Selector::Role { role, name } => {
            let matches = format!("el.matches({})", js_str(&role_css(role)));
            match name {
                Some(name) => Ok(format!("({matches}) && accName(el) === {}", js_str(name))),
                None => Ok(matches),
            }
        }
        Selector::And(parts) => {
            if parts.is_empty() {
                return Err(BookingError::InvalidSelector(
                    "empty conjunction".to_string(),
                ));
            }
            let conditions = parts
                .iter()
                .map(js_condition)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({})", conditions.join(") && (")))
        }
        Selector::Invalid(reason) => Err(BookingError::InvalidSelector(reason.clone())),
    }
}

/// Build the in-page search script. Matches are visible elements
/// satisfying the selector, reduced to the deepest ones so a text match
/// lands on the label, not its containers; `ret` picks what the
/// expression yields (an element by index, or the match count).
fn build_search_script(selector: &Selector, ret: &str) -> Result<String, BookingError> {
    let condition = js_condition(selector)?;
    Ok(format!(
        r#"(() => {{
  const docs = [document];
  for (const frame of document.querySelectorAll('iframe')) {{
    try {{ if (frame.contentDocument) docs.push(frame.contentDocument); }} catch (_) {{}}
  }}
  const text = (el) => (el.innerText || el.textContent || '').trim();
  const accName = (el) =>
    el.getAttribute('aria-label')
    || (el.labels && el.labels[0] && text(el.labels[0]))
    || el.getAttribute('placeholder')
    || text(el);
  const visible = (el) => {{
    const r = el.getBoundingClientRect();
    return r.width > 0 && r.height > 0;
  }};
  const all = [];
  for (const doc of docs) {{
    for (const el of doc.querySelectorAll('*')) {{
      if (!visible(el)) continue;
      if ({condition}) all.push(el);
    }}
  }}
  const matches = all.filter((m) => !all.some((o) => o !== m && m.contains(o)));
  return {ret};
}})()"#
    ))
}
