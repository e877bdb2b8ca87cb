//! W3C WebDriver client
//!
//! Speaks the WebDriver wire protocol to a chromedriver (or any compliant
//! remote end) over plain HTTP+JSON.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{DriverError, ElementRef, Locator, PageDriver, SessionFactory};

/// Key under which the W3C protocol serialises element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4ae6d6fe3dbb";

/// W3C error codes that mean the browser or window is gone
const SESSION_LOST_ERRORS: [&str; 3] = ["invalid session id", "no such window", "session not created"];

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

#[derive(Clone)]
pub struct WebDriverFactory {
    client: Client,
    base_url: String,
    browser_args: Vec<String>,
}

impl WebDriverFactory {
    pub fn new(base_url: String, headless: bool) -> Result<Self, DriverError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let mut browser_args: Vec<String> = [
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--start-maximized",
            "--incognito",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        if headless {
            browser_args.push("--headless=new".to_string());
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            browser_args,
        })
    }

    fn capabilities(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": self.browser_args }
                }
            }
        })
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let url = format!("{}/session", self.base_url);
        let value = send(&self.client, Method::POST, &url, Some(self.capabilities())).await?;

        let session: NewSession = serde_json::from_value(value)
            .map_err(|e| DriverError::UnexpectedResponse(format!("new session: {}", e)))?;

        tracing::debug!(session_id = %session.session_id, "Opened browser session");

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.base_url, session.session_id),
            closed: false,
        }))
    }
}

pub struct WebDriverSession {
    client: Client,
    session_url: String,
    closed: bool,
}

impl WebDriverSession {
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        if self.closed {
            return Err(DriverError::SessionLost("session already closed".to_string()));
        }
        let url = format!("{}{}", self.session_url, path);
        send(&self.client, method, &url, body).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, DriverError> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> Result<Value, DriverError> {
        self.command(Method::GET, path, None).await
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.post("/url", json!({ "url": url })).await.map(|_| ())
    }

    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementRef>, DriverError> {
        match self.post("/element", locator_body(locator)).await {
            Ok(value) => element_ref(&value).map(Some),
            Err(DriverError::Protocol { error, .. }) if error == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        let value = self.post("/elements", locator_body(locator)).await?;
        value
            .as_array()
            .ok_or_else(|| DriverError::UnexpectedResponse("elements: expected array".to_string()))?
            .iter()
            .map(element_ref)
            .collect()
    }

    async fn text(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        let value = self.get(&format!("/element/{}/text", element.0)).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::UnexpectedResponse("text: expected string".to_string()))
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.post(&format!("/element/{}/click", element.0), json!({}))
            .await
            .map(|_| ())
    }

    async fn script_click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        let body = json!({
            "script": "arguments[0].click();",
            "args": [{ ELEMENT_KEY: element.0 }]
        });
        self.post("/execute/sync", body).await.map(|_| ())
    }

    async fn set_text(&mut self, element: &ElementRef, value: &str) -> Result<(), DriverError> {
        self.post(&format!("/element/{}/clear", element.0), json!({}))
            .await?;
        self.post(&format!("/element/{}/value", element.0), json!({ "text": value }))
            .await
            .map(|_| ())
    }

    async fn select_option(
        &mut self,
        element: &ElementRef,
        label: &str,
    ) -> Result<(), DriverError> {
        let xpath = format!(".//option[normalize-space(.)={}]", xpath_literal(label));
        let value = self
            .post(
                &format!("/element/{}/element", element.0),
                json!({ "using": "xpath", "value": xpath }),
            )
            .await?;
        let option = element_ref(&value)?;
        self.click(&option).await
    }

    async fn page_source(&mut self) -> Result<String, DriverError> {
        let value = self.get("/source").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::UnexpectedResponse("source: expected string".to_string()))
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        let result = self.command(Method::DELETE, "", None).await.map(|_| ());
        self.closed = true;
        result
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, DriverError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let mut payload: Value = response.json().await?;
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let wire: WireError = serde_json::from_value(value).map_err(|e| {
        DriverError::UnexpectedResponse(format!("HTTP {} without error body: {}", status, e))
    })?;
    Err(classify_error(status.as_u16(), wire))
}

fn classify_error(status: u16, wire: WireError) -> DriverError {
    if SESSION_LOST_ERRORS.contains(&wire.error.as_str()) {
        DriverError::SessionLost(wire.message)
    } else {
        DriverError::Protocol {
            status,
            error: wire.error,
            message: wire.message,
        }
    }
}

fn locator_body(locator: &Locator) -> Value {
    let (using, value) = match locator {
        Locator::Css(v) => ("css selector", v.to_string()),
        Locator::XPath(v) => ("xpath", v.to_string()),
        Locator::Id(v) => ("css selector", format!("[id=\"{}\"]", v)),
        Locator::Name(v) => ("css selector", format!("[name=\"{}\"]", v)),
    };
    json!({ "using": using, "value": value })
}

fn element_ref(value: &Value) -> Result<ElementRef, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
        .ok_or_else(|| DriverError::UnexpectedResponse(format!("not an element: {}", value)))
}

/// Quote `s` for use inside an XPath expression
fn xpath_literal(s: &str) -> String {
    if !s.contains('"') {
        format!("\"{}\"", s)
    } else if !s.contains('\'') {
        format!("'{}'", s)
    } else {
        let parts: Vec<String> = s.split('"').map(|p| format!("\"{}\"", p)).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}
