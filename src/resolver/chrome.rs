use crate::config::BrowserConfig;
use crate::resolver::DynamicResolver;
use anyhow::{Context, Result};
use async_trait::async_trait;
use anyhow::anyhow;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Headless Chrome backed resolver
///
/// The browser API is blocking, so every call runs on tokio's blocking pool
/// with its own tab.
#[derive(Clone)]
pub struct ChromeResolver {
    browser: Arc<Browser>,
    config: BrowserConfig,
}

impl ChromeResolver {
    /// Launches the browser
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser: Arc::new(browser),
            config: config.clone(),
        })
    }

    fn unmask_blocking(&self, url: &str) -> Result<Option<String>> {
        let tab = self.browser.new_tab().context("Failed to open tab")?;

        let result = with_tab(tab, |tab| {
            tab.navigate_to(url)?;
            tab.wait_until_navigated()?;

            tab.wait_for_element(&self.config.phone_button_selector)
                .context("Phone button did not appear")?
                .click()?;
            thread::sleep(Duration::from_millis(self.config.settle_ms));

            let script = format!(
                "(() => {{ const el = document.querySelector({}); return el ? el.innerHTML : null; }})()",
                js_string(&self.config.phone_container_selector)
            );
            Ok(tab.evaluate(&script, false)?)
        })?;

        Ok(result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.trim().is_empty()))
    }

    fn lookup_blocking(&self, request_url: &str, body: &str) -> Result<Option<[f64; 2]>> {
        let target = Url::parse(request_url).context("Invalid location lookup URL")?;
        let tab = self.browser.new_tab().context("Failed to open tab")?;

        let result = with_tab(tab, |tab| {
            // Same origin as the lookup so the page's cookies go along
            tab.navigate_to(target.origin().ascii_serialization().as_str())?;
            tab.wait_until_navigated()?;

            let script = format!(
                r#"fetch({}, {{
                    method: "POST",
                    headers: {{ "Content-Type": "application/x-www-form-urlencoded; charset=UTF-8" }},
                    body: {}
                }}).then(r => r.ok ? r.text() : null)"#,
                js_string(target.as_str()),
                js_string(body)
            );
            Ok(tab.evaluate(&script, true)?)
        })?;

        Ok(result
            .value
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_coordinates_payload))
    }
}

#[async_trait]
impl DynamicResolver for ChromeResolver {
    async fn unmask_phone_numbers(&self, url: &str, html: &str) -> Result<Option<String>> {
        if !has_element(html, &self.config.phone_button_selector)? {
            debug!(url = %url, "No phone button on page");
            return Ok(None);
        }

        let this = self.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || this.unmask_blocking(&url))
            .await
            .context("Browser task panicked")?
    }

    async fn lookup_location(
        &self,
        request_url: &str,
        location_type: &str,
        location_id: &str,
    ) -> Result<Option<[f64; 2]>> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("locationType", location_type)
            .append_pair("locationId", location_id)
            .finish();

        let this = self.clone();
        let request_url = request_url.to_string();
        tokio::task::spawn_blocking(move || this.lookup_blocking(&request_url, &body))
            .await
            .context("Browser task panicked")?
    }
}

/// A browser tab that must be closed once its work is done
trait CloseTab {
    fn close_tab(&self) -> Result<()>;
}

impl CloseTab for Arc<Tab> {
    fn close_tab(&self) -> Result<()> {
        self.close(false).map(|_| ())
    }
}

/// Runs `body` against `tab`, then closes the tab whether or not `body`
/// succeeded. A failed close is logged and never replaces the body's result.
fn with_tab<T: CloseTab, R>(tab: T, body: impl FnOnce(&T) -> Result<R>) -> Result<R> {
    let result = body(&tab);
    if let Err(e) = tab.close_tab() {
        warn!("Failed to close browser tab: {:#}", e);
    }
    result
}

fn has_element(html: &str, css: &str) -> Result<bool> {
    let sel = Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))?;
    Ok(Html::parse_document(html).select(&sel).next().is_some())
}

/// Quotes `s` as a JavaScript string literal
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Reads `[lat, lon]` out of a location lookup response
///
/// Accepts `lat`/`lon`, `lat`/`lng` or `latitude`/`longitude` keys, holding
/// either numbers or numeric strings, at the top level or one object deep.
pub fn parse_coordinates_payload(text: &str) -> Option<[f64; 2]> {
    let value: Value = serde_json::from_str(text).ok()?;
    coordinates_in(&value).or_else(|| {
        value
            .as_object()?
            .values()
            .filter(|v| v.is_object())
            .find_map(coordinates_in)
    })
}

fn coordinates_in(value: &Value) -> Option<[f64; 2]> {
    let obj = value.as_object()?;
    let lat = ["lat", "latitude"].iter().find_map(|k| number(obj.get(*k)?))?;
    let lon = ["lon", "lng", "longitude"]
        .iter()
        .find_map(|k| number(obj.get(*k)?))?;
    Some([lat, lon])
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
