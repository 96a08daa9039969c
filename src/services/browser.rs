// src/services/browser.rs

//! Headless Chrome session for the generic crawler.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headless_chrome::browser::default_executable;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::{AppError, Result};
use crate::models::BrowserConfig;
use crate::services::crawler::{DriverFactory, PageDriver};

const LOAD_MORE_SCRIPT: &str = r#"(() => {
  const control = [...document.querySelectorAll('button, a[role="button"]')]
    .find(el => /^(load|show|see|view) more/i.test((el.innerText || '').trim()));
  if (!control) return false;
  control.click();
  return true;
})()"#;

/// One browser process with one tab.
///
/// Dropping the session closes the tab and kills the process; the browser's
/// idle timeout covers a caller that leaks it.
pub struct BrowserSession {
    tab: Arc<Tab>,
    settle: Duration,
    _browser: Browser,
}

impl BrowserSession {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let path = config
            .chrome_path
            .clone()
            .or_else(|| default_executable().ok());

        let options = LaunchOptions {
            headless: config.headless,
            sandbox: true,
            path,
            idle_browser_timeout: Duration::from_secs(config.idle_timeout_secs),
            ..Default::default()
        };

        let browser = Browser::new(options).map_err(AppError::browser)?;
        let tab = browser.new_tab().map_err(AppError::browser)?;
        log::debug!("Browser session started");

        Ok(Self {
            tab,
            settle: Duration::from_millis(config.settle_ms),
            _browser: browser,
        })
    }

    fn settle(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }
}

impl PageDriver for BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(AppError::browser)?;
        self.settle();
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn content(&self) -> Result<String> {
        self.tab.get_content().map_err(AppError::browser)
    }

    fn load_more(&mut self) -> Result<bool> {
        let clicked = self
            .tab
            .evaluate(LOAD_MORE_SCRIPT, false)
            .map_err(AppError::browser)?
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if clicked {
            self.settle();
        }
        Ok(clicked)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            log::debug!("Tab close failed: {}", e);
        }
        log::debug!("Browser session released");
    }
}

/// Launches a fresh Chrome per company.
pub struct ChromeFactory {
    config: BrowserConfig,
}

impl ChromeFactory {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

impl DriverFactory for ChromeFactory {
    fn open(&self) -> Result<Box<dyn PageDriver + Send>> {
        Ok(Box::new(BrowserSession::launch(&self.config)?))
    }
}
