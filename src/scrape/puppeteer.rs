use std::{
    ffi::OsStr,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use headless_chrome::{Browser, Element, LaunchOptions, Tab, browser::tab::NoElementFound};
use serde_json::Value;

/// Browser settings for one scraping run.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub headless: bool,
    pub sandbox: bool,
    /// Hardware acceleration; off unless asked for.
    pub gpu: bool,
    /// Upper bound for every DOM wait; exceeding it aborts the run.
    pub timeout: Duration,
    /// Pause after moving to the next table page.
    pub page_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: false,
            sandbox: false,
            gpu: false,
            timeout: Duration::from_secs(10),
            page_delay: Duration::from_secs(1),
        }
    }
}

/// A browser process with a single tab. The process is killed when the
/// session is dropped, whichever way the scrape ends.
pub struct Session {
    pub(super) config: SessionConfig,
    pub(super) tab: Arc<Tab>,
    _browser: Browser,
}

impl Session {
    pub fn launch(config: SessionConfig) -> anyhow::Result<Self> {
        let browser = Browser::new(LaunchOptions {
            args: launch_args(&config),
            headless: config.headless,
            sandbox: config.sandbox,
            idle_browser_timeout: Duration::from_secs(300),
            ..LaunchOptions::default()
        })?;
        let tab = first_tab(&browser)?;

        tracing::info!(target: "scrape", "browser launched (headless = {})", config.headless);
        Ok(Self {
            config,
            tab,
            _browser: browser,
        })
    }

    pub fn navigate(&self, url: &str) -> anyhow::Result<()> {
        tracing::debug!(target: "scrape", "navigating to {url}");
        self.tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    /// Polls for `selector` until it shows up or the configured timeout passes.
    pub fn wait_for(&self, selector: &str) -> anyhow::Result<Element<'_>> {
        const PERIOD: Duration = Duration::from_millis(1832 / 4);

        let deadline = deadline_after(self.config.timeout);
        loop {
            match self.tab.find_element(selector) {
                Ok(element) => break Ok(element),
                Err(err) => {
                    if !err.is::<NoElementFound>() {
                        break Err(err);
                    }
                }
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                anyhow::bail!(
                    "timed out after {:?} waiting for {selector:?}",
                    self.config.timeout
                );
            }
            thread::sleep(PERIOD);
        }
    }

    pub fn click(&self, selector: &str) -> anyhow::Result<()> {
        self.tab.find_element(selector)?.click()?;
        Ok(())
    }

    pub fn outer_html(&self, selector: &str) -> anyhow::Result<String> {
        self.tab.find_element(selector)?.get_content()
    }

    /// Evaluates `script` in the page; the script must produce a string.
    pub fn evaluate_string(&self, script: &str) -> anyhow::Result<String> {
        let object = self.tab.evaluate(script, false)?;

        match object.value {
            Some(Value::String(s)) => Ok(s),
            Some(value) => anyhow::bail!("not a string: {value}"),
            None => anyhow::bail!("returned nothing"),
        }
    }

    /// Clicks the consent overlay away. The overlay does not always show up,
    /// so failures only produce a warning.
    pub fn dismiss_consent(&self) {
        tracing::info!(target: "scrape", "waiting for consent banner ...");
        match self.accept_consent() {
            Ok(()) => tracing::info!(target: "scrape", "closed consent banner"),
            Err(e) => {
                tracing::warn!(target: "scrape", "no consent banner found or error closing it: {e}");
            }
        }
    }

    fn accept_consent(&self) -> anyhow::Result<()> {
        self.wait_for(".ncmp__btn")?;
        self.click(".ncmp__btn:not(.ncmp__btn-border)")
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::info!(target: "scrape", "closing browser");
    }
}

fn launch_args(config: &SessionConfig) -> Vec<&'static OsStr> {
    let mut args = vec![OsStr::new("--disable-blink-features=AutomationControlled")];
    if !config.gpu {
        args.push(OsStr::new("--disable-gpu"));
    }
    args
}

/// `None` when the timeout is too large to be represented, i.e. wait forever.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

#[allow(clippy::significant_drop_tightening)]
fn first_tab(browser: &Browser) -> anyhow::Result<Arc<Tab>> {
    let tab = browser.new_tab()?;

    {
        let tabs_guard = browser
            .get_tabs()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        for remain in &*tabs_guard {
            if !Arc::ptr_eq(&tab, remain) {
                remain.close(true)?;
            }
        }
    }

    Ok(tab)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_flag_controls_args() {
        let disable = OsStr::new("--disable-gpu");

        let config = SessionConfig::default();
        assert!(launch_args(&config).contains(&disable));

        let config = SessionConfig {
            gpu: true,
            ..SessionConfig::default()
        };
        assert!(!launch_args(&config).contains(&disable));
    }

    #[test]
    fn huge_timeout_has_no_deadline() {
        assert!(deadline_after(Duration::from_secs(u64::MAX)).is_none());
        assert!(deadline_after(Duration::MAX).is_none());
        assert!(deadline_after(Duration::from_secs(10)).is_some());
    }
}
