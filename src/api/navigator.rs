// Hosting environment navigation.
// Lets the read path send the user to the external login entry point.

use std::sync::{Mutex, PoisonError};

use reqwest::Url;
use tracing::warn;

/// Base used only to run the login path through the URL encoder.
const RELATIVE_BASE: &str = "http://localhost/";

/// Navigation capability of whatever hosts the client.
pub trait Navigator: Send + Sync {
    /// Location the user is currently looking at, used as the return target.
    fn current_location(&self) -> String;

    /// Send the user to a location outside the client.
    fn navigate_external(&self, url: &str);
}

/// Build the login URL carrying the return target.
///
/// The target is form-encoded so that `&`, `#` or spaces in a location
/// survive the round trip through the login page.
pub fn login_url(login_path: &str, return_to: &str) -> String {
    let Ok(mut url) = Url::parse(RELATIVE_BASE) else {
        return login_path.to_string();
    };
    url.set_path(login_path);
    url.query_pairs_mut().append_pair("redirect", return_to);
    format!("{}?{}", url.path(), url.query().unwrap_or_default())
}

/// Navigator for the terminal host.
///
/// A terminal cannot follow a redirect itself, so the requested URL is kept
/// until the UI shows it to the user.
pub struct SessionNavigator {
    api_url: String,
    location: Mutex<String>,
    pending: Mutex<Option<String>>,
}

impl SessionNavigator {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            location: Mutex::new("/".to_string()),
            pending: Mutex::new(None),
        }
    }

    /// Record the view the user moved to.
    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = location.into();
    }

    /// Absolute login URL requested by the last unauthorized read, if any.
    pub fn pending_login(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn dismiss_login(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Navigator for SessionNavigator {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate_external(&self, url: &str) {
        let absolute = format!("{}{}", self.api_url, url);
        warn!(url = %absolute, "sign-in required");
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(absolute);
    }
}
