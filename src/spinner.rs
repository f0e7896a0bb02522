//! Busy-indicator policy
//!
//! [`SpinnerPolicy`] decides per URL whether a spinner is shown and how long
//! its dismissal is held back; [`SpinnerConsumer`] keeps the visible count for
//! the dispatcher so every `show()` is paired with exactly one
//! `pop_activity()`.

use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_EXTEND_DELAY: Duration = Duration::from_secs(3);

/// UI busy indicator supplied by the host application
pub trait NetworkSpinner: Send + Sync {
    fn show(&self);
    fn pop_activity(&self);
}

/// Spinner that only logs, for hosts without a UI
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSpinner;

impl NetworkSpinner for LoggingSpinner {
    fn show(&self) {
        info!("Spinner show");
    }

    fn pop_activity(&self) {
        info!("Spinner pop");
    }
}

#[derive(Debug, Clone)]
pub struct SpinnerPolicy {
    suppressed: Vec<Regex>,
    extend_delay_paths: Vec<String>,
    dismiss_delay: Duration,
    extend_delay: Duration,
}

impl SpinnerPolicy {
    /// Compile a policy; suppressed paths are regular expressions
    pub fn new<S, E>(
        suppressed_paths: S,
        extend_delay_paths: E,
        dismiss_delay: Duration,
        extend_delay: Duration,
    ) -> Result<Self, regex::Error>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let suppressed = suppressed_paths
            .into_iter()
            .map(|path| Regex::new(path.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            suppressed,
            extend_delay_paths: extend_delay_paths.into_iter().map(Into::into).collect(),
            dismiss_delay,
            extend_delay,
        })
    }

    /// Policy that suppresses and extends nothing
    pub fn with_delays(dismiss_delay: Duration, extend_delay: Duration) -> Self {
        Self {
            suppressed: Vec::new(),
            extend_delay_paths: Vec::new(),
            dismiss_delay,
            extend_delay,
        }
    }

    pub fn should_show(&self, url: &Url) -> bool {
        let absolute = url.as_str();
        !self.suppressed.iter().any(|pattern| pattern.is_match(absolute))
    }

    pub fn should_extend_delay(&self, url: &Url) -> bool {
        let absolute = url.as_str();
        self.extend_delay_paths
            .iter()
            .any(|path| absolute.contains(path.as_str()))
    }

    pub fn dismiss_delay(&self) -> Duration {
        self.dismiss_delay
    }

    pub fn extend_delay(&self) -> Duration {
        self.extend_delay
    }

    /// How long to hold the spinner after the request for `url` finishes
    pub fn dismissal_delay_for(&self, url: &Url) -> Duration {
        if self.should_extend_delay(url) {
            self.extend_delay
        } else {
            self.dismiss_delay
        }
    }
}

impl Default for SpinnerPolicy {
    fn default() -> Self {
        Self::with_delays(DEFAULT_DISMISS_DELAY, DEFAULT_EXTEND_DELAY)
    }
}

/// Visible-count bookkeeping around a [`NetworkSpinner`]
///
/// Owned by the dispatcher's control task; not shared.
pub struct SpinnerConsumer {
    spinner: Arc<dyn NetworkSpinner>,
    policy: SpinnerPolicy,
    visible: usize,
}

impl SpinnerConsumer {
    pub fn new(spinner: Arc<dyn NetworkSpinner>, policy: SpinnerPolicy) -> Self {
        Self {
            spinner,
            policy,
            visible: 0,
        }
    }

    /// Show the spinner when policy allows; returns whether it was shown
    pub fn show_if_required(&mut self, url: &Url) -> bool {
        if !self.policy.should_show(url) {
            debug!(%url, "Spinner suppressed by policy");
            return false;
        }
        self.visible += 1;
        self.spinner.show();
        true
    }

    pub fn dismissal_delay_for(&self, url: &Url) -> Duration {
        self.policy.dismissal_delay_for(url)
    }

    /// Dismiss one previously shown spinner
    pub fn pop_activity(&mut self) {
        if self.visible == 0 {
            debug!("Spinner pop with nothing visible, ignoring");
            return;
        }
        self.visible -= 1;
        self.spinner.pop_activity();
    }

    pub fn visible(&self) -> usize {
        self.visible
    }
}
