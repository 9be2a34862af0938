//! One-time code verification and the resend cooldown.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument};

use bbqstyle_core::{MobileNumber, OtpCode};

use crate::api::ApiError;
use crate::state::Storefront;

/// Sends and checks one-time codes.
pub struct OtpService<'a> {
    state: &'a Storefront,
}

impl<'a> OtpService<'a> {
    #[must_use]
    pub const fn new(state: &'a Storefront) -> Self {
        Self { state }
    }

    /// Text a code to `mobile`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not issue the code.
    #[instrument(skip(self, mobile), fields(mobile = %mobile.masked()))]
    pub async fn send(&self, mobile: &MobileNumber) -> Result<(), ApiError> {
        self.state.api().send_otp(mobile).await
    }

    /// Check a code. `Ok(false)` means wrong or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails.
    #[instrument(skip(self, mobile, code), fields(mobile = %mobile.masked()))]
    pub async fn verify(&self, mobile: &MobileNumber, code: &OtpCode) -> Result<bool, ApiError> {
        self.state.api().verify_otp(mobile, code).await
    }

    /// A cooldown of the configured length, not yet started.
    #[must_use]
    pub fn cooldown(&self) -> ResendCooldown {
        ResendCooldown::new(self.state.config().otp_resend_cooldown)
    }
}

/// Countdown that keeps the resend button disabled after each send.
#[derive(Debug, Clone, Copy)]
pub struct ResendCooldown {
    period: Duration,
    started: Option<Instant>,
}

impl ResendCooldown {
    pub const LABEL: &'static str = "Resend OTP";

    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            started: None,
        }
    }

    /// Start or restart the countdown from the full period.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Time left before a resend is allowed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.started.map_or(Duration::ZERO, |started| {
            self.period.saturating_sub(started.elapsed())
        })
    }

    /// Whole seconds left, rounded up.
    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Button label: `Resend OTP (42s)` while counting, `Resend OTP` after.
    #[must_use]
    pub fn label(&self) -> String {
        match self.remaining_secs() {
            0 => Self::LABEL.to_owned(),
            secs => format!("{} ({secs}s)", Self::LABEL),
        }
    }

    /// Call `on_tick` with the seconds left once per second, ending with a
    /// call for zero.
    pub async fn tick_until_ready<F>(&self, mut on_tick: F)
    where
        F: FnMut(u64),
    {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let secs = self.remaining_secs();
            on_tick(secs);
            if secs == 0 {
                debug!("Resend cooldown finished");
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_disabled_for_exactly_the_period() {
        let mut cooldown = ResendCooldown::new(Duration::from_secs(60));
        assert!(cooldown.is_ready());
        assert_eq!(cooldown.label(), "Resend OTP");

        cooldown.start();
        assert_eq!(cooldown.label(), "Resend OTP (60s)");

        tokio::time::advance(Duration::from_millis(59_500)).await;
        assert!(!cooldown.is_ready());
        assert_eq!(cooldown.label(), "Resend OTP (1s)");

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(cooldown.is_ready());
        assert_eq!(cooldown.label(), "Resend OTP");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_countdown() {
        let mut cooldown = ResendCooldown::new(Duration::from_secs(60));
        cooldown.start();
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(cooldown.remaining_secs(), 15);

        cooldown.start();
        assert_eq!(cooldown.remaining_secs(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let mut cooldown = ResendCooldown::new(Duration::from_secs(3));
        cooldown.start();
        let mut seen = Vec::new();
        cooldown.tick_until_ready(|secs| seen.push(secs)).await;
        assert_eq!(seen, vec![3, 2, 1, 0]);
    }
}
