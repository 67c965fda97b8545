// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Exponential backoff with jitter for connection attempts.
//!
//! The delay grows by a constant factor on each attempt up to a configured
//! maximum. Random jitter is added to every delay so that several servers
//! restarting together do not hammer the switch in lockstep.

use std::time::Duration;

use rand::RngExt;

/// Successive delays between connection attempts.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    /// The delay before the second attempt.
    delay_initial: Duration,
    /// The upper bound on the base delay.
    delay_max: Duration,
    /// The base delay for the next call to [`Self::next_duration`].
    delay_current: Duration,
    /// The factor to multiply the delay on each iteration.
    factor: f64,
    /// The maximum random jitter to add (in milliseconds).
    jitter_ms: u64,
    /// The number of delays handed out since creation or the last reset.
    attempts: u32,
}

impl ExponentialBackoff {
    /// Creates a new [`ExponentialBackoff`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `factor` is not finite or below 1.0, or if
    /// `delay_max` is shorter than `delay_initial`.
    pub fn new(
        delay_initial: Duration,
        delay_max: Duration,
        factor: f64,
        jitter_ms: u64,
    ) -> anyhow::Result<Self> {
        if !factor.is_finite() || factor < 1.0 {
            anyhow::bail!("Backoff factor must be finite and >= 1.0, was {factor}");
        }
        if delay_max < delay_initial {
            anyhow::bail!(
                "Maximum delay {delay_max:?} is shorter than the initial delay {delay_initial:?}"
            );
        }

        Ok(Self {
            delay_initial,
            delay_max,
            delay_current: delay_initial,
            factor,
            jitter_ms,
            attempts: 0,
        })
    }

    /// Returns the next delay with jitter and grows the base delay.
    pub fn next_duration(&mut self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.jitter_ms)
        };
        let delay = self.delay_current + Duration::from_millis(jitter);

        let next = Duration::try_from_secs_f64(self.delay_current.as_secs_f64() * self.factor)
            .unwrap_or(self.delay_max);
        self.delay_current = next.max(self.delay_current).min(self.delay_max);
        self.attempts = self.attempts.saturating_add(1);

        delay
    }

    /// Resets the backoff to its initial state.
    pub const fn reset(&mut self) {
        self.delay_current = self.delay_initial;
        self.attempts = 0;
    }

    /// Returns the base delay (without jitter) of the next call to [`Self::next_duration`].
    #[must_use]
    pub const fn current_delay(&self) -> Duration {
        self.delay_current
    }

    /// Returns the number of delays handed out since creation or the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[rstest]
    fn test_exponential_growth_capped_at_max() {
        let mut backoff = ExponentialBackoff::new(ms(100), ms(500), 2.0, 0).unwrap();

        let delays: Vec<Duration> = (0..5).map(|_| backoff.next_duration()).collect();

        assert_eq!(delays, vec![ms(100), ms(200), ms(400), ms(500), ms(500)]);
        assert_eq!(backoff.attempts(), 5);
    }

    #[rstest]
    fn test_jitter_bounds() {
        let mut backoff = ExponentialBackoff::new(ms(100), ms(100), 1.0, 50).unwrap();

        for _ in 0..100 {
            let delay = backoff.next_duration();
            assert!(delay >= ms(100) && delay <= ms(150), "{delay:?}");
        }
    }

    #[rstest]
    fn test_reset() {
        let mut backoff = ExponentialBackoff::new(ms(100), ms(1_000), 3.0, 0).unwrap();
        backoff.next_duration();
        backoff.next_duration();
        assert_eq!(backoff.current_delay(), ms(900));

        backoff.reset();

        assert_eq!(backoff.current_delay(), ms(100));
        assert_eq!(backoff.attempts(), 0);
    }

    #[rstest]
    #[case(0.5, 100, 200)]
    #[case(f64::NAN, 100, 200)]
    #[case(f64::INFINITY, 100, 200)]
    #[case(2.0, 300, 200)]
    fn test_invalid_parameters(#[case] factor: f64, #[case] initial: u64, #[case] max: u64) {
        assert!(ExponentialBackoff::new(ms(initial), ms(max), factor, 0).is_err());
    }
}
