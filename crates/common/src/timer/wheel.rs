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

//! A three level hierarchical timing wheel.
//!
//! Each level has 256 buckets. Level 1 buckets are one tick wide, level 2
//! buckets 256 ticks wide and level 3 buckets 65,536 ticks wide, giving a
//! horizon of 2^24 ticks (about 19 days at 100 ms per tick).
//!
//! Timers are placed by their absolute deadline tick: the level is chosen by
//! the distance to the deadline and the bucket by the deadline bits for that
//! level. When the level 1 cursor wraps, the level 2 bucket for the new epoch
//! is redistributed, and when level 2 wraps the level 3 bucket is
//! redistributed first. A timer therefore fires on exactly its deadline tick.
//!
//! A lookup table keyed by owner gives O(1) cancellation. An owner has at most
//! one pending timer; scheduling again replaces the previous one.

use std::fmt::Display;

use ahash::AHashMap;
use indexmap::IndexMap;
use ustr::Ustr;

use super::{TimeoutCallback, TimeoutEvent, TimeoutHandler};

/// The number of buckets in each wheel level.
pub const WHEEL_SIZE: usize = 256;

const WHEEL_BITS: u32 = 8;
const WHEEL_MASK: u64 = (WHEEL_SIZE as u64) - 1;

/// Timeouts shorter than this many ticks are held in level 1.
pub const LEVEL_1_SPAN: u64 = 1 << WHEEL_BITS;
/// Timeouts shorter than this many ticks are held in level 2.
pub const LEVEL_2_SPAN: u64 = 1 << (2 * WHEEL_BITS);
/// Timeouts shorter than this many ticks are held in level 3.
pub const LEVEL_3_SPAN: u64 = 1 << (3 * WHEEL_BITS);
/// The longest timeout accepted; longer requests are clamped to this.
pub const MAX_TIMEOUT_TICKS: u64 = LEVEL_3_SPAN - 1;

/// A level of the timing wheel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WheelLevel {
    /// One tick per bucket.
    One = 0,
    /// 256 ticks per bucket.
    Two = 1,
    /// 65,536 ticks per bucket.
    Three = 2,
}

impl Display for WheelLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", *self as usize + 1)
    }
}

/// Where a pending timer currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerLocation {
    /// The wheel level.
    pub level: WheelLevel,
    /// The bucket index within the level.
    pub bucket: usize,
}

#[derive(Clone, Debug)]
struct TimerEntry {
    owner: Ustr,
    timeout_ticks: u64,
    deadline_tick: u64,
    recurring: bool,
    callback: TimeoutCallback,
}

type Bucket = IndexMap<Ustr, TimerEntry>;

/// A hierarchical timing wheel keyed by owner identity.
#[derive(Debug)]
pub struct TimingWheel {
    levels: [Vec<Bucket>; 3],
    lookup: AHashMap<Ustr, TimerLocation>,
    current_tick: u64,
}

impl Default for TimingWheel {
    /// Creates a new default [`TimingWheel`] instance.
    fn default() -> Self {
        Self::new()
    }
}

impl TimingWheel {
    /// Creates a new [`TimingWheel`] instance at tick zero.
    #[must_use]
    pub fn new() -> Self {
        let level = || (0..WHEEL_SIZE).map(|_| Bucket::new()).collect::<Vec<_>>();
        Self {
            levels: [level(), level(), level()],
            lookup: AHashMap::new(),
            current_tick: 0,
        }
    }

    /// Returns the number of ticks processed so far.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Returns the number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Returns whether there are no pending timers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Returns whether `owner` has a pending timer.
    #[must_use]
    pub fn contains(&self, owner: &Ustr) -> bool {
        self.lookup.contains_key(owner)
    }

    /// Returns where the pending timer for `owner` lives.
    #[must_use]
    pub fn location(&self, owner: &Ustr) -> Option<TimerLocation> {
        self.lookup.get(owner).copied()
    }

    /// Returns the deadline tick of the pending timer for `owner`.
    #[must_use]
    pub fn deadline(&self, owner: &Ustr) -> Option<u64> {
        let location = self.lookup.get(owner)?;
        self.levels[location.level as usize][location.bucket]
            .get(owner)
            .map(|entry| entry.deadline_tick)
    }

    /// Schedules a timeout for `owner` after `timeout_ticks` ticks and returns its deadline tick.
    ///
    /// A zero timeout is treated as one tick; timeouts beyond [`MAX_TIMEOUT_TICKS`]
    /// are clamped. Any timer already pending for `owner` is replaced.
    pub fn schedule(
        &mut self,
        owner: Ustr,
        timeout_ticks: u64,
        recurring: bool,
        callback: TimeoutCallback,
    ) -> u64 {
        if self.cancel(&owner) {
            log::debug!("Replaced pending timer for '{owner}'");
        }

        let timeout_ticks = if timeout_ticks > MAX_TIMEOUT_TICKS {
            log::warn!(
                "Timeout of {timeout_ticks} ticks for '{owner}' exceeds the wheel horizon, clamped to {MAX_TIMEOUT_TICKS}"
            );
            MAX_TIMEOUT_TICKS
        } else {
            timeout_ticks.max(1)
        };

        let deadline_tick = self.current_tick + timeout_ticks;
        self.insert(TimerEntry {
            owner,
            timeout_ticks,
            deadline_tick,
            recurring,
            callback,
        });
        deadline_tick
    }

    /// Cancels the pending timer for `owner`, returning whether one existed.
    pub fn cancel(&mut self, owner: &Ustr) -> bool {
        match self.lookup.remove(owner) {
            Some(location) => self.levels[location.level as usize][location.bucket]
                .swap_remove(owner)
                .is_some(),
            None => false,
        }
    }

    /// Advances the wheel by one tick and returns the handlers for every timer due.
    ///
    /// Recurring timers are rescheduled before this returns.
    pub fn tick(&mut self) -> Vec<TimeoutHandler> {
        self.current_tick += 1;
        let now = self.current_tick;

        if now & WHEEL_MASK == 0 {
            let level_2_index = Self::bucket_index(now, WheelLevel::Two);
            if level_2_index == 0 {
                self.cascade(WheelLevel::Three, Self::bucket_index(now, WheelLevel::Three));
            }
            self.cascade(WheelLevel::Two, level_2_index);
        }

        let due = std::mem::take(&mut self.levels[0][Self::bucket_index(now, WheelLevel::One)]);
        let mut handlers = Vec::with_capacity(due.len());

        for (owner, mut entry) in due {
            self.lookup.remove(&owner);
            handlers.push(TimeoutHandler {
                event: TimeoutEvent {
                    owner,
                    deadline_tick: entry.deadline_tick,
                    fired_tick: now,
                    recurring: entry.recurring,
                },
                callback: entry.callback.clone(),
            });

            if entry.recurring {
                entry.deadline_tick = now + entry.timeout_ticks;
                self.insert(entry);
            }
        }

        handlers
    }

    const fn bucket_index(tick: u64, level: WheelLevel) -> usize {
        ((tick >> (WHEEL_BITS * level as u32)) & WHEEL_MASK) as usize
    }

    const fn level_for(remaining: u64) -> WheelLevel {
        if remaining < LEVEL_1_SPAN {
            WheelLevel::One
        } else if remaining < LEVEL_2_SPAN {
            WheelLevel::Two
        } else {
            WheelLevel::Three
        }
    }

    fn insert(&mut self, entry: TimerEntry) {
        let remaining = entry.deadline_tick.saturating_sub(self.current_tick);
        let level = Self::level_for(remaining);
        let location = TimerLocation {
            level,
            bucket: Self::bucket_index(entry.deadline_tick, level),
        };

        self.lookup.insert(entry.owner, location);
        self.levels[level as usize][location.bucket].insert(entry.owner, entry);
    }

    fn cascade(&mut self, level: WheelLevel, bucket: usize) {
        let entries = std::mem::take(&mut self.levels[level as usize][bucket]);
        for (owner, entry) in entries {
            self.lookup.remove(&owner);
            self.insert(entry);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ahash::{AHashMap, AHashSet};
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn wheel() -> TimingWheel {
        TimingWheel::new()
    }

    fn noop() -> TimeoutCallback {
        TimeoutCallback::new(|_| {})
    }

    fn owner(i: u64) -> Ustr {
        Ustr::from(&format!("actor-{i}"))
    }

    /// Ticks `n` times, returning every fired event.
    fn advance(wheel: &mut TimingWheel, n: u64) -> Vec<TimeoutEvent> {
        (0..n)
            .flat_map(|_| wheel.tick())
            .map(|handler| handler.event)
            .collect()
    }

    #[rstest]
    #[case(1, WheelLevel::One, 1)]
    #[case(255, WheelLevel::One, 255)]
    #[case(256, WheelLevel::Two, 1)]
    #[case(65_535, WheelLevel::Two, 255)]
    #[case(65_536, WheelLevel::Three, 1)]
    #[case(MAX_TIMEOUT_TICKS, WheelLevel::Three, 255)]
    fn test_placement(
        mut wheel: TimingWheel,
        #[case] timeout: u64,
        #[case] level: WheelLevel,
        #[case] bucket: usize,
    ) {
        let owner = owner(0);
        wheel.schedule(owner, timeout, false, noop());

        assert_eq!(wheel.location(&owner), Some(TimerLocation { level, bucket }));
    }

    #[rstest]
    fn test_zero_timeout_fires_next_tick(mut wheel: TimingWheel) {
        let deadline = wheel.schedule(owner(0), 0, false, noop());
        assert_eq!(deadline, 1);

        let fired = advance(&mut wheel, 1);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].fired_tick, 1);
    }

    #[rstest]
    fn test_oversized_timeout_is_clamped(mut wheel: TimingWheel) {
        let deadline = wheel.schedule(owner(0), u64::MAX, false, noop());
        assert_eq!(deadline, MAX_TIMEOUT_TICKS);
    }

    #[rstest]
    fn test_fires_exactly_on_deadline(mut wheel: TimingWheel) {
        wheel.schedule(owner(0), 5, false, noop());

        assert!(advance(&mut wheel, 4).is_empty());
        let fired = advance(&mut wheel, 1);

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].owner, owner(0));
        assert_eq!(fired[0].deadline_tick, 5);
        assert_eq!(fired[0].fired_tick, 5);
        assert!(wheel.is_empty());
    }

    #[rstest]
    fn test_level_2_cascades_into_level_1_and_fires_on_time(mut wheel: TimingWheel) {
        wheel.schedule(owner(0), 300, false, noop());
        assert_eq!(wheel.location(&owner(0)).unwrap().level, WheelLevel::Two);

        assert!(advance(&mut wheel, 256).is_empty());
        assert_eq!(wheel.location(&owner(0)).unwrap().level, WheelLevel::One);

        assert!(advance(&mut wheel, 43).is_empty());
        let fired = advance(&mut wheel, 1);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].fired_tick, 300);
    }

    #[rstest]
    fn test_level_3_cascades_through_every_level(mut wheel: TimingWheel) {
        let deadline = wheel.schedule(owner(0), 70_000, false, noop());
        assert_eq!(wheel.location(&owner(0)).unwrap().level, WheelLevel::Three);

        assert!(advance(&mut wheel, 65_536).is_empty());
        assert_eq!(wheel.location(&owner(0)).unwrap().level, WheelLevel::Two);

        let fired = advance(&mut wheel, deadline - 65_536);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].fired_tick, deadline);
    }

    #[rstest]
    fn test_cancel_before_deadline(mut wheel: TimingWheel) {
        wheel.schedule(owner(0), 10, false, noop());
        advance(&mut wheel, 5);

        assert!(wheel.cancel(&owner(0)));
        assert!(!wheel.cancel(&owner(0)));
        assert!(advance(&mut wheel, 20).is_empty());
    }

    #[rstest]
    fn test_cancel_leaves_other_owners(mut wheel: TimingWheel) {
        wheel.schedule(owner(0), 10, false, noop());
        wheel.schedule(owner(1), 10, false, noop());
        wheel.schedule(owner(2), 10, false, noop());

        assert!(wheel.cancel(&owner(1)));

        let fired: Vec<Ustr> = advance(&mut wheel, 10).iter().map(|e| e.owner).collect();
        assert_eq!(fired.len(), 2);
        assert!(fired.contains(&owner(0)));
        assert!(fired.contains(&owner(2)));
    }

    #[rstest]
    fn test_reschedule_replaces_previous_timer(mut wheel: TimingWheel) {
        wheel.schedule(owner(0), 5, false, noop());
        wheel.schedule(owner(0), 500, false, noop());

        assert_eq!(wheel.len(), 1);
        assert_eq!(wheel.deadline(&owner(0)), Some(500));
        assert!(advance(&mut wheel, 499).is_empty());
        assert_eq!(advance(&mut wheel, 1).len(), 1);
    }

    #[rstest]
    fn test_recurring_fires_every_period_until_cancelled(mut wheel: TimingWheel) {
        wheel.schedule(owner(0), 100, true, noop());

        let fired = advance(&mut wheel, 1_000);
        let ticks: Vec<u64> = fired.iter().map(|e| e.fired_tick).collect();
        assert_eq!(ticks, (1..=10).map(|i| i * 100).collect::<Vec<_>>());
        assert!(fired.iter().all(|e| e.recurring));

        assert!(wheel.cancel(&owner(0)));
        assert!(advance(&mut wheel, 500).is_empty());
    }

    #[rstest]
    fn test_recurring_long_period_spans_levels(mut wheel: TimingWheel) {
        wheel.schedule(owner(0), 1_000, true, noop());

        let ticks: Vec<u64> = advance(&mut wheel, 3_000)
            .iter()
            .map(|e| e.fired_tick)
            .collect();
        assert_eq!(ticks, vec![1_000, 2_000, 3_000]);
    }

    #[rstest]
    fn test_hundred_timers_fire_exactly_once(mut wheel: TimingWheel) {
        for i in 0..100 {
            wheel.schedule(owner(i), 1 + (i * 37) % 1_000, false, noop());
        }

        let mut counts: AHashMap<Ustr, usize> = AHashMap::new();
        for event in advance(&mut wheel, 1_100) {
            assert_eq!(event.fired_tick, event.deadline_tick);
            *counts.entry(event.owner).or_default() += 1;
        }

        assert_eq!(counts.len(), 100);
        assert!(counts.values().all(|&count| count == 1));
        assert!(wheel.is_empty());
    }

    #[rstest]
    #[case::level_1(0, 5)]
    #[case::level_2(0, 300)]
    #[case::level_2_across_cascade(200, 300)]
    #[case::level_3(0, 70_000)]
    fn test_hundred_timers_with_same_timeout_fire_once_at_deadline(
        mut wheel: TimingWheel,
        #[case] start: u64,
        #[case] timeout: u64,
    ) {
        advance(&mut wheel, start);
        let deadlines: Vec<u64> = (0..100)
            .map(|i| wheel.schedule(owner(i), timeout, false, noop()))
            .collect();
        let deadline = start + timeout;
        assert!(deadlines.iter().all(|&d| d == deadline));

        assert!(advance(&mut wheel, timeout - 1).is_empty());
        let fired = advance(&mut wheel, 1);

        assert_eq!(fired.len(), 100);
        assert!(fired.iter().all(|e| e.fired_tick == deadline));
        let owners: AHashSet<Ustr> = fired.iter().map(|e| e.owner).collect();
        assert_eq!(owners, (0..100).map(owner).collect::<AHashSet<_>>());
        assert!(wheel.is_empty());
        assert!(advance(&mut wheel, 1_000).is_empty());
    }

    #[rstest]
    fn test_handlers_run_callbacks(mut wheel: TimingWheel) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        wheel.schedule(
            owner(7),
            2,
            false,
            TimeoutCallback::new(move |event| sink.lock().unwrap().push(event.owner)),
        );

        for handler in wheel.tick().into_iter().chain(wheel.tick()) {
            handler.run();
        }

        assert_eq!(*fired.lock().unwrap(), vec![owner(7)]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_timer_fires_once_on_its_deadline(
            start in 0u64..600,
            timeouts in proptest::collection::vec(1u64..70_000, 1..40),
        ) {
            let mut wheel = TimingWheel::new();
            advance(&mut wheel, start);

            let mut deadlines = AHashMap::new();
            for (i, timeout) in timeouts.iter().enumerate() {
                let owner = owner(i as u64);
                deadlines.insert(owner, wheel.schedule(owner, *timeout, false, noop()));
            }

            let horizon = timeouts.iter().max().copied().unwrap_or(0);
            let mut seen = AHashMap::new();
            for event in advance(&mut wheel, horizon) {
                prop_assert_eq!(Some(&event.fired_tick), deadlines.get(&event.owner));
                prop_assert!(seen.insert(event.owner, event.fired_tick).is_none());
            }

            prop_assert_eq!(seen.len(), timeouts.len());
            prop_assert!(wheel.is_empty());
        }
    }
}
