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

//! Defines a generic trigger driven `Finite-State Machine` (FSM).
//!
//! The FSM operates with a state-transition table keyed by `(state, trigger)`
//! tuples. A trigger which has no entry for the current state is rejected with
//! an [`InvalidStateTrigger`] error and the state is left unchanged, so callers
//! can log the rejection and carry on.
//!
//! # References
//!
//! <https://en.wikipedia.org/wiki/Finite-state_machine>

use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

use ahash::AHashMap;

/// Error representing an invalid trigger for the current state.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("Invalid state trigger {current_state} -> {trigger}")]
pub struct InvalidStateTrigger {
    /// The current state as a string.
    pub current_state: String,
    /// The rejected trigger as a string.
    pub trigger: String,
}

/// Provides a generic finite state machine.
///
/// # Examples
///
/// ```
/// use std::fmt;
///
/// use switchlet_core::fsm::FiniteStateMachine;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum State {
///     Idle,
///     Running,
/// }
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Trigger {
///     Start,
/// }
///
/// impl fmt::Display for State {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{self:?}")
///     }
/// }
///
/// impl fmt::Display for Trigger {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{self:?}")
///     }
/// }
///
/// let mut fsm = FiniteStateMachine::new(
///     State::Idle,
///     [((State::Idle, Trigger::Start), State::Running)],
/// )
/// .unwrap();
///
/// assert_eq!(fsm.trigger(Trigger::Start).unwrap(), State::Running);
/// assert!(fsm.trigger(Trigger::Start).is_err());
/// assert_eq!(fsm.state(), State::Running);
/// ```
pub struct FiniteStateMachine<S, T>
where
    S: Copy + Eq + Hash + Display,
    T: Copy + Eq + Hash + Display,
{
    state: S,
    state_transition_table: AHashMap<(S, T), S>,
}

impl<S, T> Debug for FiniteStateMachine<S, T>
where
    S: Copy + Eq + Hash + Display + Debug,
    T: Copy + Eq + Hash + Display + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(FiniteStateMachine))
            .field("state", &self.state)
            .field("transitions", &self.state_transition_table.len())
            .finish()
    }
}

impl<S, T> FiniteStateMachine<S, T>
where
    S: Copy + Eq + Hash + Display,
    T: Copy + Eq + Hash + Display,
{
    /// Creates a new [`FiniteStateMachine`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `state_transition_table` is empty.
    pub fn new<I>(initial_state: S, state_transition_table: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = ((S, T), S)>,
    {
        let state_transition_table: AHashMap<(S, T), S> =
            state_transition_table.into_iter().collect();
        if state_transition_table.is_empty() {
            anyhow::bail!("state_transition_table cannot be empty");
        }

        Ok(Self {
            state: initial_state,
            state_transition_table,
        })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> S {
        self.state
    }

    /// Returns the current state as a string.
    #[must_use]
    pub fn state_string(&self) -> String {
        self.state.to_string()
    }

    /// Returns whether `trigger` is valid for the current state.
    #[must_use]
    pub fn can_trigger(&self, trigger: T) -> bool {
        self.state_transition_table
            .contains_key(&(self.state, trigger))
    }

    /// Returns whether the current state has no outgoing transitions.
    #[must_use]
    pub fn is_final(&self) -> bool {
        !self
            .state_transition_table
            .keys()
            .any(|(state, _)| *state == self.state)
    }

    /// Processes `trigger` against the current state and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidStateTrigger`] if the `(state, trigger)` combination
    /// is not found in the transition table, in which case the state is unchanged.
    pub fn trigger(&mut self, trigger: T) -> Result<S, InvalidStateTrigger> {
        match self.state_transition_table.get(&(self.state, trigger)) {
            Some(&next_state) => {
                self.state = next_state;
                Ok(next_state)
            }
            None => Err(InvalidStateTrigger {
                current_state: self.state.to_string(),
                trigger: trigger.to_string(),
            }),
        }
    }
}
