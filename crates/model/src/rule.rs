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

//! Header based routing rules mapping unsolicited events to named targets.

use std::fmt::{Display, Formatter};

use regex::Regex;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::event::Event;

/// Error returned when a routing rule is malformed.
#[derive(thiserror::Error, Debug)]
pub enum RuleError {
    /// The rule names no header to inspect.
    #[error("Rule {index}: 'header_name' is required")]
    MissingHeaderName {
        /// The position of the rule in its list.
        index: usize,
    },
    /// The rule names no target.
    #[error("Rule {index}: 'target' is required")]
    MissingTarget {
        /// The position of the rule in its list.
        index: usize,
    },
    /// The rule has neither or both of `header_value` and `header_pattern`.
    #[error("Rule {index}: exactly one of 'header_value' or 'header_pattern' is required")]
    AmbiguousMatcher {
        /// The position of the rule in its list.
        index: usize,
    },
    /// The pattern does not compile.
    #[error("Rule {index}: invalid 'header_pattern' '{pattern}': {source}")]
    InvalidPattern {
        /// The position of the rule in its list.
        index: usize,
        /// The offending pattern.
        pattern: String,
        /// The compile error.
        #[source]
        source: regex::Error,
    },
}

/// The raw, unvalidated form of a routing rule as it appears in configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchRuleConfig {
    /// The header to inspect.
    pub header_name: String,
    /// An exact value to compare against.
    pub header_value: Option<String>,
    /// A regular expression searched for anywhere in the header value.
    pub header_pattern: Option<String>,
    /// The name of the target receiving matching events.
    pub target: String,
    /// Whether the target is a single long-lived instance.
    pub persistent: bool,
}

/// How a rule compares a header value.
#[derive(Clone, Debug)]
pub enum HeaderMatcher {
    /// Exact equality.
    Value(String),
    /// Regular expression search (not anchored).
    Pattern(Regex),
}

impl HeaderMatcher {
    /// Creates a pattern matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` does not compile.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    /// Returns whether `value` satisfies this matcher.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Value(expected) => value == expected,
            Self::Pattern(regex) => regex.is_match(value),
        }
    }

    /// Returns the matcher source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(value) => value,
            Self::Pattern(regex) => regex.as_str(),
        }
    }
}

impl PartialEq for HeaderMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for HeaderMatcher {}

impl Display for HeaderMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => write!(f, "== '{value}'"),
            Self::Pattern(regex) => write!(f, "~ /{}/", regex.as_str()),
        }
    }
}

/// Returns whether `event` carries a non-empty `header_name` satisfying `matcher`.
#[must_use]
pub fn header_matches(event: &Event, header_name: &str, matcher: &HeaderMatcher) -> bool {
    event
        .header(header_name)
        .filter(|value| !value.is_empty())
        .is_some_and(|value| matcher.matches(value))
}

/// A validated routing rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchRule {
    header_name: String,
    matcher: HeaderMatcher,
    target: Ustr,
    persistent: bool,
}

impl DispatchRule {
    /// Creates a new [`DispatchRule`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `header_name` or `target` is empty.
    pub fn new(
        header_name: &str,
        matcher: HeaderMatcher,
        target: &str,
        persistent: bool,
    ) -> Result<Self, RuleError> {
        Self::validated(0, header_name, matcher, target, persistent)
    }

    fn validated(
        index: usize,
        header_name: &str,
        matcher: HeaderMatcher,
        target: &str,
        persistent: bool,
    ) -> Result<Self, RuleError> {
        if header_name.trim().is_empty() {
            return Err(RuleError::MissingHeaderName { index });
        }
        if target.trim().is_empty() {
            return Err(RuleError::MissingTarget { index });
        }
        Ok(Self {
            header_name: header_name.to_string(),
            matcher,
            target: Ustr::from(target),
            persistent,
        })
    }

    /// Validates the raw `config` found at position `index`.
    ///
    /// Empty strings are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is malformed.
    pub fn from_config(index: usize, config: &DispatchRuleConfig) -> Result<Self, RuleError> {
        let value = config.header_value.as_deref().filter(|v| !v.is_empty());
        let pattern = config.header_pattern.as_deref().filter(|p| !p.is_empty());
        let matcher = match (value, pattern) {
            (Some(value), None) => HeaderMatcher::Value(value.to_string()),
            (None, Some(pattern)) => {
                HeaderMatcher::pattern(pattern).map_err(|source| RuleError::InvalidPattern {
                    index,
                    pattern: pattern.to_string(),
                    source,
                })?
            }
            _ => return Err(RuleError::AmbiguousMatcher { index }),
        };
        Self::validated(
            index,
            &config.header_name,
            matcher,
            &config.target,
            config.persistent,
        )
    }

    /// Returns the inspected header name.
    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Returns the header matcher.
    #[must_use]
    pub const fn matcher(&self) -> &HeaderMatcher {
        &self.matcher
    }

    /// Returns the target name.
    #[must_use]
    pub const fn target(&self) -> Ustr {
        self.target
    }

    /// Returns whether the target is a singleton.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Returns whether this rule matches `event`.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        header_matches(event, &self.header_name, &self.matcher)
    }
}

impl Display for DispatchRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {}{}",
            self.header_name,
            self.matcher,
            self.target,
            if self.persistent { " (persistent)" } else { "" },
        )
    }
}

/// An immutable, ordered list of routing rules. The first matching rule wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchRules {
    rules: Vec<DispatchRule>,
}

impl DispatchRules {
    /// Creates a new [`DispatchRules`] instance.
    #[must_use]
    pub const fn new(rules: Vec<DispatchRule>) -> Self {
        Self { rules }
    }

    /// Validates every raw rule in `configs`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] encountered.
    pub fn from_configs(configs: &[DispatchRuleConfig]) -> Result<Self, RuleError> {
        configs
            .iter()
            .enumerate()
            .map(|(index, config)| DispatchRule::from_config(index, config))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Returns the first rule matching `event`, if any.
    #[must_use]
    pub fn route(&self, event: &Event) -> Option<&DispatchRule> {
        self.rules.iter().find(|rule| rule.matches(event))
    }

    /// Returns an iterator over the rules in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DispatchRule> {
        self.rules.iter()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a DispatchRules {
    type Item = &'a DispatchRule;
    type IntoIter = std::slice::Iter<'a, DispatchRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
