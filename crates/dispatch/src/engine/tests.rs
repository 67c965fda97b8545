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

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use switchlet_common::{
    actor::{Envelope, Mailbox, mailbox},
    timer::TimerCommand,
};
use switchlet_model::{
    api::Api,
    enums::EventFormat,
    event::{EVENT_BACKGROUND_JOB, EVENT_HEARTBEAT},
    rule::{DispatchRule, DispatchRules},
};

use super::*;
use crate::registry::TargetFactory;

#[derive(Clone, Debug, Default)]
struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl CommandSink for RecordingSink {
    fn send(&self, text: String) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }
}

type Created = Arc<Mutex<Vec<Mailbox<SwitchletMessage>>>>;

fn recording_factory(created: &Created) -> TargetFactory {
    let created = created.clone();
    Arc::new(move |id| {
        let (actor_ref, mailbox) = mailbox(id);
        created.lock().unwrap().push(mailbox);
        actor_ref
    })
}

struct Harness {
    dispatcher: Dispatcher,
    ctx: Context,
    sink: RecordingSink,
    monitors: Created,
    handlers: Created,
    _dispatcher_mailbox: Mailbox<DispatcherMessage>,
    _timer_mailbox: Mailbox<TimerCommand>,
}

impl Harness {
    fn handle(&mut self, message: DispatcherMessage) -> anyhow::Result<()> {
        self.dispatcher.handle(message, &mut self.ctx)
    }

    fn connect(&mut self) {
        self.handle(DispatcherMessage::ConnectionEstablished(Box::new(
            self.sink.clone(),
        )))
        .unwrap();
    }

    fn reply(&mut self, text: &str) {
        self.handle(DispatcherMessage::Event(Event::from_headers([
            ("Content-Type", "command/reply"),
            ("Reply-Text", text),
        ])))
        .unwrap();
    }

    fn to_dispatching(&mut self) {
        self.connect();
        self.reply("+OK accepted");
        self.reply("+OK event listener enabled plain");
        assert_eq!(self.dispatcher.state(), DispatcherState::Dispatching);
    }

    fn monitor_events(&self) -> Vec<Event> {
        drain_events(&self.monitors)
    }
}

fn drain_events(created: &Created) -> Vec<Event> {
    let mut created = created.lock().unwrap();
    created
        .iter_mut()
        .flat_map(|mailbox| mailbox.drain_messages())
        .filter_map(|message| match message {
            SwitchletMessage::Event(event) => Some(event),
            _ => None,
        })
        .collect()
}

fn heartbeat() -> Event {
    Event::from_headers([
        ("Content-Type", "text/event-plain"),
        ("Event-Name", EVENT_HEARTBEAT),
    ])
}

#[fixture]
fn harness() -> Harness {
    let (dispatcher_ref, dispatcher_mailbox) = mailbox::<DispatcherMessage>(Dispatcher::ID);
    let (timer_ref, timer_mailbox) = mailbox::<TimerCommand>("TimerService");
    let monitors = Created::default();
    let handlers = Created::default();

    let mut registry = TargetRegistry::new(dispatcher_ref, timer_ref);
    registry
        .register_singleton("Monitor", &recording_factory(&monitors))
        .unwrap();
    registry
        .register_transient("CallHandler", recording_factory(&handlers))
        .unwrap();

    let rules = DispatchRules::new(vec![
        DispatchRule::new(
            "Event-Name",
            HeaderMatcher::Value(EVENT_HEARTBEAT.to_string()),
            "Monitor",
            true,
        )
        .unwrap(),
        DispatchRule::new(
            "Event-Name",
            HeaderMatcher::pattern("^CHANNEL_").unwrap(),
            "CallHandler",
            false,
        )
        .unwrap(),
    ]);
    let config = DispatcherConfig::new(
        "ClueCon",
        EventFormat::Plain,
        &[EVENT_HEARTBEAT.to_string()],
        rules,
    )
    .unwrap();

    let harness = Harness {
        dispatcher: Dispatcher::new(config, registry).unwrap(),
        ctx: Context::new(Ustr::from(Dispatcher::ID)),
        sink: RecordingSink::default(),
        monitors,
        handlers,
        _dispatcher_mailbox: dispatcher_mailbox,
        _timer_mailbox: timer_mailbox,
    };
    // Discard the Initialize sent on registration
    harness.monitors.lock().unwrap()[0].drain_messages();
    harness
}

#[rstest]
fn test_connection_sends_exactly_one_auth(mut harness: Harness) {
    harness.connect();

    assert_eq!(harness.dispatcher.state(), DispatcherState::Authenticating);
    assert_eq!(harness.sink.sent(), vec!["auth ClueCon\n\n".to_string()]);
}

#[rstest]
fn test_auth_request_does_not_advance(mut harness: Harness) {
    harness.connect();

    harness
        .handle(DispatcherMessage::Event(Event::from_headers([(
            "Content-Type",
            "auth/request",
        )])))
        .unwrap();

    assert_eq!(harness.dispatcher.state(), DispatcherState::Authenticating);
}

#[rstest]
fn test_handshake_subscribes_with_background_job(mut harness: Harness) {
    let mut states = harness.dispatcher.subscribe_state();

    harness.to_dispatching();

    assert_eq!(
        harness.sink.sent(),
        vec![
            "auth ClueCon\n\n".to_string(),
            "event plain HEARTBEAT BACKGROUND_JOB\n\n".to_string(),
        ]
    );
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), DispatcherState::Dispatching);
}

#[rstest]
fn test_auth_rejection_is_terminal(mut harness: Harness) {
    harness.connect();

    harness.reply("-ERR invalid");

    assert_eq!(
        harness.dispatcher.state(),
        DispatcherState::FailedAuthentication
    );
    assert!(harness.dispatcher.state().is_failure());
    assert!(harness.ctx.is_stopped());
    assert_eq!(harness.sink.sent().len(), 1);
}

#[rstest]
fn test_subscription_rejection_is_terminal(mut harness: Harness) {
    harness.connect();
    harness.reply("+OK accepted");

    harness.reply("-ERR no events");

    assert_eq!(
        harness.dispatcher.state(),
        DispatcherState::FailedInitialization
    );
    assert!(harness.ctx.is_stopped());
}

#[rstest]
fn test_replies_are_delivered_to_issuing_sender_only(mut harness: Harness) {
    harness.to_dispatching();
    let mut senders = Vec::new();
    let mut jobs = Vec::new();
    for i in 0..5 {
        let (sender, mailbox) = mailbox::<SwitchletMessage>(format!("Sender-{i}").as_str());
        let command = BackgroundCommand::new(Api::Status);
        jobs.push(command.id());
        harness
            .handle(DispatcherMessage::Execute {
                command,
                sender: sender.clone(),
            })
            .unwrap();
        senders.push(mailbox);
    }
    assert_eq!(harness.dispatcher.pending_transactions(), 5);

    // Replies arrive out of order
    for i in [3, 0, 4, 1, 2] {
        harness
            .handle(DispatcherMessage::Event(Event::from_headers([
                ("Content-Type", "command/reply"),
                ("Reply-Text", "+OK Job-UUID"),
                ("Job-UUID", jobs[i].to_string().as_str()),
            ])))
            .unwrap();
    }

    assert_eq!(harness.dispatcher.pending_transactions(), 0);
    for (i, mailbox) in senders.iter_mut().enumerate() {
        let messages = mailbox.drain_messages();
        assert_eq!(messages.len(), 1);
        let SwitchletMessage::Event(event) = &messages[0] else {
            panic!("Expected event");
        };
        assert_eq!(event.job_uuid(), Some(jobs[i]));
    }
}

#[rstest]
fn test_execute_writes_bgapi(mut harness: Harness) {
    harness.to_dispatching();
    let (sender, _mailbox) = mailbox::<SwitchletMessage>("Sender");
    let command = BackgroundCommand::new(Api::acl_check("192.168.1.1", "lan").unwrap());
    let expected = command.to_string();

    harness
        .handle(DispatcherMessage::Execute { command, sender })
        .unwrap();

    assert_eq!(harness.sink.sent().last(), Some(&expected));
}

#[rstest]
fn test_duplicate_job_is_rejected(mut harness: Harness) {
    harness.to_dispatching();
    let (sender, _mailbox) = mailbox::<SwitchletMessage>("Sender");
    let command = BackgroundCommand::new(Api::Status);

    harness
        .handle(DispatcherMessage::Execute {
            command: command.clone(),
            sender: sender.clone(),
        })
        .unwrap();
    let result = harness.handle(DispatcherMessage::Execute { command, sender });

    assert!(result.is_err());
    assert_eq!(harness.sink.sent().len(), 3);
}

#[rstest]
fn test_execute_before_dispatching_is_dropped(mut harness: Harness) {
    harness.connect();
    let (sender, _mailbox) = mailbox::<SwitchletMessage>("Sender");

    harness
        .handle(DispatcherMessage::Execute {
            command: BackgroundCommand::new(Api::Status),
            sender,
        })
        .unwrap();

    assert_eq!(harness.dispatcher.pending_transactions(), 0);
    assert_eq!(harness.sink.sent().len(), 1);
}

#[rstest]
fn test_unmatched_reply_is_dropped(mut harness: Harness) {
    harness.to_dispatching();

    let result = harness.handle(DispatcherMessage::Event(Event::from_headers([
        ("Content-Type", "command/reply"),
        ("Job-UUID", UUID4::new().to_string().as_str()),
    ])));

    assert!(result.is_ok());
    assert!(harness.monitor_events().is_empty());
}

#[rstest]
fn test_observer_receives_job_events_until_unregistered(mut harness: Harness) {
    harness.to_dispatching();
    let (observer, mut observer_mailbox) = mailbox::<SwitchletMessage>("Observer");
    let job_uuid = UUID4::new();
    let job_event = || {
        DispatcherMessage::Event(Event::from_headers([
            ("Content-Type", "text/event-plain"),
            ("Event-Name", EVENT_BACKGROUND_JOB),
            ("Job-UUID", job_uuid.to_string().as_str()),
        ]))
    };

    harness
        .handle(DispatcherMessage::RegisterObserver { job_uuid, observer })
        .unwrap();
    harness.handle(job_event()).unwrap();
    harness.handle(job_event()).unwrap();
    harness
        .handle(DispatcherMessage::UnregisterObserver { job_uuid })
        .unwrap();
    harness.handle(job_event()).unwrap();

    assert_eq!(observer_mailbox.drain_messages().len(), 2);
    assert_eq!(harness.dispatcher.observer_count(), 0);
    assert!(harness.monitor_events().is_empty());
}

#[rstest]
fn test_heartbeat_is_routed_only_to_monitor(mut harness: Harness) {
    harness.to_dispatching();

    harness.handle(DispatcherMessage::Event(heartbeat())).unwrap();

    assert_eq!(harness.monitor_events(), vec![heartbeat()]);
    assert!(harness.handlers.lock().unwrap().is_empty());
}

#[rstest]
fn test_unmatched_event_is_dropped(mut harness: Harness) {
    harness.to_dispatching();

    harness
        .handle(DispatcherMessage::Event(Event::from_headers([
            ("Content-Type", "text/event-plain"),
            ("Event-Name", "OTHER"),
        ])))
        .unwrap();

    assert!(harness.monitor_events().is_empty());
    assert!(harness.handlers.lock().unwrap().is_empty());
}

#[rstest]
#[case("api/response")]
#[case("text/rude-rejection")]
#[case("log/data")]
#[case("")]
fn test_non_event_content_is_not_routed(mut harness: Harness, #[case] content_type: &str) {
    harness.to_dispatching();

    harness
        .handle(DispatcherMessage::Event(Event::from_headers([
            ("Content-Type", content_type),
            ("Event-Name", EVENT_HEARTBEAT),
        ])))
        .unwrap();

    assert!(harness.monitor_events().is_empty());
    assert!(harness.handlers.lock().unwrap().is_empty());
}

#[rstest]
fn test_json_event_is_routed(mut harness: Harness) {
    harness.to_dispatching();
    let event = Event::from_headers([
        ("Content-Type", "text/event-json"),
        ("Event-Name", EVENT_HEARTBEAT),
    ]);

    harness.handle(DispatcherMessage::Event(event.clone())).unwrap();

    assert_eq!(harness.monitor_events(), vec![event]);
}

#[rstest]
fn test_pattern_rule_creates_transient_per_event(mut harness: Harness) {
    harness.to_dispatching();
    let answer = Event::from_headers([
        ("Content-Type", "text/event-plain"),
        ("Event-Name", "CHANNEL_ANSWER"),
    ]);

    harness
        .handle(DispatcherMessage::Event(answer.clone()))
        .unwrap();
    harness
        .handle(DispatcherMessage::Event(answer.clone()))
        .unwrap();

    assert_eq!(harness.handlers.lock().unwrap().len(), 2);
    assert_eq!(drain_events(&harness.handlers), vec![answer.clone(), answer]);
}

#[rstest]
fn test_watch_receives_copy_and_rules_still_apply(mut harness: Harness) {
    harness.to_dispatching();
    let (watcher, mut watcher_mailbox) = mailbox::<SwitchletMessage>("Watcher");
    let matcher = HeaderMatcher::Value(EVENT_HEARTBEAT.to_string());

    harness
        .handle(DispatcherMessage::Watch {
            observer: watcher.clone(),
            header_name: "Event-Name".to_string(),
            matcher: matcher.clone(),
        })
        .unwrap();
    harness.handle(DispatcherMessage::Event(heartbeat())).unwrap();
    harness
        .handle(DispatcherMessage::Unwatch {
            observer_id: watcher.id(),
            header_name: "Event-Name".to_string(),
            matcher,
        })
        .unwrap();
    harness.handle(DispatcherMessage::Event(heartbeat())).unwrap();

    assert_eq!(watcher_mailbox.drain_messages().len(), 1);
    assert_eq!(harness.monitor_events().len(), 2);
    assert_eq!(harness.dispatcher.watch_count(), 0);
}

#[rstest]
fn test_kill_tears_down_singletons(mut harness: Harness) {
    harness.to_dispatching();

    harness.handle(DispatcherMessage::Kill).unwrap();

    assert_eq!(harness.dispatcher.state(), DispatcherState::Done);
    assert!(harness.ctx.is_stopped());
    let mut monitors = harness.monitors.lock().unwrap();
    assert!(matches!(
        monitors[0].try_recv(),
        Some(Envelope::Message(SwitchletMessage::Uninitialize))
    ));
    assert!(matches!(monitors[0].try_recv(), Some(Envelope::Stop)));
}

#[rstest]
fn test_kill_before_connect(mut harness: Harness) {
    harness.handle(DispatcherMessage::Kill).unwrap();

    assert_eq!(harness.dispatcher.state(), DispatcherState::Done);
    assert!(harness.sink.sent().is_empty());
}

#[rstest]
fn test_second_connect_is_an_invalid_trigger(mut harness: Harness) {
    harness.connect();

    let result = harness.handle(DispatcherMessage::ConnectionEstablished(Box::new(
        harness.sink.clone(),
    )));

    assert!(result.is_err());
    assert_eq!(harness.dispatcher.state(), DispatcherState::Authenticating);
}
