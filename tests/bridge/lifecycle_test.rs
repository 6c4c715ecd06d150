//! Attach/detach lifecycle and delivery guarantees.

use serde_json::{json, Value};

use chat_bridge::config::BridgeConfig;
use chat_bridge::{AttachOutcome, BridgeError, Channel, NativeError};

use crate::common::{bridge_with, initialized_bridge, recorder, ACCOUNT};

/// A well-formed native payload for `channel`, varying with `n`.
fn valid_payload(channel: Channel, n: u64) -> Value {
    match channel {
        Channel::Connection => {
            if (n & 1) == 0 {
                json!("CONNECTED")
            } else {
                json!("RECONNECTING")
            }
        }
        Channel::Account => json!({"status": if (n & 1) == 0 { "ONLINE" } else { "OFFLINE" }}),
        Channel::Agents => json!([{"nick": format!("agent:{n}"), "display_name": "Ada"}]),
        Channel::ChatItems => json!({"id": n, "text": format!("message {n}")}),
    }
}

#[test]
fn n_callbacks_deliver_n_events_in_order_on_every_channel() {
    let (sdk, bridge) = initialized_bridge();

    for channel in Channel::ALL {
        let (sink, rec) = recorder();
        bridge.attach(channel, sink).expect("attach should succeed");

        for n in 0..5 {
            assert_eq!(sdk.emit(channel, valid_payload(channel, n)), 1);
        }

        let events = rec.events();
        assert_eq!(events.len(), 5, "channel {channel}");
        for (n, event) in (0..5).zip(events.iter()) {
            let expected = chat_bridge::events::decoder_for(channel)(valid_payload(channel, n))
                .expect("payload should decode");
            assert_eq!(event, &expected, "channel {channel} event {n}");
        }
    }
}

#[test]
fn connected_then_detach_then_disconnected() {
    let (sdk, bridge) = initialized_bridge();
    assert_eq!(sdk.session().as_deref(), Some(ACCOUNT));

    let (sink, rec) = recorder();
    bridge
        .attach_channel("connection", sink)
        .expect("attach should succeed");

    sdk.emit(Channel::Connection, json!("CONNECTED"));
    assert_eq!(rec.events(), vec![json!("CONNECTED")]);

    assert!(bridge.detach_channel("connection").expect("known channel"));
    sdk.emit(Channel::Connection, json!("DISCONNECTED"));
    sdk.emit_released(Channel::Connection, json!("DISCONNECTED"));

    assert_eq!(rec.events(), vec![json!("CONNECTED")]);
}

#[test]
fn chat_items_arrive_in_callback_order() {
    let (sdk, bridge) = initialized_bridge();
    let (sink, rec) = recorder();
    bridge
        .attach_channel("chatItems", sink)
        .expect("attach should succeed");

    sdk.emit(Channel::ChatItems, json!({"id": 1, "text": "hi"}));
    sdk.emit(Channel::ChatItems, json!({"id": 2, "text": "bye"}));

    assert_eq!(
        rec.events(),
        vec![json!({"id": 1, "text": "hi"}), json!({"id": 2, "text": "bye"})]
    );
}

#[test]
fn released_token_callbacks_reach_nobody() {
    let (sdk, bridge) = initialized_bridge();
    let (sink, rec) = recorder();
    bridge.attach(Channel::Agents, sink).expect("attach");
    bridge.detach(Channel::Agents);

    assert_eq!(sdk.live_tokens(Channel::Agents), 0);
    assert_eq!(sdk.emit(Channel::Agents, valid_payload(Channel::Agents, 1)), 0);
    assert_eq!(
        sdk.emit_released(Channel::Agents, valid_payload(Channel::Agents, 1)),
        1
    );
    assert!(rec.events().is_empty());
}

#[test]
fn stale_callback_does_not_reach_reattached_subscriber() {
    let (sdk, bridge) = initialized_bridge();
    let (first, first_rec) = recorder();
    bridge.attach(Channel::ChatItems, first).expect("attach");
    bridge.detach(Channel::ChatItems);

    let (second, second_rec) = recorder();
    bridge.attach(Channel::ChatItems, second).expect("attach");

    sdk.emit_released(Channel::ChatItems, json!({"id": 9, "text": "late"}));
    assert!(second_rec.events().is_empty());

    sdk.emit(Channel::ChatItems, json!({"id": 10, "text": "fresh"}));
    assert_eq!(second_rec.events(), vec![json!({"id": 10, "text": "fresh"})]);
    assert!(first_rec.events().is_empty());
}

#[test]
fn each_attach_after_detach_registers_exactly_once() {
    let (sdk, bridge) = initialized_bridge();

    for cycle in 1..=3_usize {
        let (sink, _rec) = recorder();
        bridge.attach(Channel::Account, sink).expect("attach");
        assert_eq!(sdk.registrations(Channel::Account), cycle);
        assert_eq!(sdk.live_tokens(Channel::Account), 1);
        bridge.detach(Channel::Account);
        assert_eq!(sdk.releases(Channel::Account), cycle);
        assert_eq!(sdk.live_tokens(Channel::Account), 0);
    }
}

#[test]
fn unknown_channel_fails_without_registration() {
    let (sdk, bridge) = initialized_bridge();
    let (sink, rec) = recorder();

    let result = bridge.attach_channel("presence", sink);
    assert!(matches!(
        result,
        Err(BridgeError::UnknownChannel { ref name }) if name == "presence"
    ));
    assert_eq!(rec.closed(), 1);
    for channel in Channel::ALL {
        assert_eq!(sdk.registrations(channel), 0);
    }

    assert!(matches!(
        bridge.detach_channel("presence"),
        Err(BridgeError::UnknownChannel { .. })
    ));
}

#[test]
fn malformed_payload_is_dropped_and_stream_stays_open() {
    let (sdk, bridge) = initialized_bridge();
    let (sink, rec) = recorder();
    bridge.attach(Channel::ChatItems, sink).expect("attach");

    sdk.emit(Channel::ChatItems, json!({"text": "no id"}));
    sdk.emit(Channel::ChatItems, json!("not an object"));
    sdk.emit(Channel::ChatItems, json!({"id": 1, "text": "ok"}));

    assert_eq!(rec.events(), vec![json!({"id": 1, "text": "ok"})]);
    assert_eq!(rec.closed(), 0);
    assert!(bridge.is_attached(Channel::ChatItems));
}

#[test]
fn detach_is_idempotent_and_closes_once() {
    let (sdk, bridge) = initialized_bridge();
    assert!(!bridge.detach(Channel::Connection));

    let (sink, rec) = recorder();
    bridge.attach(Channel::Connection, sink).expect("attach");
    assert!(bridge.detach(Channel::Connection));
    assert!(!bridge.detach(Channel::Connection));

    assert_eq!(rec.closed(), 1);
    assert_eq!(sdk.releases(Channel::Connection), 1);
}

#[test]
fn attach_before_initialize_fails_without_registration() {
    let (sdk, bridge) = bridge_with(BridgeConfig::default());
    let (sink, rec) = recorder();

    let result = bridge.attach_channel("agents", sink);
    assert!(matches!(
        result,
        Err(BridgeError::NotInitialized {
            channel: Channel::Agents
        })
    ));
    assert_eq!(rec.closed(), 1);
    assert_eq!(sdk.registrations(Channel::Agents), 0);
    assert!(!bridge.has_token(Channel::Agents));
}

#[test]
fn session_error_from_sdk_maps_to_not_initialized() {
    let (sdk, bridge) = initialized_bridge();
    sdk.fail_next_observe(NativeError::SessionNotInitialized);
    let (sink, _rec) = recorder();

    let result = bridge.attach(Channel::Account, sink);
    assert!(matches!(
        result,
        Err(BridgeError::NotInitialized {
            channel: Channel::Account
        })
    ));
}

#[test]
fn registration_failure_leaves_no_token_and_next_attach_works() {
    let (sdk, bridge) = initialized_bridge();
    sdk.fail_next_observe(NativeError::Rejected {
        reason: "quota".to_owned(),
    });
    let (sink, rec) = recorder();

    let result = bridge.attach(Channel::Agents, sink);
    assert!(matches!(
        result,
        Err(BridgeError::Registration {
            channel: Channel::Agents,
            ..
        })
    ));
    assert!(!bridge.has_token(Channel::Agents));
    assert!(!bridge.is_attached(Channel::Agents));
    assert_eq!(rec.closed(), 1);

    let (sink, rec) = recorder();
    let outcome = bridge.attach(Channel::Agents, sink).expect("retry attach");
    assert_eq!(outcome, AttachOutcome::Attached);
    sdk.emit(Channel::Agents, valid_payload(Channel::Agents, 0));
    assert_eq!(rec.len(), 1);
}

#[test]
fn value_pushed_during_registration_is_delivered() {
    let (sdk, bridge) = initialized_bridge();
    sdk.emit_on_observe(Channel::Connection, json!("CONNECTING"));
    let (sink, rec) = recorder();

    bridge.attach(Channel::Connection, sink).expect("attach");

    assert_eq!(rec.events(), vec![json!("CONNECTING")]);
}

#[test]
fn teardown_releases_every_token_and_closes_subscribers() {
    let (sdk, bridge) = initialized_bridge();
    let mut recorders = Vec::new();
    for channel in Channel::ALL {
        let (sink, rec) = recorder();
        bridge.attach(channel, sink).expect("attach");
        recorders.push(rec);
    }

    bridge.teardown();
    bridge.teardown();

    for channel in Channel::ALL {
        assert_eq!(sdk.live_tokens(channel), 0);
        assert_eq!(sdk.releases(channel), 1);
        assert!(!bridge.has_token(channel));
    }
    assert!(recorders.iter().all(|rec| rec.closed() == 1));
}

#[test]
fn dropping_bridge_releases_tokens() {
    let (sdk, bridge) = initialized_bridge();
    let (sink, rec) = recorder();
    bridge.attach(Channel::ChatItems, sink).expect("attach");

    drop(bridge);

    assert_eq!(sdk.live_tokens(Channel::ChatItems), 0);
    assert_eq!(rec.closed(), 1);
    assert_eq!(
        sdk.emit_released(Channel::ChatItems, json!({"id": 1})),
        1
    );
    assert!(rec.events().is_empty());
}
