//! Property-based tests for the connection state machine

use super::*;
use proptest::prelude::*;

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => Just(Event::Toggle),
        1 => Just(Event::SessionOpened),
        1 => "[a-z ]{1,20}".prop_map(|message| Event::OpenFailed { message }),
        1 => proptest::option::of("[a-z ]{1,20}").prop_map(|error| Event::SessionClosed { error }),
    ]
}

fn arb_state() -> impl Strategy<Value = ConnectionState> {
    prop_oneof![
        Just(ConnectionState::Disconnected),
        Just(ConnectionState::Connecting {
            direction: Direction::Opening
        }),
        Just(ConnectionState::Connecting {
            direction: Direction::Closing
        }),
        Just(ConnectionState::Connected),
    ]
}

/// Sessions alive after applying an effect list to `live`
fn apply_sessions(live: u32, effects: &[Effect]) -> u32 {
    effects.iter().fold(live, |n, e| match e {
        Effect::OpenSession => n + 1,
        Effect::CloseSession => n.saturating_sub(1),
        _ => n,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Never two sessions, whatever the order of events
    #[test]
    fn prop_at_most_one_session(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConnectionState::Disconnected;
        let mut live = 0u32;
        let mut opening = false;

        for event in events {
            let Ok(result) = transition(state, event.clone()) else {
                continue;
            };
            live = apply_sessions(live, &result.effects);
            if result.effects.contains(&Effect::OpenSession) {
                opening = true;
            }
            // A failed open discards its handle
            if opening && matches!(event, Event::OpenFailed { .. }) {
                live = live.saturating_sub(1);
                opening = false;
            }
            if matches!(event, Event::SessionOpened) {
                opening = false;
            }
            state = result.new_state;
            prop_assert!(live <= 1, "{} live sessions in {:?}", live, state);
            if state == ConnectionState::Disconnected {
                prop_assert_eq!(live, 0);
            }
            if state == ConnectionState::Connected {
                prop_assert_eq!(live, 1);
            }
        }
    }

    // Toggle during Connecting changes nothing
    #[test]
    fn prop_toggle_ignored_while_connecting(state in arb_state()) {
        let result = transition(state, Event::Toggle);
        if state.is_in_flight() {
            prop_assert_eq!(result.unwrap_err(), TransitionError::InFlight);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    // Every successful transition tells the client where it landed
    #[test]
    fn prop_success_notifies_new_state(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(state, event) {
            let notified: Vec<_> = result
                .effects
                .iter()
                .filter_map(|e| match e {
                    Effect::NotifyClient { state } => Some(*state),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(notified, vec![result.new_state]);
            prop_assert_ne!(result.new_state, state);
        }
    }

    // Whatever happens, the user can always get back to Disconnected
    #[test]
    fn prop_disconnected_reachable(events in proptest::collection::vec(arb_event(), 0..20)) {
        let mut state = ConnectionState::Disconnected;
        for event in events {
            if let Ok(result) = transition(state, event) {
                state = result.new_state;
            }
        }

        let recovery = match state {
            ConnectionState::Disconnected => vec![],
            ConnectionState::Connected => vec![Event::Toggle, Event::SessionClosed { error: None }],
            ConnectionState::Connecting { direction: Direction::Opening } => {
                vec![Event::OpenFailed { message: "gone".to_string() }]
            }
            ConnectionState::Connecting { direction: Direction::Closing } => {
                vec![Event::SessionClosed { error: Some("reset".to_string()) }]
            }
        };
        for event in recovery {
            state = transition(state, event).unwrap().new_state;
        }
        prop_assert_eq!(state, ConnectionState::Disconnected);
    }
}
