//! End-to-end scenarios: scripted hands through the full engine.

use handcursor_core::{Channel, ConfigBundle};
use handcursor_harness::scenario::{Scenario, oracle, responsive_config};
use handcursor_proto::{
    Chirality, HandType, InputType, InteractionType, payloads::presence::HandPresenceState,
};
use nalgebra::Vector2;
use proptest::prelude::*;

fn centre() -> Vector2<f32> {
    Vector2::new(960.0, 540.0)
}

fn with_type(kind: InteractionType) -> ConfigBundle {
    let mut bundle = responsive_config();
    bundle.interaction.interaction_type = kind;
    bundle
}

#[test]
fn push_produces_one_click() {
    let result = Scenario::new("push click")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            let mut frames = sensor.ticks(3);
            frames.extend(sensor.push(1, 0.0, 20));
            frames.extend(sensor.ticks(3));
            frames.extend(sensor.push(1, 0.20, 20));
            frames
        })
        .oracle(oracle::all_of(vec![
            oracle::count(InputType::Down, 1),
            oracle::count(InputType::Up, 1),
            oracle::count(InputType::Cancel, 0),
            oracle::all_presses_closed(),
            oracle::progress_in_range(),
            oracle::presence(vec![HandPresenceState::HandFound]),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn wobble_inside_release_band_does_not_chatter() {
    // Push activates below 4cm and releases above 5cm.
    let result = Scenario::new("push hysteresis")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            let mut frames = sensor.push(1, 0.035, 20);
            frames.extend(sensor.ticks(3));
            for i in 0..30 {
                sensor.set_distance(1, if i % 2 == 0 { 0.049 } else { 0.036 });
                frames.push(sensor.tick());
            }
            frames
        })
        .oracle(oracle::all_of(vec![
            oracle::count(InputType::Down, 1),
            oracle::count(InputType::Up, 0),
            oracle::presses_balanced(),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn dwell_clicks_once_with_rising_progress() {
    let world = Scenario::new("dwell")
        .config(with_type(InteractionType::Hover))
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Left, centre(), 0.10);
            sensor.dwell(1.2)
        })
        .oracle(oracle::all_of(vec![
            oracle::count(InputType::Down, 1),
            oracle::count(InputType::Up, 1),
            oracle::all_presses_closed(),
            oracle::progress_in_range(),
        ]))
        .run_world()
        .unwrap();

    let actions = world.actions().actions();
    let down = actions.iter().position(|a| a.input_type == InputType::Down).unwrap();
    let ramp: Vec<f32> =
        actions[..down].iter().map(|a| a.progress_to_click).filter(|p| *p > 0.0).collect();
    assert!(!ramp.is_empty());
    assert!(ramp.windows(2).all(|w| w[1] > w[0]), "progress must strictly increase: {ramp:?}");
    assert_eq!(actions[down + 1].input_type, InputType::Up);
    assert!(actions.iter().all(|a| a.interaction_type == InteractionType::Hover));
}

#[test]
fn dwell_interrupted_by_movement_cancels() {
    let result = Scenario::new("dwell interrupted")
        .config(with_type(InteractionType::Hover))
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Left, centre(), 0.10);
            let mut frames = sensor.dwell(0.75);
            sensor.move_to(1, centre() + Vector2::new(200.0, 0.0));
            frames.extend(sensor.ticks(5));
            frames
        })
        .oracle(oracle::all_of(vec![
            oracle::count(InputType::Down, 0),
            oracle::count(InputType::Cancel, 1),
            oracle::progress_in_range(),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn grab_closes_and_opens() {
    let result = Scenario::new("grab")
        .config(with_type(InteractionType::Grab))
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.15);
            sensor.set_grab(1, Some(0.0));
            let mut frames = sensor.ticks(2);
            frames.extend(sensor.grab(1, 1.0, 10));
            // Oscillate between the ungrab (0.6) and grab (0.8) thresholds.
            for i in 0..20 {
                sensor.set_grab(1, Some(if i % 2 == 0 { 0.62 } else { 0.78 }));
                frames.push(sensor.tick());
            }
            frames.extend(sensor.grab(1, 0.0, 10));
            frames
        })
        .oracle(oracle::all_of(vec![
            oracle::count(InputType::Down, 1),
            oracle::count(InputType::Up, 1),
            oracle::all_presses_closed(),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn short_dropout_keeps_press_long_dropout_cancels() {
    let result = Scenario::new("dropouts")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            let mut frames = sensor.push(1, 0.0, 20);
            frames.extend(sensor.dropout(1, 1));
            frames.extend(sensor.ticks(2));
            frames
        })
        .check("single missing frame is tolerated", oracle::count(InputType::Cancel, 0))
        .frames(|sensor| {
            let mut frames = sensor.dropout(1, 4);
            sensor.set_distance(1, 0.20);
            frames.extend(sensor.ticks(3));
            frames
        })
        .oracle(oracle::all_of(vec![
            oracle::count(InputType::Down, 1),
            oracle::count(InputType::Cancel, 1),
            oracle::count(InputType::Up, 0),
            oracle::all_presses_closed(),
            oracle::presence(vec![
                HandPresenceState::HandFound,
                HandPresenceState::HandsLost,
                HandPresenceState::HandFound,
            ]),
        ]))
        .run();

    assert!(result.is_ok(), "scenario should succeed: {result:?}");
}

#[test]
fn disconnect_cancels_and_suppresses_until_reconnect() {
    let world = Scenario::new("disconnect")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            sensor.push(1, 0.0, 20)
        })
        .disconnect()
        .check(
            "one cancel, hands lost",
            oracle::all_of(vec![
                oracle::count(InputType::Cancel, 1),
                oracle::all_presses_closed(),
                oracle::presence(vec![HandPresenceState::HandFound, HandPresenceState::HandsLost]),
            ]),
        )
        .frames(|sensor| sensor.ticks(10))
        .oracle(oracle::presence(vec![HandPresenceState::HandFound, HandPresenceState::HandsLost]))
        .run_world()
        .unwrap();

    let last = world.actions().actions().last().copied().unwrap();
    assert_eq!(last.input_type, InputType::Cancel, "nothing may follow the cancel while unavailable");

    let resumed = Scenario::new("reconnect")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            sensor.ticks(2)
        })
        .disconnect()
        .connect()
        .frames(|sensor| sensor.ticks(2))
        .oracle(oracle::presence(vec![
            HandPresenceState::HandFound,
            HandPresenceState::HandsLost,
            HandPresenceState::HandFound,
        ]))
        .run();
    assert!(resumed.is_ok(), "scenario should succeed: {resumed:?}");
}

#[test]
fn reload_applies_new_thresholds_on_next_tick() {
    let mut deeper = responsive_config();
    deeper.interaction.push.activation_distance_cm = 10.0;

    let world = Scenario::new("hot reload")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            sensor.push(1, 0.07, 10)
        })
        .check("7cm does not press at 4cm activation", oracle::count(InputType::Down, 0))
        .reload(deeper)
        .frames(|sensor| sensor.ticks(2))
        .oracle(oracle::all_of(vec![oracle::count(InputType::Down, 1), oracle::generation(1)]))
        .run_world()
        .unwrap();

    assert_eq!(world.generations(), &[1]);
    assert_eq!(world.loader().loads(), 1);
    assert!(!world.dirty().is_set());
}

#[test]
fn corrupt_reload_keeps_last_known_good() {
    let world = Scenario::new("corrupt reload")
        .config(responsive_config())
        .connect()
        .corrupt_reload("truncated document")
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            sensor.push(1, 0.0, 20)
        })
        .oracle(oracle::all_of(vec![oracle::count(InputType::Down, 1), oracle::generation(0)]))
        .run_world()
        .unwrap();

    assert_eq!(world.loader().loads(), 1);
    assert!(world.generations().is_empty());
}

#[test]
fn switching_mode_mid_press_cancels_old_mode() {
    let world = Scenario::new("mode switch")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            sensor.push(1, 0.0, 20)
        })
        .reload(with_type(InteractionType::TouchPlane))
        .frames(|sensor| sensor.ticks(3))
        .oracle(oracle::all_of(vec![oracle::count(InputType::Cancel, 1), oracle::presses_balanced()]))
        .run_world()
        .unwrap();

    let actions = world.actions().actions();
    let cancel = actions.iter().find(|a| a.input_type == InputType::Cancel).unwrap();
    assert_eq!(cancel.interaction_type, InteractionType::Push);
    assert_eq!(actions.last().map(|a| a.interaction_type), Some(InteractionType::TouchPlane));
}

#[test]
fn two_hands_route_by_role_and_chirality() {
    let world = Scenario::new("two hands")
        .config(responsive_config())
        .connect()
        .frames(|sensor| {
            sensor.add_hand(1, Chirality::Right, centre(), 0.20);
            sensor.add_hand(2, Chirality::Left, centre() - Vector2::new(300.0, 0.0), 0.20);
            let mut frames = sensor.ticks(3);
            frames.extend(sensor.push(2, 0.0, 20));
            frames
        })
        .oracle(oracle::all_of(vec![oracle::count(InputType::Down, 1), oracle::presses_balanced()]))
        .run_world()
        .unwrap();

    let primary = world.channel(Channel::Primary).actions();
    assert!(!primary.is_empty());
    assert!(primary.iter().all(|a| a.hand_type == HandType::Primary && a.chirality == Chirality::Right));

    let left = world.channel(Channel::Left).actions();
    assert!(left.iter().all(|a| a.hand_type == HandType::Secondary && a.chirality == Chirality::Left));
    assert_eq!(left.iter().filter(|a| a.input_type == InputType::Down).count(), 1);

    let right = world.channel(Channel::Right).actions();
    assert!(right.iter().all(|a| a.chirality == Chirality::Right));
    assert_eq!(world.actions().len(), left.len() + right.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever the hand does, presses pair up, and a disconnect leaves
    /// none open.
    #[test]
    fn presses_always_close_after_disconnect(
        script in prop::collection::vec((0.0f32..0.2, any::<bool>()), 1..80),
    ) {
        let result = Scenario::new("random script")
            .config(responsive_config())
            .connect()
            .frames(move |sensor| {
                sensor.add_hand(1, Chirality::Right, centre(), 0.20);
                script
                    .into_iter()
                    .map(|(distance, visible)| {
                        sensor.set_distance(1, distance);
                        sensor.set_visible(1, visible);
                        sensor.tick()
                    })
                    .collect()
            })
            .disconnect()
            .oracle(oracle::all_of(vec![
                oracle::all_presses_closed(),
                oracle::progress_in_range(),
            ]))
            .run();
        prop_assert!(result.is_ok(), "{:?}", result);
    }
}
