//! Reusable oracles.
//!
//! Each helper returns an [`OracleFn`]; combine them with [`all_of`].

use std::collections::HashMap;

use handcursor_core::Channel;
use handcursor_proto::{Chirality, InputAction, InputType, payloads::presence::HandPresenceState};

use crate::scenario::OracleFn;

/// Every oracle in `oracles` must pass; the first failure is reported.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| oracles.iter().try_for_each(|oracle| oracle(world)))
}

/// Exactly `expected` actions of `input_type` on the ALL channel.
pub fn count(input_type: InputType, expected: usize) -> OracleFn {
    Box::new(move |world| {
        let actual = world.actions().count(input_type);
        if actual == expected {
            Ok(())
        } else {
            Err(format!("expected {expected} {input_type:?} actions, got {actual}: {:?}", world.actions().types()))
        }
    })
}

/// Nothing was delivered on `channel`.
pub fn silent(channel: Channel) -> OracleFn {
    Box::new(move |world| {
        let recorder = world.channel(channel);
        if recorder.is_empty() {
            Ok(())
        } else {
            Err(format!("{channel:?} channel received {:?}", recorder.types()))
        }
    })
}

/// Per hand (keyed by chirality): no DOWN while pressed, and every UP
/// closes a press that was open. A CANCEL outside a press is allowed; it
/// abandons a dwell ramp.
pub fn presses_balanced() -> OracleFn {
    Box::new(|world| press_balance(&world.actions().actions()).map(|_| ()))
}

/// Like [`presses_balanced`], and additionally no press is left open.
pub fn all_presses_closed() -> OracleFn {
    Box::new(|world| {
        let open = press_balance(&world.actions().actions())?;
        if open.is_empty() { Ok(()) } else { Err(format!("presses still open for {open:?}")) }
    })
}

/// `ProgressToClick` stayed within `[0, 1]` and was 0 on every UP/CANCEL.
pub fn progress_in_range() -> OracleFn {
    Box::new(|world| {
        for action in world.actions().actions() {
            if !(0.0..=1.0).contains(&action.progress_to_click) {
                return Err(format!("progress out of range: {action:?}"));
            }
            if action.input_type.is_terminal() && action.progress_to_click > 0.0 {
                return Err(format!("terminal action with progress: {action:?}"));
            }
        }
        Ok(())
    })
}

/// Presence notifications were exactly `expected`.
pub fn presence(expected: Vec<HandPresenceState>) -> OracleFn {
    Box::new(move |world| {
        if world.presence() == expected.as_slice() {
            Ok(())
        } else {
            Err(format!("expected presence {expected:?}, got {:?}", world.presence()))
        }
    })
}

/// The engine's configuration generation is `expected`.
pub fn generation(expected: u64) -> OracleFn {
    Box::new(move |world| {
        let actual = world.engine().generation();
        if actual == expected {
            Ok(())
        } else {
            Err(format!("expected generation {expected}, got {actual}"))
        }
    })
}

/// Check press pairing, returning the hands still pressed.
fn press_balance(actions: &[InputAction]) -> Result<Vec<Chirality>, String> {
    let mut pressed: HashMap<Chirality, bool> = HashMap::new();
    for action in actions {
        let state = pressed.entry(action.chirality).or_insert(false);
        match action.input_type {
            InputType::Down if *state => {
                return Err(format!("DOWN while already pressed: {action:?}"));
            },
            InputType::Down => *state = true,
            InputType::Up if !*state => {
                return Err(format!("UP without a press: {action:?}"));
            },
            InputType::Up | InputType::Cancel => *state = false,
            _ => {},
        }
    }
    Ok(pressed.into_iter().filter_map(|(hand, open)| open.then_some(hand)).collect())
}
