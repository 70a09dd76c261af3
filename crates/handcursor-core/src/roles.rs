//! Primary/secondary hand assignment.
//!
//! The first hand to appear becomes PRIMARY and keeps that role until it
//! is lost; a remaining SECONDARY hand is then promoted. A hand is lost
//! only after `hand_lost_frames` consecutive frames without it, so single
//! dropped frames do not reset a gesture. Hands beyond the second are
//! ignored.

use handcursor_proto::HandType;

/// A change in role assignment, in the order it must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleEvent {
    /// The hand in `role` has been missing long enough to count as lost.
    Lost {
        /// Role the hand held.
        role: HandType,
        /// Sensor id of the hand.
        id: u32,
    },
    /// The SECONDARY hand became PRIMARY.
    Promoted {
        /// Sensor id of the promoted hand.
        id: u32,
    },
    /// A newly seen hand was given `role`.
    Assigned {
        /// Role given.
        role: HandType,
        /// Sensor id of the hand.
        id: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    id: u32,
    missing: u32,
}

/// Tracks which sensor hand holds which role.
#[derive(Debug, Clone, Default)]
pub struct HandRoles {
    primary: Option<Slot>,
    secondary: Option<Slot>,
}

const fn index(role: HandType) -> usize {
    match role {
        HandType::Primary => 0,
        HandType::Secondary => 1,
    }
}

impl HandRoles {
    /// No hands assigned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot index for `role`; primary is 0.
    pub const fn slot_index(role: HandType) -> usize {
        index(role)
    }

    /// Sensor id holding `role`.
    pub fn id_of(&self, role: HandType) -> Option<u32> {
        self.slot(role).map(|slot| slot.id)
    }

    /// Role held by sensor id `id`.
    pub fn role_of(&self, id: u32) -> Option<HandType> {
        [HandType::Primary, HandType::Secondary].into_iter().find(|&role| self.id_of(role) == Some(id))
    }

    /// Whether the hand in `role` was missing from the last frame but is
    /// still within its grace period.
    pub fn is_missing(&self, role: HandType) -> bool {
        self.slot(role).is_some_and(|slot| slot.missing > 0)
    }

    /// Number of assigned hands.
    pub fn count(&self) -> usize {
        usize::from(self.primary.is_some()) + usize::from(self.secondary.is_some())
    }

    /// Whether no hand holds a role.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Roles currently held, primary first.
    pub fn assigned(&self) -> impl Iterator<Item = HandType> + '_ {
        [HandType::Primary, HandType::Secondary]
            .into_iter()
            .filter(|&role| self.slot(role).is_some())
    }

    /// Update from the ids present in a frame.
    ///
    /// Events come back in application order: losses, then promotion, then
    /// new assignments.
    pub fn observe(&mut self, present: &[u32], hand_lost_frames: u32) -> Vec<RoleEvent> {
        let mut events = Vec::new();

        for role in [HandType::Primary, HandType::Secondary] {
            let slot = self.slot_mut(role);
            let Some(current) = slot.as_mut() else { continue };
            if present.contains(&current.id) {
                current.missing = 0;
                continue;
            }
            current.missing += 1;
            if current.missing >= hand_lost_frames {
                events.push(RoleEvent::Lost { role, id: current.id });
                *slot = None;
            }
        }

        if self.primary.is_none() {
            if let Some(promoted) = self.secondary.take() {
                events.push(RoleEvent::Promoted { id: promoted.id });
                self.primary = Some(promoted);
            }
        }

        for &id in present {
            if self.role_of(id).is_some() {
                continue;
            }
            let role = if self.primary.is_none() {
                HandType::Primary
            } else if self.secondary.is_none() {
                HandType::Secondary
            } else {
                break;
            };
            *self.slot_mut(role) = Some(Slot { id, missing: 0 });
            events.push(RoleEvent::Assigned { role, id });
        }

        events
    }

    /// Drop every assignment, returning the losses secondary first so the
    /// primary's release is the last one delivered.
    pub fn clear(&mut self) -> Vec<RoleEvent> {
        let mut events = Vec::new();
        for role in [HandType::Secondary, HandType::Primary] {
            if let Some(slot) = self.slot_mut(role).take() {
                events.push(RoleEvent::Lost { role, id: slot.id });
            }
        }
        events
    }

    fn slot(&self, role: HandType) -> Option<&Slot> {
        match role {
            HandType::Primary => self.primary.as_ref(),
            HandType::Secondary => self.secondary.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: HandType) -> &mut Option<Slot> {
        match role {
            HandType::Primary => &mut self.primary,
            HandType::Secondary => &mut self.secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_hand_is_primary_second_is_secondary() {
        let mut roles = HandRoles::new();
        let events = roles.observe(&[7, 3], 2);
        assert_eq!(
            events,
            vec![
                RoleEvent::Assigned { role: HandType::Primary, id: 7 },
                RoleEvent::Assigned { role: HandType::Secondary, id: 3 },
            ]
        );
        assert_eq!(roles.role_of(3), Some(HandType::Secondary));
        assert_eq!(roles.count(), 2);
    }

    #[test]
    fn third_hand_is_ignored() {
        let mut roles = HandRoles::new();
        roles.observe(&[1, 2, 3], 2);
        assert_eq!(roles.role_of(3), None);
        assert!(roles.observe(&[1, 2, 3], 2).is_empty());
    }

    #[test]
    fn hand_survives_grace_period() {
        let mut roles = HandRoles::new();
        roles.observe(&[1], 3);
        assert!(roles.observe(&[], 3).is_empty());
        assert!(roles.is_missing(HandType::Primary));
        assert!(roles.observe(&[], 3).is_empty());
        assert!(roles.observe(&[1], 3).is_empty());
        assert!(!roles.is_missing(HandType::Primary));
        assert_eq!(roles.id_of(HandType::Primary), Some(1));
    }

    #[test]
    fn losing_primary_promotes_secondary() {
        let mut roles = HandRoles::new();
        roles.observe(&[1, 2], 1);
        let events = roles.observe(&[2], 1);
        assert_eq!(
            events,
            vec![RoleEvent::Lost { role: HandType::Primary, id: 1 }, RoleEvent::Promoted { id: 2 }]
        );
        assert_eq!(roles.id_of(HandType::Primary), Some(2));
        assert_eq!(roles.id_of(HandType::Secondary), None);

        // The returning hand is now secondary.
        let events = roles.observe(&[2, 1], 1);
        assert_eq!(events, vec![RoleEvent::Assigned { role: HandType::Secondary, id: 1 }]);
    }

    #[test]
    fn simultaneous_replacement_loses_then_assigns() {
        let mut roles = HandRoles::new();
        roles.observe(&[1], 1);
        let events = roles.observe(&[5], 1);
        assert_eq!(
            events,
            vec![
                RoleEvent::Lost { role: HandType::Primary, id: 1 },
                RoleEvent::Assigned { role: HandType::Primary, id: 5 },
            ]
        );
    }

    #[test]
    fn clear_reports_secondary_before_primary() {
        let mut roles = HandRoles::new();
        roles.observe(&[1, 2], 2);
        assert_eq!(
            roles.clear(),
            vec![
                RoleEvent::Lost { role: HandType::Secondary, id: 2 },
                RoleEvent::Lost { role: HandType::Primary, id: 1 },
            ]
        );
        assert!(roles.is_empty());
    }
}
