//! Night resolver (spec.md §4.5).

use mafia_protocol::NightOutcome;
use mafia_protocol::Role;
use rand::seq::IndexedRandom;

use crate::consts::NIGHT_DEATH_MESSAGES;
use crate::room::RoomState;

impl RoomState {
    /// Applies the recorded night actions and produces the outcome,
    /// marking a kill in `self.eliminated` if one lands.
    pub(crate) fn resolve_night(&mut self) -> NightOutcome {
        let Some(kill) = &self.night_kill else {
            return NightOutcome::None;
        };

        let Some(target) = kill.target.clone() else {
            return NightOutcome::None;
        };

        // A save only counts if the doctor is still an alive, still-Doctor
        // actor as of resolution time: a doctor who died between acting
        // and resolution does not protect (spec.md §4.5 step 2).
        let save_is_valid = self.doctor_save.as_ref().is_some_and(|save| {
            self.role_of(&save.actor) == Some(Role::Doctor) && !self.eliminated.contains(&save.actor)
        });

        if save_is_valid {
            let save = self.doctor_save.as_ref().expect("checked above");
            if save.target.as_ref() == Some(&target) {
                return NightOutcome::Saved {
                    target,
                    saved_by: save.actor.clone(),
                };
            }
        }

        let role = self.role_of(&target).unwrap_or(Role::Civilian);
        self.eliminated.insert(target.clone());

        let death_message = (*NIGHT_DEATH_MESSAGES
            .choose(&mut rand::rng())
            .expect("at least one night death message"))
        .into();

        NightOutcome::Killed {
            target,
            role,
            death_message,
        }
    }
}
