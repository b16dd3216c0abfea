//! Legal action generation.
//!
//! Pure functions of the hand state, recomputed before every action. Starting
//! from all five actions:
//!
//! 1. CHECK only when the seat already matches the table maximum
//! 2. no FOLD when CHECK is available
//! 3. CALL only when something is owed and the stack can pay it without
//!    going all-in; otherwise ALL-IN is the way to continue
//! 4. RAISE only below the raise cap and when the stack covers the threshold
//! 5. ALL-IN whenever chips remain, even if it duplicates CALL or RAISE
//! 6. nothing at showdown

use super::card::Street;
use super::config::RaiseLegality;
use super::state::HandState;
use crate::cfr::action::{Action, ActionSet};

/// Bet level a RAISE moves the table maximum to.
///
/// One big blind when nothing is bet yet on this street, otherwise the table
/// maximum plus the larger of the last raise increment and the big blind.
pub fn min_raise_to(state: &HandState) -> f64 {
    let big_blind = state.config.big_blind;
    if state.table_max <= 0.0 {
        big_blind
    } else {
        state.table_max + state.last_raise_size.max(big_blind)
    }
}

/// Chips the seat to act must have behind for RAISE to be offered.
pub fn raise_threshold(state: &HandState) -> f64 {
    let bet = state.player(state.to_act).bet;
    match state.config.raise_legality {
        RaiseLegality::MatchApplied => min_raise_to(state) - bet,
        RaiseLegality::Reference => {
            if state.table_max <= 0.0 {
                state.config.big_blind
            } else {
                (state.table_max - bet) * 2.0
            }
        }
    }
}

/// Legal actions for the seat to act.
pub fn legal_actions(state: &HandState) -> ActionSet {
    if state.street == Street::Showdown {
        return ActionSet::empty();
    }
    let player = state.player(state.to_act);
    if !player.can_act() {
        return ActionSet::empty();
    }

    let mut legal = ActionSet::full();

    if player.bet != state.table_max {
        legal.remove(Action::Check);
    }
    if legal.contains(Action::Check) {
        legal.remove(Action::Fold);
    }

    let call = state.table_max - player.bet;
    if call <= 0.0 || call >= player.stack {
        legal.remove(Action::Call);
    }

    if player.stack < raise_threshold(state) || state.raises >= state.config.raise_cap {
        legal.remove(Action::Raise);
    }

    if player.stack <= 0.0 {
        legal.remove(Action::AllIn);
    }

    legal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::games::holdem::config::TableConfig;
    use crate::games::holdem::state::Seat;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn set(actions: &[Action]) -> ActionSet {
        actions.iter().copied().collect()
    }

    #[test]
    fn test_preflop_opening_actions() {
        let state = HandState::new(TableConfig::default(), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(
            legal_actions(&state),
            set(&[Action::Fold, Action::Call, Action::Raise, Action::AllIn])
        );
        assert_eq!(min_raise_to(&state), 2.0);
    }

    #[test]
    fn test_check_excludes_fold() {
        let mut state = HandState::new(TableConfig::default(), &mut StdRng::seed_from_u64(2)).unwrap();
        state.apply_action(Seat::BTN, Action::Call).unwrap();
        state.apply_action(Seat::SB, Action::Call).unwrap();
        assert_eq!(
            legal_actions(&state),
            set(&[Action::Check, Action::Raise, Action::AllIn])
        );
    }

    #[test]
    fn test_raise_cap() {
        let mut state = HandState::new(TableConfig::default(), &mut StdRng::seed_from_u64(3)).unwrap();
        for seat in [Seat::BTN, Seat::SB, Seat::BB, Seat::BTN] {
            state.apply_action(seat, Action::Raise).unwrap();
        }
        assert_eq!(state.raises, 4);
        assert!(!legal_actions(&state).contains(Action::Raise));
        assert!(legal_actions(&state).contains(Action::AllIn));
    }

    #[test]
    fn test_short_stack_must_shove() {
        let config = TableConfig {
            stacks: [100.0, 3.0, 100.0],
            ..TableConfig::default()
        };
        let mut state = HandState::new(config, &mut StdRng::seed_from_u64(4)).unwrap();
        state.apply_action(Seat::BTN, Action::Raise).unwrap();
        state.apply_action(Seat::SB, Action::Raise).unwrap();
        // BB has 2 behind and faces 2 more
        assert_eq!(
            legal_actions(&state),
            set(&[Action::Fold, Action::AllIn])
        );
    }

    #[test]
    fn test_reference_threshold_can_overpromise() {
        // The reference threshold doubles what is owed (2 -> 4) while the
        // applied raise only needs 3 more.
        let config = TableConfig {
            stacks: [100.0, 100.0, 100.0],
            ..TableConfig::default()
        }
        .with_raise_legality(RaiseLegality::Reference);
        let mut state = HandState::new(config, &mut StdRng::seed_from_u64(5)).unwrap();
        state.apply_action(Seat::BTN, Action::Raise).unwrap(); // to 2
        state.apply_action(Seat::SB, Action::Raise).unwrap(); // to 3
        state.apply_action(Seat::BB, Action::Raise).unwrap(); // to 4
        assert_eq!(raise_threshold(&state), 4.0);
        assert_eq!(min_raise_to(&state) - state.player(Seat::BTN).bet, 3.0);

        state.players[Seat::BTN.index()].stack = 2.5;
        assert!(!legal_actions(&state).contains(Action::Raise));
    }

    #[test]
    fn test_reference_raise_can_fail_when_applied() {
        let config = TableConfig::default().with_raise_legality(RaiseLegality::Reference);
        let mut state = HandState::new(config, &mut StdRng::seed_from_u64(6)).unwrap();
        state.apply_action(Seat::BTN, Action::AllIn).unwrap(); // to 100, increment kept at 1
        state.apply_action(Seat::SB, Action::Fold).unwrap();
        // BB faces 99: threshold 198 is unaffordable, only FOLD / ALL-IN remain
        assert_eq!(legal_actions(&state), set(&[Action::Fold, Action::AllIn]));

        // Give BB a deep stack with a raise that the threshold allows
        // but whose applied size (max + increment) is larger.
        state.players[Seat::BB.index()].stack = 198.0;
        state.last_raise_size = 150.0;
        assert!(legal_actions(&state).contains(Action::Raise));
        let err = state.apply_action(Seat::BB, Action::Raise).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStack { .. }));
    }

    #[test]
    fn test_match_applied_never_fails() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..300 {
            let config = TableConfig {
                stacks: [rng.gen_range(2..40) as f64, 25.0, rng.gen_range(2..40) as f64],
                ..TableConfig::default()
            };
            let mut state = HandState::new(config, &mut rng).unwrap();
            while !state.is_terminal() {
                let legal = legal_actions(&state);
                assert!(!legal.is_empty());
                for action in legal.iter() {
                    let mut probe = state;
                    probe.apply_action(probe.to_act, action).unwrap();
                }
                let pick = legal.iter().nth(rng.gen_range(0..legal.len())).unwrap();
                state.apply_action(state.to_act, pick).unwrap();
            }
            assert!(legal_actions(&state).is_empty());
        }
    }
}
