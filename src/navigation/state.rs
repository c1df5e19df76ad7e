//! Obstacle avoidance state machine
//!
//! Pure decision logic; [`super::NavigationLoop`] applies the returned
//! [`Action`] to the motors and sensor log.
//!
//! | Latched | Sample          | Action | Latched after |
//! |---------|-----------------|--------|---------------|
//! | no      | <= threshold    | Record | no            |
//! | no      | > threshold     | Turn   | yes           |
//! | yes     | > threshold     | Hold   | yes           |
//! | yes     | <= threshold    | Record | no            |

use super::heading::Heading;

/// Turns that make up one heading rollover
pub const TURNS_PER_ROLLOVER: u8 = 4;

/// What the loop should do with one valid sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Within threshold: append the distance to the log
    Record(f64),
    /// Beyond threshold but already latched: nothing new
    Hold,
    /// First sample beyond threshold: turn away.
    /// `rollover` carries the new heading when the turn counter wrapped.
    Turn { rollover: Option<Heading> },
}

/// Loop-local navigation state carried across iterations
#[derive(Debug, Clone)]
pub struct NavigationState {
    threshold_cm: f64,
    obstacle_latched: bool,
    turn_count: u8,
    heading: Heading,
}

impl NavigationState {
    /// `initial_turn_count` is reduced modulo [`TURNS_PER_ROLLOVER`]
    pub fn new(threshold_cm: f64, initial_turn_count: u8) -> Self {
        Self {
            threshold_cm,
            obstacle_latched: false,
            turn_count: initial_turn_count % TURNS_PER_ROLLOVER,
            heading: Heading::default(),
        }
    }

    pub fn obstacle_latched(&self) -> bool {
        self.obstacle_latched
    }

    /// Turns since the last rollover, always in `0..4`
    pub fn turn_count(&self) -> u8 {
        self.turn_count
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Decide what to do with a valid distance sample
    pub fn on_sample(&mut self, distance_cm: f64) -> Action {
        if distance_cm > self.threshold_cm {
            if self.obstacle_latched {
                Action::Hold
            } else {
                self.obstacle_latched = true;
                Action::Turn {
                    rollover: self.register_turn(),
                }
            }
        } else {
            self.obstacle_latched = false;
            Action::Record(distance_cm)
        }
    }

    /// Count one turn; on the fourth, reset and advance the heading
    fn register_turn(&mut self) -> Option<Heading> {
        let next = self.turn_count + 1;
        if next == TURNS_PER_ROLLOVER {
            self.turn_count = 0;
            self.heading = self.heading.next();
            Some(self.heading)
        } else {
            self.turn_count = next;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_threshold_records() {
        let mut state = NavigationState::new(100.0, 0);
        assert_eq!(state.on_sample(50.0), Action::Record(50.0));
        assert!(!state.obstacle_latched());
    }

    #[test]
    fn test_exact_threshold_does_not_turn() {
        let mut state = NavigationState::new(100.0, 0);
        assert_eq!(state.on_sample(100.0), Action::Record(100.0));
        assert_eq!(state.turn_count(), 0);
    }

    #[test]
    fn test_one_turn_per_run_beyond_threshold() {
        let mut state = NavigationState::new(100.0, 0);
        let actions: Vec<_> = [150.0, 160.0, 170.0, 400.0]
            .into_iter()
            .map(|d| state.on_sample(d))
            .collect();

        assert_eq!(actions[0], Action::Turn { rollover: None });
        assert!(actions[1..].iter().all(|a| *a == Action::Hold));
        assert_eq!(state.turn_count(), 1);
    }

    #[test]
    fn test_latch_rearms_after_close_sample() {
        let mut state = NavigationState::new(100.0, 0);
        state.on_sample(150.0);
        state.on_sample(90.0);
        assert!(!state.obstacle_latched());
        assert_eq!(state.on_sample(150.0), Action::Turn { rollover: None });
        assert_eq!(state.turn_count(), 2);
    }

    #[test]
    fn test_rollover_exactly_when_count_was_three() {
        let mut state = NavigationState::new(100.0, 0);
        let mut rollovers = Vec::new();
        for i in 0..12 {
            let before = state.turn_count();
            assert!(before < TURNS_PER_ROLLOVER);
            let action = state.on_sample(200.0);
            state.on_sample(10.0);
            if let Action::Turn { rollover: Some(h) } = action {
                assert_eq!(before, 3);
                assert_eq!(state.turn_count(), 0);
                rollovers.push((i, h));
            } else {
                assert_ne!(before, 3);
            }
        }
        assert_eq!(
            rollovers,
            vec![(3, Heading::East), (7, Heading::South), (11, Heading::West)]
        );
    }

    #[test]
    fn test_initial_turn_count_three_rolls_over_on_first_turn() {
        let mut state = NavigationState::new(100.0, 3);
        assert_eq!(
            state.on_sample(120.0),
            Action::Turn {
                rollover: Some(Heading::East)
            }
        );
        assert_eq!(state.turn_count(), 0);
    }
}
