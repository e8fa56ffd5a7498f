use std::time::Instant;

use crate::domain::value_objects::CoordinatorState;

/// State transition record
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: CoordinatorState,
    pub to: CoordinatorState,
    pub timestamp: Instant,
    pub reason: Option<String>,
}

/// Domain entity tracking the coordinator's lifecycle
#[derive(Debug)]
pub struct StreamLifecycle {
    current_state: CoordinatorState,
    state_history: Vec<StateTransition>,
    streaming_since: Option<Instant>,
}

impl StreamLifecycle {
    pub fn new() -> Self {
        Self {
            current_state: CoordinatorState::Idle,
            state_history: Vec::new(),
            streaming_since: None,
        }
    }

    pub fn current_state(&self) -> &CoordinatorState {
        &self.current_state
    }

    /// Time spent in the current streaming run, if any
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.streaming_since.map(|since| since.elapsed())
    }

    pub fn transition_count(&self) -> usize {
        self.state_history.len()
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.state_history.last()
    }

    pub fn transition_to_streaming(&mut self) {
        self.record_transition(CoordinatorState::Streaming, None);
        self.streaming_since = Some(Instant::now());
    }

    pub fn transition_to_idle(&mut self) {
        self.record_transition(CoordinatorState::Idle, None);
        self.streaming_since = None;
    }

    pub fn transition_to_draining(&mut self, reason: impl Into<String>) {
        self.record_transition(CoordinatorState::Draining, Some(reason.into()));
        self.streaming_since = None;
    }

    fn record_transition(&mut self, new_state: CoordinatorState, reason: Option<String>) {
        let transition = StateTransition {
            from: self.current_state,
            to: new_state,
            timestamp: Instant::now(),
            reason,
        };

        self.state_history.push(transition);
        self.current_state = new_state;
    }
}

impl Default for StreamLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
