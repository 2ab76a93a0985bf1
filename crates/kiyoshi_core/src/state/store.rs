//! Explicitly constructed application store.
//!
//! # Responsibility
//! - Own the root state and apply actions through the root reducer.
//! - Notify listeners and feed sagas after each action.
//! - Expose an explicit init/shutdown lifecycle.
//!
//! # Invariants
//! - Actions, including saga follow-ups, are processed FIFO.
//! - One `dispatch` processes at most `max_follow_up_actions` follow-ups.
//! - After `shutdown`, every mutating call returns `StoreError::ShutDown`.

use crate::state::saga::Saga;
use crate::state::{reduce_root, Action, RootState};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Default cap on follow-up actions produced by one dispatch.
pub const DEFAULT_MAX_FOLLOW_UP_ACTIONS: usize = 64;

/// Construction options for `Store`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub max_follow_up_actions: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_follow_up_actions: DEFAULT_MAX_FOLLOW_UP_ACTIONS,
        }
    }
}

/// Store lifecycle and dispatch errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store was shut down.
    ShutDown,
    /// Sagas kept producing actions past the configured cap.
    FollowUpLimitExceeded { limit: usize },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShutDown => write!(f, "store has been shut down"),
            Self::FollowUpLimitExceeded { limit } => {
                write!(f, "dispatch exceeded {limit} follow-up actions")
            }
        }
    }
}

impl Error for StoreError {}

/// Handle returned by `Store::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&RootState)>;

/// Single-threaded store owning the root state, listeners and sagas.
pub struct Store {
    config: StoreConfig,
    state: RootState,
    sagas: Vec<Box<dyn Saga>>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: u64,
    running: bool,
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("state", &self.state)
            .field(
                "sagas",
                &self.sagas.iter().map(|saga| saga.name()).collect::<Vec<_>>(),
            )
            .field("listeners", &self.listeners.len())
            .field("running", &self.running)
            .finish()
    }
}

impl Store {
    /// Creates a running store with the default root state.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_state(config, RootState::default())
    }

    /// Creates a running store seeded with `state`.
    pub fn with_state(config: StoreConfig, state: RootState) -> Self {
        info!(
            "event=store_init module=store status=ok max_follow_up_actions={}",
            config.max_follow_up_actions
        );
        Self {
            config,
            state,
            sagas: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            running: true,
        }
    }

    pub fn state(&self) -> &RootState {
        &self.state
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Registers a saga; it sees every action dispatched from now on.
    pub fn run_saga(&mut self, saga: Box<dyn Saga>) -> Result<(), StoreError> {
        self.ensure_running()?;
        debug!("event=saga_start module=store status=ok saga={}", saga.name());
        self.sagas.push(saga);
        Ok(())
    }

    /// Registers a listener called with the new state after each action.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&RootState) + 'static,
    ) -> Result<ListenerId, StoreError> {
        self.ensure_running()?;
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        Ok(id)
    }

    /// Removes a listener; returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Applies `action` and every follow-up action produced by sagas.
    ///
    /// # Errors
    /// - `ShutDown` when called after `shutdown`.
    /// - `FollowUpLimitExceeded` when sagas keep emitting actions; actions
    ///   processed before the limit stay applied.
    pub fn dispatch(&mut self, action: Action) -> Result<(), StoreError> {
        self.ensure_running()?;

        let limit = self.config.max_follow_up_actions;
        let mut queue = VecDeque::from([action]);
        let mut follow_ups = 0usize;

        while let Some(action) = queue.pop_front() {
            debug!("event=dispatch module=store action={}", action.name());
            self.state = reduce_root(std::mem::take(&mut self.state), &action);

            for (_, listener) in &mut self.listeners {
                listener(&self.state);
            }

            for saga in &mut self.sagas {
                let produced = saga.on_action(&action, &self.state);
                follow_ups += produced.len();
                queue.extend(produced);
            }

            if follow_ups > limit {
                warn!(
                    "event=dispatch module=store status=error error_code=follow_up_limit limit={limit}"
                );
                return Err(StoreError::FollowUpLimitExceeded { limit });
            }
        }

        Ok(())
    }

    /// Stops the store: drops sagas and listeners and rejects new actions.
    ///
    /// Calling it again is a no-op. The last state stays readable.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        let sagas = self.sagas.len();
        self.sagas.clear();
        self.listeners.clear();
        info!("event=store_shutdown module=store status=ok sagas={sagas}");
    }

    fn ensure_running(&self) -> Result<(), StoreError> {
        if self.running {
            Ok(())
        } else {
            Err(StoreError::ShutDown)
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.shutdown();
    }
}
