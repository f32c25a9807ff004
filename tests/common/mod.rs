#![allow(dead_code)]

use async_trait::async_trait;
use fleetsave::{Endpoint, Result, SaveError, StoreConnection, StoreConnector};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Observable store calls, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(String),
    DisableAutoSave(String),
    ReadLastSave(String, i64),
    TriggerSave(String),
    Close(String),
}

/// Scripted behaviour of one fake store
#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    markers: VecDeque<i64>,
    last: i64,
    step: i64,
    fail_connect: bool,
    fail_toggle: bool,
    fail_trigger: bool,
    connect_delay: Duration,
}

impl FakeNode {
    /// LASTSAVE answers `markers` in order, then keeps repeating the last one.
    pub fn markers(markers: impl IntoIterator<Item = i64>) -> Self {
        Self {
            markers: markers.into_iter().collect(),
            ..Default::default()
        }
    }

    /// LASTSAVE answers `start`, `start + 1`, ... so every save completes on
    /// its first poll.
    pub fn ticking(start: i64) -> Self {
        Self {
            markers: VecDeque::from([start]),
            step: 1,
            ..Default::default()
        }
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_toggle(mut self) -> Self {
        self.fail_toggle = true;
        self
    }

    pub fn failing_trigger(mut self) -> Self {
        self.fail_trigger = true;
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    fn next_marker(&mut self) -> i64 {
        match self.markers.pop_front() {
            Some(marker) => self.last = marker,
            None => self.last += self.step,
        }
        self.last
    }
}

#[derive(Default)]
struct FleetState {
    nodes: HashMap<String, FakeNode>,
    events: Vec<Event>,
    in_flight: usize,
    max_in_flight: usize,
    open_connections: usize,
}

/// In-memory fleet implementing `StoreConnector`. Clones share state.
#[derive(Clone, Default)]
pub struct FakeFleet {
    state: Arc<Mutex<FleetState>>,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(self, endpoint: &str, node: FakeNode) -> Self {
        self.state
            .lock()
            .unwrap()
            .nodes
            .insert(endpoint.to_string(), node);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn triggers(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::TriggerSave(endpoint) => Some(endpoint),
                _ => None,
            })
            .collect()
    }

    pub fn toggles(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::DisableAutoSave(endpoint) => Some(endpoint),
                _ => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().unwrap().open_connections
    }
}

#[async_trait]
impl StoreConnector for FakeFleet {
    type Connection = FakeConnection;

    async fn connect(&self, endpoint: &Endpoint, _timeout: Duration) -> Result<FakeConnection> {
        let delay = {
            let state = self.state.lock().unwrap();
            let node = state
                .nodes
                .get(endpoint.as_str())
                .ok_or_else(|| SaveError::connect(endpoint, "no such host"))?;
            if node.fail_connect {
                return Err(SaveError::connect(endpoint, "connection refused"));
            }
            node.connect_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.open_connections += 1;
        state.events.push(Event::Connect(endpoint.to_string()));
        Ok(FakeConnection {
            endpoint: endpoint.to_string(),
            state: Arc::clone(&self.state),
            triggered: false,
        })
    }
}

pub struct FakeConnection {
    endpoint: String,
    state: Arc<Mutex<FleetState>>,
    triggered: bool,
}

#[async_trait]
impl StoreConnection for FakeConnection {
    async fn read_last_save(&mut self) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        let marker = state
            .nodes
            .get_mut(&self.endpoint)
            .map(FakeNode::next_marker)
            .unwrap_or_default();
        state
            .events
            .push(Event::ReadLastSave(self.endpoint.clone(), marker));
        Ok(marker)
    }

    async fn trigger_save(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.nodes[&self.endpoint].fail_trigger {
            return Err(SaveError::protocol(
                &self.endpoint,
                "ERR Background save already in progress",
            ));
        }
        state.events.push(Event::TriggerSave(self.endpoint.clone()));
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        self.triggered = true;
        Ok(())
    }

    async fn disable_auto_save(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .events
            .push(Event::DisableAutoSave(self.endpoint.clone()));
        if state.nodes[&self.endpoint].fail_toggle {
            return Err(SaveError::protocol(&self.endpoint, "ERR CONFIG is disabled"));
        }
        Ok(())
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if self.triggered {
            state.in_flight -= 1;
        }
        state.open_connections -= 1;
        state.events.push(Event::Close(self.endpoint.clone()));
    }
}

pub fn endpoints(names: &[&str]) -> Vec<Endpoint> {
    names.iter().copied().map(Endpoint::from).collect()
}
