//! Recording display sink for tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use geo::Coord;

use crate::sink::{DisplaySink, Marker, MarkerKey};

/// A command received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCommand {
    /// `add_marker` call.
    AddMarker {
        /// Marker key.
        key: MarkerKey,
        /// Marker position.
        coordinate: Coord<f64>,
        /// Marker label.
        label: String,
    },
    /// `remove_marker` call.
    RemoveMarker {
        /// Marker key.
        key: MarkerKey,
    },
    /// `set_viewport` call.
    SetViewport {
        /// New centre.
        center: Coord<f64>,
        /// New zoom.
        zoom: f64,
    },
}

/// Sink that records every command; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<SinkCommand>>>,
}

impl RecordingSink {
    /// Commands received so far, oldest first.
    pub fn commands(&self) -> Vec<SinkCommand> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// Forget recorded commands.
    pub fn clear(&self) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.clear();
        }
    }

    /// Markers displayed after replaying every command.
    ///
    /// Panics when a command adds a key that is already shown or removes one
    /// that is not, since the engine must never do either.
    pub fn displayed(&self) -> BTreeMap<MarkerKey, Marker> {
        let mut shown = BTreeMap::new();
        for command in self.commands() {
            match command {
                SinkCommand::AddMarker {
                    key,
                    coordinate,
                    label,
                } => {
                    let previous = shown.insert(key.clone(), Marker { coordinate, label });
                    assert!(previous.is_none(), "marker {key} added twice");
                }
                SinkCommand::RemoveMarker { key } => {
                    assert!(shown.remove(&key).is_some(), "marker {key} removed while hidden");
                }
                SinkCommand::SetViewport { .. } => {}
            }
        }
        shown
    }

    /// Non-empty labels of displayed markers, in key order.
    pub fn labels(&self) -> Vec<String> {
        self.displayed()
            .into_values()
            .map(|marker| marker.label)
            .filter(|label| !label.is_empty())
            .collect()
    }

    /// Last viewport set on the sink.
    pub fn viewport(&self) -> Option<(Coord<f64>, f64)> {
        self.commands().into_iter().rev().find_map(|command| match command {
            SinkCommand::SetViewport { center, zoom } => Some((center, zoom)),
            _ => None,
        })
    }

    fn record(&self, command: SinkCommand) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command);
        }
    }
}

impl DisplaySink for RecordingSink {
    fn add_marker(&mut self, key: &MarkerKey, coordinate: Coord<f64>, label: &str) {
        self.record(SinkCommand::AddMarker {
            key: key.clone(),
            coordinate,
            label: label.to_owned(),
        });
    }

    fn remove_marker(&mut self, key: &MarkerKey) {
        self.record(SinkCommand::RemoveMarker { key: key.clone() });
    }

    fn set_viewport(&mut self, center: Coord<f64>, zoom: f64) {
        self.record(SinkCommand::SetViewport { center, zoom });
    }
}
