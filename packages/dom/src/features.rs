/// Capabilities of the simulated environment
///
/// A browser-like host supports everything; clearing flags emulates older engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Queued character-data mutation records
    pub mutation_observer: bool,
    /// Synchronous `DOMCharacterDataModified` events
    pub mutation_events: bool,
    pub event_listeners: bool,
    /// Accessor-style property interception is available
    pub property_descriptors: bool,
}

impl Features {
    pub fn all() -> Self {
        Self {
            mutation_observer: true,
            mutation_events: true,
            event_listeners: true,
            property_descriptors: true,
        }
    }

    /// Legacy engine: mutation events but no observers
    pub fn legacy() -> Self {
        Self {
            mutation_observer: false,
            ..Self::all()
        }
    }

    /// Neither observers nor mutation events
    pub fn unobservable() -> Self {
        Self {
            mutation_observer: false,
            mutation_events: false,
            ..Self::all()
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::all()
    }
}
