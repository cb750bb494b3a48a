use crate::stages::Topology;

/// How a [`Processor`](crate::processor::Processor) resolves register dependencies.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ProcessorConfig {
    /// forward results from the Memory stage instead of stalling on them
    pub forwarding: bool,
    /// the stages each consumer checks for hazards
    pub topology: Topology,
}

impl ProcessorConfig {
    #[must_use]
    pub fn with_forwarding(mut self, forwarding: bool) -> Self {
        self.forwarding = forwarding;
        self
    }

    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert!(!config.forwarding);
        assert_eq!(config.topology, Topology::reference());
    }

    #[test]
    fn test_builders() {
        let config = ProcessorConfig::default()
            .with_forwarding(true)
            .with_topology(Topology::writeback_inclusive());
        assert!(config.forwarding);
        assert_eq!(config.topology, Topology::writeback_inclusive());
    }
}
