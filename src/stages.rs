//! The pipeline stages and the slots that hold the instruction occupying each one.
//!
//! Stages are identified by position rather than by reference: the successor of a stage is
//! the next position, and the stages a consumer checks for hazards are listed in a
//! [`Topology`], which is plain data owned by whoever drives the pipeline.

use std::fmt;

use crate::{
    hazard_detection::{HazardDetectionUnit, HazardReport},
    instruction::Instruction,
};

/// the number of stages in the pipeline
pub const STAGE_COUNT: usize = 5;

/// the stages of the pipeline, in the order instructions flow through them
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum StageName {
    Fetch = 0,
    Decode = 1,
    Execute = 2,
    Memory = 3,
    Writeback = 4,
}

impl StageName {
    pub const ALL: [StageName; STAGE_COUNT] = [
        StageName::Fetch,
        StageName::Decode,
        StageName::Execute,
        StageName::Memory,
        StageName::Writeback,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// the stage an instruction moves to when this stage advances, `None` for Writeback
    #[must_use]
    pub const fn successor(self) -> Option<StageName> {
        match self {
            StageName::Fetch => Some(StageName::Decode),
            StageName::Decode => Some(StageName::Execute),
            StageName::Execute => Some(StageName::Memory),
            StageName::Memory => Some(StageName::Writeback),
            StageName::Writeback => None,
        }
    }

    /// the short label used in pipeline tables
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            StageName::Fetch => "IF",
            StageName::Decode => "ID",
            StageName::Execute => "EX",
            StageName::Memory => "MEM",
            StageName::Writeback => "WB",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageName::Fetch => "Fetch",
            StageName::Decode => "Decode",
            StageName::Execute => "Execute",
            StageName::Memory => "Memory",
            StageName::Writeback => "Writeback",
        };
        f.write_str(name)
    }
}

/// Which stages each consumer stage compares its source registers against.
///
/// Stored as ordered `(consumer, producer)` pairs; the order of the producers for a consumer
/// is the order hazard causes are reported in.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Topology {
    dependencies: Vec<(StageName, StageName)>,
}

impl Topology {
    /// Decode reads its operands while its producers are in Execute or Memory.
    #[must_use]
    pub fn reference() -> Self {
        Self::from_pairs([
            (StageName::Decode, StageName::Execute),
            (StageName::Decode, StageName::Memory),
        ])
    }

    /// Like [`Topology::reference`], but a register write is not visible until the
    /// producer has left Writeback.
    #[must_use]
    pub fn writeback_inclusive() -> Self {
        Self::from_pairs([
            (StageName::Decode, StageName::Execute),
            (StageName::Decode, StageName::Memory),
            (StageName::Decode, StageName::Writeback),
        ])
    }

    /// a topology in which no stage ever stalls
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dependencies: Vec::new(),
        }
    }

    /// # Panics
    ///
    /// if a stage is listed as depending on itself or on a stage before it, since a stage can
    /// only consume values from instructions that entered the pipeline earlier.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (StageName, StageName)>) -> Self {
        let dependencies: Vec<_> = pairs.into_iter().collect();
        for (consumer, producer) in &dependencies {
            assert!(
                producer > consumer,
                "{consumer} cannot depend on {producer}: producers must be later in the pipeline"
            );
        }
        Self { dependencies }
    }

    /// the producers `consumer` must check, in reporting order
    pub fn producers_of(&self, consumer: StageName) -> impl Iterator<Item = StageName> + '_ {
        self.dependencies
            .iter()
            .filter(move |(c, _)| *c == consumer)
            .map(|(_, producer)| *producer)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::reference()
    }
}

/// The contents of the five stages, indexed by [`StageName`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct Slots {
    slots: [Option<Instruction>; STAGE_COUNT],
}

impl Slots {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [None; STAGE_COUNT],
        }
    }

    /// store a copy of `instruction` in `stage`, `None` empties the stage
    pub fn set_instruction(&mut self, stage: StageName, instruction: Option<Instruction>) {
        self.slots[stage.index()] = instruction;
    }

    #[must_use]
    pub const fn instruction(&self, stage: StageName) -> Option<Instruction> {
        self.slots[stage.index()]
    }

    pub fn clear(&mut self, stage: StageName) {
        self.slots[stage.index()] = None;
    }

    pub fn clear_all(&mut self) {
        self.slots = [None; STAGE_COUNT];
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// the stages paired with their contents, Fetch first
    pub fn iter(&self) -> impl Iterator<Item = (StageName, Option<Instruction>)> + '_ {
        StageName::ALL
            .iter()
            .map(|stage| (*stage, self.instruction(*stage)))
    }

    /// Evaluate the hazard state of `stage` against its producers in `topology`.
    #[must_use]
    pub fn hazard_report(
        &self,
        stage: StageName,
        topology: &Topology,
        forwarding: bool,
    ) -> HazardReport {
        let producers = topology
            .producers_of(stage)
            .map(|producer| (producer, self.instruction(producer)))
            .collect();
        HazardDetectionUnit::prime(stage, self.instruction(stage), producers).detect(forwarding)
    }

    #[must_use]
    pub fn has_hazard(&self, stage: StageName, topology: &Topology, forwarding: bool) -> bool {
        self.hazard_report(stage, topology, forwarding).stall
    }

    /// Move the instruction in `stage` into its successor.
    ///
    /// A stage with a hazard keeps its instruction, which is what stalls it. An empty stage
    /// leaves its successor untouched, and Writeback, having no successor, retires its
    /// instruction. Callers advance stages from Writeback toward Fetch so a successor has
    /// always been vacated before something moves into it.
    pub fn advance(&mut self, stage: StageName, topology: &Topology, forwarding: bool) {
        if !self.has_hazard(stage, topology, forwarding) {
            self.shift(stage);
        }
    }

    /// [`Slots::advance`] without the hazard check, for callers that already decided to move
    pub fn shift(&mut self, stage: StageName) {
        let Some(instruction) = self.instruction(stage) else {
            return;
        };
        if let Some(successor) = stage.successor() {
            self.set_instruction(successor, Some(instruction));
        }
        self.clear(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::{instruction::Operation, registers::Register::*};

    fn add() -> Instruction {
        Instruction::rtype(Operation::Add, R1, R2, R3)
    }

    fn sub() -> Instruction {
        Instruction::rtype(Operation::Sub, R4, R1, R5)
    }

    #[test]
    fn test_successor_chain() {
        let chain: Vec<StageName> =
            std::iter::successors(Some(StageName::Fetch), |stage| stage.successor()).collect();
        assert_eq!(chain, StageName::ALL.to_vec());
    }

    #[test]
    fn test_set_and_clear() {
        let mut slots = Slots::new();
        slots.set_instruction(StageName::Execute, Some(add()));
        assert_eq!(slots.instruction(StageName::Execute), Some(add()));

        slots.clear(StageName::Execute);
        slots.clear(StageName::Execute);
        assert_eq!(slots.instruction(StageName::Execute), None);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_advance_moves_into_successor() {
        let topology = Topology::reference();
        let mut slots = Slots::new();
        slots.set_instruction(StageName::Execute, Some(add()));

        slots.advance(StageName::Execute, &topology, false);

        assert_eq!(slots.instruction(StageName::Execute), None);
        assert_eq!(slots.instruction(StageName::Memory), Some(add()));
    }

    #[test]
    fn test_advance_empty_stage_leaves_successor() {
        let topology = Topology::reference();
        let mut slots = Slots::new();
        slots.set_instruction(StageName::Memory, Some(add()));

        slots.advance(StageName::Execute, &topology, false);

        assert_eq!(slots.instruction(StageName::Memory), Some(add()));
    }

    #[test]
    fn test_writeback_retires() {
        let topology = Topology::reference();
        let mut slots = Slots::new();
        slots.set_instruction(StageName::Writeback, Some(add()));

        slots.advance(StageName::Writeback, &topology, false);

        assert!(slots.is_empty());
    }

    #[test]
    fn test_advance_holds_on_hazard() {
        let topology = Topology::reference();
        let mut slots = Slots::new();
        slots.set_instruction(StageName::Decode, Some(sub()));
        slots.set_instruction(StageName::Execute, Some(add()));

        assert!(slots.has_hazard(StageName::Decode, &topology, false));
        slots.advance(StageName::Decode, &topology, false);

        assert_eq!(slots.instruction(StageName::Decode), Some(sub()));
        assert_eq!(slots.instruction(StageName::Execute), Some(add()));
    }

    #[test]
    fn test_topology_producers_in_order() {
        let producers: Vec<_> = Topology::writeback_inclusive()
            .producers_of(StageName::Decode)
            .collect();
        assert_eq!(
            producers,
            vec![StageName::Execute, StageName::Memory, StageName::Writeback]
        );
        assert_eq!(Topology::reference().producers_of(StageName::Fetch).count(), 0);
        assert_eq!(Topology::default(), Topology::reference());
    }

    #[test]
    #[should_panic]
    fn test_topology_rejects_backwards_dependency() {
        let _ = Topology::from_pairs([(StageName::Execute, StageName::Decode)]);
    }
}
