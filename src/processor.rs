use tracing::debug;

use crate::{
    config::ProcessorConfig,
    hazard_detection::{forwarding_unit, Forward, HazardReport},
    history::{History, Snapshot},
    instruction::{Instruction, Operation},
    registers::Register,
    stages::{Slots, StageName, Topology},
};

/// the outcome of advancing the pipeline by one cycle
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Transition {
    pub slots: Slots,
    pub cursor: usize,
    /// the Decode hazard state that decided whether the front of the pipe advanced
    pub report: HazardReport,
}

/// Compute the pipeline state one cycle after `slots`.
///
/// Decode's hazard state is evaluated once, before anything moves. Writeback, Memory and
/// Execute always advance, tail first. Decode and Fetch advance only if Decode does not stall,
/// in which case the instruction at `cursor` (if any) is fetched. On a stall Execute is left
/// empty, which is the bubble.
#[must_use]
pub fn transition(
    slots: &Slots,
    program: &[Instruction],
    cursor: usize,
    topology: &Topology,
    forwarding: bool,
) -> Transition {
    let report = slots.hazard_report(StageName::Decode, topology, forwarding);
    let mut next = *slots;
    let mut cursor = cursor;

    next.shift(StageName::Writeback);
    next.shift(StageName::Memory);
    next.shift(StageName::Execute);

    if !report.stall {
        next.shift(StageName::Decode);
        next.shift(StageName::Fetch);
        match program.get(cursor) {
            Some(instruction) => {
                next.set_instruction(StageName::Fetch, Some(*instruction));
                cursor += 1;
            }
            None => next.clear(StageName::Fetch),
        }
    }

    Transition {
        slots: next,
        cursor,
        report,
    }
}

/// A five stage in-order pipeline that can be stepped forwards and backwards.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Processor {
    /// The loaded program. Only ever appended to, or emptied by `clear_program()`.
    program: Vec<Instruction>,
    /// index of the next instruction to fetch, never greater than `program.len()`
    cursor: usize,
    cycle: u64,
    slots: Slots,
    /// One snapshot per forward step since the last reset, so its depth always equals `cycle`.
    history: History,
    config: ProcessorConfig,
}

impl Processor {
    /// Initialize the processor with an empty program and the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// the program the terminal front end offers as a demo: it stalls on R1, R4 and R5
    #[must_use]
    pub fn example_program() -> Vec<Instruction> {
        use Register::*;
        vec![
            Instruction::rtype(Operation::Add, R1, R2, R3),
            Instruction::rtype(Operation::Sub, R4, R1, R5),
            Instruction::rtype(Operation::And, R5, R1, R4),
            Instruction::nop(),
            Instruction::rtype(Operation::Or, R2, R4, R5),
        ]
    }

    /// Append an instruction to the program.
    ///
    /// Allowed mid-simulation; it will be fetched once the cursor reaches it.
    pub fn load_instruction(&mut self, instruction: Instruction) {
        self.program.push(instruction);
    }

    /// replace the program with `instructions` and reset
    pub fn load_example_program(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.clear_program();
        self.program.extend(instructions);
    }

    pub fn clear_program(&mut self) {
        self.program.clear();
        self.reset();
    }

    /// Return to cycle 0 with an empty pipeline, keeping the program.
    pub fn reset(&mut self) {
        self.cycle = 0;
        self.cursor = 0;
        self.history.clear();
        self.slots.clear_all();
        debug!(program_len = self.program.len(), "processor reset");
    }

    /// Advance the pipeline by one cycle, returning the hazard report that governed it.
    pub fn step_forward(&mut self) -> HazardReport {
        self.history.push(self.snapshot());
        self.cycle += 1;

        let Transition {
            slots,
            cursor,
            report,
        } = transition(
            &self.slots,
            &self.program,
            self.cursor,
            &self.config.topology,
            self.config.forwarding,
        );
        self.slots = slots;
        self.cursor = cursor;

        debug!(
            cycle = self.cycle,
            cursor = self.cursor,
            stall = report.stall,
            "stepped forward"
        );
        report
    }

    /// Undo the most recent forward step. Returns `false`, changing nothing, at cycle 0.
    pub fn step_backward(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        self.cycle = snapshot.cycle;
        self.cursor = snapshot.cursor;
        self.slots = snapshot.slots;
        debug!(cycle = self.cycle, cursor = self.cursor, "stepped backward");
        true
    }

    /// Step forward until the program has been fetched and the pipeline has drained.
    ///
    /// Returns the number of cycles stepped. Every stall resolves once its producer moves on,
    /// so this always terminates.
    pub fn run(&mut self) -> u64 {
        let start = self.cycle;
        while !self.is_done() {
            let _ = self.step_forward();
        }
        self.cycle - start
    }

    /// the current hazard state of the Decode stage
    #[must_use]
    pub fn hazard_details(&self) -> HazardReport {
        self.slots.hazard_report(
            StageName::Decode,
            &self.config.topology,
            self.config.forwarding,
        )
    }

    /// Which source operands of the instruction in Decode are forwarded from Memory.
    ///
    /// Always `(Forward::None, Forward::None)` while forwarding is disabled.
    #[must_use]
    pub fn forwarding_details(&self) -> (Forward, Forward) {
        if !self.config.forwarding {
            return (Forward::None, Forward::None);
        }
        forwarding_unit(
            self.slots.instruction(StageName::Decode),
            self.slots.instruction(StageName::Memory),
        )
    }

    /// Takes effect from the next hazard evaluation; snapshots already taken are unaffected.
    pub fn set_forwarding_enabled(&mut self, forwarding: bool) {
        self.config.forwarding = forwarding;
        debug!(forwarding, "forwarding toggled");
    }

    #[must_use]
    pub fn forwarding_enabled(&self) -> bool {
        self.config.forwarding
    }

    pub fn set_topology(&mut self, topology: Topology) {
        self.config.topology = topology;
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.config.topology
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    #[must_use]
    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.program.get(index)
    }

    #[must_use]
    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    #[must_use]
    pub fn stage(&self, stage: StageName) -> Option<Instruction> {
        self.slots.instruction(stage)
    }

    #[must_use]
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// whether every instruction has been fetched and has left the pipeline
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cursor == self.program.len() && self.slots.is_empty()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            cycle: self.cycle,
            cursor: self.cursor,
            slots: self.slots,
        }
    }
}
