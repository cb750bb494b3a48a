use tracing::trace;

use crate::{instruction::Instruction, registers::Register, stages::StageName};

/// which register field of an instruction took part in a hazard
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum RegisterRole {
    Destination,
    Source1,
    Source2,
}

/// one half of a register conflict: the stage involved and which of its register fields matched
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct HazardCause {
    pub stage: StageName,
    pub role: RegisterRole,
}

impl HazardCause {
    #[must_use]
    pub const fn new(stage: StageName, role: RegisterRole) -> Self {
        Self { stage, role }
    }
}

/// The result of checking one stage for read-after-write conflicts.
///
/// Causes come in pairs: the producer's destination, then the consumer's source that reads it.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct HazardReport {
    pub hazard: bool,
    /// every hazard stalls, so this always equals `hazard`
    pub stall: bool,
    pub causes: Vec<HazardCause>,
}

impl HazardReport {
    /// whether `stage` took part in any cause
    #[must_use]
    pub fn involves(&self, stage: StageName) -> bool {
        self.causes.iter().any(|cause| cause.stage == stage)
    }
}

/// The hazard detection unit determines whether the instruction held by a consumer stage
/// reads a register that an instruction in one of its producer stages has yet to write.
///
/// # Fields
///
/// * `consumer` - the stage whose instruction reads its source registers
/// * `instruction` - the instruction held by the consumer
/// * `producers` - the producer stages and what they hold, in the order they are checked
pub struct HazardDetectionUnit {
    consumer: StageName,
    instruction: Option<Instruction>,
    producers: Vec<(StageName, Option<Instruction>)>,
}

impl HazardDetectionUnit {
    /// prime the hazard detection unit with the relevant current pipeline state
    #[must_use]
    pub fn prime(
        consumer: StageName,
        instruction: Option<Instruction>,
        producers: Vec<(StageName, Option<Instruction>)>,
    ) -> Self {
        Self {
            consumer,
            instruction,
            producers,
        }
    }

    /// Detect whether the consumer has to stall.
    ///
    /// With `forwarding` enabled, a producer in the Memory stage forwards its result and never
    /// causes a stall. Producers in any other stage still do.
    #[must_use]
    pub fn detect(self, forwarding: bool) -> HazardReport {
        let mut report = HazardReport::default();
        let Some(instruction) = self.instruction else {
            return report;
        };

        for (producer, held) in self.producers {
            // no-ops and instructions that write nothing never conflict
            let Some(rd) = held.and_then(|held| held.rd) else {
                continue;
            };
            if forwarding && producer == StageName::Memory {
                continue;
            }

            for (source, role) in [
                (instruction.rs1, RegisterRole::Source1),
                (instruction.rs2, RegisterRole::Source2),
            ] {
                if source == Some(rd) {
                    trace!(%producer, consumer = %self.consumer, register = %rd, ?role, "read after write hazard");
                    report
                        .causes
                        .push(HazardCause::new(producer, RegisterRole::Destination));
                    report.causes.push(HazardCause::new(self.consumer, role));
                }
            }
        }

        report.hazard = !report.causes.is_empty();
        report.stall = report.hazard;
        report
    }
}

/// where the value of a source operand comes from when it is read
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Forward {
    /// the value is read from the register file
    #[default]
    None,
    /// the value is forwarded from the instruction in the Memory stage
    Memory,
}

/// The forwarding unit determines, for each source operand of `consumer`, whether its value is
/// forwarded from the instruction in the Memory stage rather than read from the register file.
///
/// Only the Memory path exists, so a dependency on Execute is left to the hazard detection unit.
#[must_use]
pub fn forwarding_unit(
    consumer: Option<Instruction>,
    memory: Option<Instruction>,
) -> (Forward, Forward) {
    let memory_rd: Option<Register> = memory.and_then(|instruction| instruction.rd);
    let select = |source: Option<Register>| match (source, memory_rd) {
        (Some(source), Some(rd)) if source == rd => Forward::Memory,
        _ => Forward::None,
    };

    match consumer {
        Some(instruction) => (select(instruction.rs1), select(instruction.rs2)),
        None => (Forward::None, Forward::None),
    }
}
