pub mod config;
mod hazard_detection;
pub mod history;
pub mod instruction;
pub mod processor;
pub mod registers;
pub mod stages;

pub use hazard_detection::{Forward, HazardCause, HazardReport, RegisterRole};

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use crate::{
        config::ProcessorConfig,
        instruction::{parse_program, Instruction},
        processor::Processor,
        stages::StageName,
    };

    fn sample_program() -> Result<Vec<Instruction>> {
        parse_program(include_str!("../sample_program.txt"))

        // pipeline table with forwarding (expected):
        // | cycle | IF | ID | EX | MEM | WB |
        // |-------|----|----|----|-----|----|
        // | 1     | I1 |    |    |     |    |
        // | 2     | I2 | I1 |    |     |    |
        // | 3     | I3 | I2 | I1 |     |    | // I2 needs R1 from I1
        // | 4     | I3 | I2 | .. | I1  |    | // R1 forwarded from MEM
        // | 5     | I4 | I3 | I2 | ..  | I1 | // I3 needs R4 from I2
        // | 6     | I4 | I3 | .. | I2  | .. | // R4 forwarded from MEM
        // | 7     | I5 | I4 | I3 | ..  | I2 |
        // | 8     |    | I5 | I4 | I3  | .. | // R5 forwarded from MEM
        // | 9     |    |    | I5 | I4  | I3 |
        // | 10    |    |    |    | I5  | I4 |
        // | 11    |    |    |    |     | I5 |
        // | 12    |    |    |    |     |    |
    }

    #[test]
    fn test_sample_program_matches_example() -> Result<()> {
        assert_eq!(sample_program()?, Processor::example_program());
        Ok(())
    }

    #[test]
    fn test_sample_program_with_forwarding() -> Result<()> {
        let mut processor = Processor::with_config(ProcessorConfig::default().with_forwarding(true));
        processor.load_example_program(sample_program()?);
        let program = sample_program()?;
        let i = |n: usize| Some(program[n - 1]);

        let expected = [
            [i(1), None, None, None, None],
            [i(2), i(1), None, None, None],
            [i(3), i(2), i(1), None, None],
            [i(3), i(2), None, i(1), None],
            [i(4), i(3), i(2), None, i(1)],
            [i(4), i(3), None, i(2), None],
            [i(5), i(4), i(3), None, i(2)],
            [None, i(5), i(4), i(3), None],
            [None, None, i(5), i(4), i(3)],
            [None, None, None, i(5), i(4)],
            [None, None, None, None, i(5)],
            [None, None, None, None, None],
        ];
        let stalls = [false, false, false, true, false, true, false, false, false, false, false, false];

        for (cycle, (row, stalled)) in expected.iter().zip(stalls).enumerate() {
            let report = processor.step_forward();
            assert_eq!(report.stall, stalled, "cycle {}", cycle + 1);
            assert_eq!(
                &StageName::ALL.map(|stage| processor.stage(stage)),
                row,
                "cycle {}",
                cycle + 1
            );
        }
        assert!(processor.is_done());

        // and all the way back again
        while processor.step_backward() {}
        assert_eq!(processor.cycle(), 0);
        assert!(processor.slots().is_empty());
        Ok(())
    }

    #[test]
    fn test_hazard_report_reexports() {
        let report = HazardReport::default();
        assert!(!report.hazard);
        assert_eq!(Forward::default(), Forward::None);
        assert_eq!(
            HazardCause::new(StageName::Decode, RegisterRole::Source1).role,
            RegisterRole::Source1
        );
    }
}
