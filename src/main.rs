use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use pipeline_hazard_sim::{
    config::ProcessorConfig,
    instruction::{parse_program, Instruction, Operation},
    processor::Processor,
    registers::Register,
    stages::Topology,
    Forward, HazardReport, RegisterRole,
};
use strum::VariantNames;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pipeline-sim",
    version,
    about = "Step a five stage pipeline forwards and backwards and watch for data hazards"
)]
struct Cli {
    /// Forward results from the Memory stage instead of stalling on them.
    #[arg(long)]
    forwarding: bool,

    /// Treat an instruction in Writeback as still producing its result.
    #[arg(long)]
    writeback_hazards: bool,

    /// Start with the built-in example program loaded.
    #[arg(long, conflicts_with = "program")]
    example: bool,

    /// Load a program from a file, one instruction per line.
    #[arg(short, long)]
    program: Option<String>,
}

/// one line of user input
enum Command {
    Add(Instruction),
    Example,
    Clear,
    Step,
    Back,
    Reset,
    Forwarding(bool),
    Run,
    Show,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        Ok(match (word.to_ascii_lowercase().as_str(), rest.trim()) {
            ("add", instruction) => Command::Add(instruction.parse()?),
            ("example", "") => Command::Example,
            ("clear", "") => Command::Clear,
            ("step" | "s", "") => Command::Step,
            ("back" | "b", "") => Command::Back,
            ("reset", "") => Command::Reset,
            ("forwarding", "on") => Command::Forwarding(true),
            ("forwarding", "off") => Command::Forwarding(false),
            ("run", "") => Command::Run,
            ("show" | "", "") => Command::Show,
            ("help" | "?", "") => Command::Help,
            ("quit" | "q" | "exit", "") => Command::Quit,
            _ => bail!("Unrecognized command {line:?}, try `help`"),
        })
    }
}

fn print_help() {
    println!("commands:");
    println!("  add <instruction>   append e.g. `add SUB R4, R1, R5`");
    println!("  example             replace the program with the example program");
    println!("  clear               remove every instruction");
    println!("  step | s            advance one cycle");
    println!("  back | b            undo the last cycle");
    println!("  reset               return to cycle 0, keeping the program");
    println!("  forwarding on|off   toggle forwarding from the Memory stage");
    println!("  run                 step until the pipeline drains");
    println!("  show                print the pipeline");
    println!("  quit");
    println!("operations: {}", Operation::VARIANTS.join(" "));
    println!("registers:  {}", Register::choices().join(" "));
}

fn describe(report: &HazardReport) -> String {
    if !report.hazard {
        return "none".to_string();
    }
    let causes: Vec<String> = report
        .causes
        .iter()
        .map(|cause| {
            let role = match cause.role {
                RegisterRole::Destination => "destination",
                RegisterRole::Source1 => "source 1",
                RegisterRole::Source2 => "source 2",
            };
            format!("{} {role}", cause.stage)
        })
        .collect();
    format!("stall ({})", causes.join(", "))
}

fn print_state(processor: &Processor) {
    println!(
        "cycle {} | fetched {}/{} | forwarding {}",
        processor.cycle(),
        processor.cursor(),
        processor.program().len(),
        if processor.forwarding_enabled() { "on" } else { "off" }
    );
    let report = processor.hazard_details();
    let (forward_1, forward_2) = processor.forwarding_details();
    for (stage, held) in processor.slots().iter() {
        let contents = held.map_or_else(|| "-".to_string(), |instruction| instruction.to_string());
        let marker = if report.involves(stage) { " *" } else { "" };
        println!("  {:<4}{contents}{marker}", stage.abbreviation());
    }
    println!("  hazard: {}", describe(&report));
    if (forward_1, forward_2) != (Forward::None, Forward::None) {
        println!("  forwarded from MEM: source 1 {forward_1:?}, source 2 {forward_2:?}");
    }
}

fn print_program(processor: &Processor) {
    for (index, instruction) in processor.program().iter().enumerate() {
        println!("  I{} {instruction}", index + 1);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let topology = if cli.writeback_hazards {
        Topology::writeback_inclusive()
    } else {
        Topology::reference()
    };
    let mut processor = Processor::with_config(
        ProcessorConfig::default()
            .with_forwarding(cli.forwarding)
            .with_topology(topology),
    );

    if let Some(path) = &cli.program {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        processor.load_example_program(parse_program(&text)?);
    } else if cli.example {
        processor.load_example_program(Processor::example_program());
    }

    print_program(&processor);
    print_state(&processor);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(error) => {
                println!("error: {error:#}");
                continue;
            }
        };

        match command {
            Command::Add(instruction) => {
                processor.load_instruction(instruction);
                print_program(&processor);
            }
            Command::Example => {
                processor.load_example_program(Processor::example_program());
                print_program(&processor);
            }
            Command::Clear => processor.clear_program(),
            Command::Step => {
                let _ = processor.step_forward();
            }
            Command::Back => {
                if !processor.step_backward() {
                    println!("already at cycle 0");
                }
            }
            Command::Reset => processor.reset(),
            Command::Forwarding(enabled) => processor.set_forwarding_enabled(enabled),
            Command::Run => {
                let cycles = processor.run();
                println!("ran {cycles} cycles");
            }
            Command::Show => (),
            Command::Help => {
                print_help();
                continue;
            }
            Command::Quit => break,
        }
        print_state(&processor);
    }

    Ok(())
}
