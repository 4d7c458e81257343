#[macro_use]
extern crate clap;

use clap::{Arg, ArgGroup};
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use picovm::{interrupt, ExitCode, Processor, RuntimeError, StdStreams};

#[derive(Debug)]
enum Error {
    Io(std::io::Error, PathBuf),
    Assemble(picoasm::Error),
    Runtime(RuntimeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, path) => write!(f, "\"{}\": {}", path.display(), err),
            Error::Assemble(err) => write!(f, "{}", err),
            Error::Runtime(err) => write!(f, "{}", err),
        }
    }
}

/// Run configuration built once from `clap` and passed by value into either
/// the assembler or the VM entry point. Mirrors `struct vm_config` from the
/// original C sources, as a typed struct rather than global mutable statics.
struct Config {
    assemble: bool,
    input: PathBuf,
    output: Option<PathBuf>,
    step_sleep_ms: u64,
    step_trace: bool,
    dump_registers: bool,
    dump_memory: bool,
}

fn parse_args() -> Config {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("assembler")
                .short("a")
                .long("assemble")
                .help("Assembles INPUT into a ROM image instead of running it"),
        )
        .arg(
            Arg::with_name("vm")
                .short("v")
                .long("run")
                .help("Runs INPUT as a ROM image"),
        )
        .group(ArgGroup::with_name("mode").args(&["assembler", "vm"]).required(true))
        .arg(
            Arg::with_name("input")
                .short("f")
                .long("file")
                .takes_value(true)
                .value_name("INPUT")
                .required(true)
                .help("Sets the input file (assembly source or ROM image)"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output ROM file to write when assembling"),
        )
        .arg(
            Arg::with_name("sleep")
                .short("s")
                .long("sleep")
                .takes_value(true)
                .value_name("MS")
                .default_value("0")
                .help("Per-step sleep budget in milliseconds"),
        )
        .arg(
            Arg::with_name("step_trace")
                .short("S")
                .long("trace")
                .help("Logs each fetch-decode-execute step at debug level"),
        )
        .arg(
            Arg::with_name("dump_registers")
                .short("d")
                .long("dump-registers")
                .help("Prints the register file after the run"),
        )
        .arg(
            Arg::with_name("dump_memory")
                .short("D")
                .long("dump-memory")
                .help("Prints the full memory contents after the run"),
        )
        .get_matches();

    let step_sleep_ms = value_t!(matches.value_of("sleep"), u64).unwrap_or_else(|err| err.exit());

    Config {
        assemble: matches.is_present("assembler"),
        input: PathBuf::from(matches.value_of("input").unwrap()),
        output: matches.value_of("output").map(PathBuf::from),
        step_sleep_ms,
        step_trace: matches.is_present("step_trace"),
        dump_registers: matches.is_present("dump_registers"),
        dump_memory: matches.is_present("dump_memory"),
    }
}

fn read_to_string(path: &Path) -> Result<String, Error> {
    let mut buf = String::new();
    BufReader::new(File::open(path).map_err(|err| Error::Io(err, path.to_owned()))?)
        .read_to_string(&mut buf)
        .map_err(|err| Error::Io(err, path.to_owned()))?;
    Ok(buf)
}

fn read_rom(path: &Path) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    BufReader::new(File::open(path).map_err(|err| Error::Io(err, path.to_owned()))?)
        .read_to_end(&mut buf)
        .map_err(|err| Error::Io(err, path.to_owned()))?;
    Ok(buf)
}

fn run_assembler(config: &Config) -> Result<(), Error> {
    let source = read_to_string(&config.input)?;
    let rom = picoasm::assemble(&source).map_err(Error::Assemble)?;

    let output_path = config
        .output
        .clone()
        .unwrap_or_else(|| config.input.with_extension("rom"));
    let mut file = File::create(&output_path).map_err(|err| Error::Io(err, output_path.clone()))?;
    file.write_all(&rom).map_err(|err| Error::Io(err, output_path))?;
    Ok(())
}

fn run_vm(config: &Config) -> Result<(), Error> {
    let rom = read_rom(&config.input)?;

    let handle = interrupt::spawn_fifo_producer(interrupt::DEFAULT_FIFO_PATH);
    let mut processor = Processor::new(handle, config.step_sleep_ms);
    processor.load_rom(&rom).map_err(Error::Runtime)?;

    let mut streams = StdStreams;
    let exit = processor.run(&mut streams).map_err(Error::Runtime)?;
    match exit {
        ExitCode::Halted => println!("halted"),
    }

    if config.dump_registers {
        println!("registers: {:?}", processor.registers());
        println!("flags: {:#04x}", processor.flags());
    }
    if config.dump_memory {
        for (addr, byte) in processor.memory().data().iter().enumerate() {
            if *byte != 0 {
                println!("{:#06x}: {:#04x}", addr, byte);
            }
        }
    }

    Ok(())
}

fn main() {
    let config = parse_args();

    let mut builder = env_logger::Builder::from_default_env();
    if config.step_trace {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let result = if config.assemble {
        run_assembler(&config)
    } else {
        run_vm(&config)
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(1);
    }
}
