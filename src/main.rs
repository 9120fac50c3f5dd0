//! evmjit - compile EVM bytecode and run it against an in-memory host
use std::path::PathBuf;
use std::process;

use clap::Parser;
use ethereum_types::U256;
use tracing::Level;

use evmjit::bytecode::Chunk;
use evmjit::config::{EnvDispatch, JitConfig};
use evmjit::host::MemoryHost;
use evmjit::jit::JitCompiler;

#[derive(Parser)]
#[command(version, about = "JIT-compile EVM bytecode and execute it")]
struct Cli {
    /// Bytecode as hex, with or without a 0x prefix
    code: String,

    /// Call data as hex
    #[arg(long, default_value = "")]
    call_data: String,

    /// Initial storage entry, `key=value` (decimal or 0x-prefixed hex)
    #[arg(long = "storage", value_parser = parse_storage_entry)]
    storage: Vec<(U256, U256)>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the dedicated storage, balance and block-hash entry points
    #[arg(long)]
    dedicated: bool,

    /// VM memory size in bytes
    #[arg(long, default_value_t = 4096)]
    memory: usize,

    #[arg(long, default_value_t = 1_000_000)]
    gas: i64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_word(text: &str) -> Result<U256, String> {
    let text = text.trim();
    match text.strip_prefix("0x") {
        Some(digits) => U256::from_str_radix(digits, 16).map_err(|e| e.to_string()),
        None => U256::from_dec_str(text).map_err(|e| e.to_string()),
    }
}

fn parse_storage_entry(text: &str) -> Result<(U256, U256), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("Expected key=value, got '{}'", text))?;
    Ok((parse_word(key)?, parse_word(value)?))
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => JitConfig::load_from_path(path).map_err(|e| e.to_string())?,
        None => JitConfig::default(),
    };
    if cli.dedicated {
        config.dispatch = EnvDispatch::Dedicated;
    }

    let chunk = Chunk::from_hex(&cli.code).map_err(|e| format!("Invalid bytecode: {}", e))?;
    let call_data = hex::decode(cli.call_data.trim_start_matches("0x"))
        .map_err(|e| format!("Invalid call data: {}", e))?;

    let mut compiler = JitCompiler::with_config(config).map_err(|e| e.to_string())?;
    let compiled = compiler.compile(&chunk).map_err(|e| e.to_string())?;

    let mut host = MemoryHost::default();
    host.storage.extend(cli.storage);
    let mut memory = vec![0u8; cli.memory];

    // SAFETY: the compiler outlives the execution and registered the host
    // entry points; memory accesses are bounded by the caller-chosen size.
    let result = unsafe { compiled.execute(&mut host, &call_data, &mut memory, cli.gas) };

    println!("Stack ({} words):", result.stack.len());
    for (i, word) in result.stack.iter().enumerate().rev() {
        println!("  [{}] {:#066x}", i, word);
    }
    println!("Gas: {}", result.gas);

    if !host.logs.is_empty() {
        println!("Logs:");
        for log in &host.logs {
            let topics: Vec<String> = log.topics.iter().map(|t| format!("{:#x}", t)).collect();
            println!("  topics=[{}] data=0x{}", topics.join(", "), hex::encode(&log.data));
        }
    }

    let mut storage: Vec<_> = host.storage.iter().collect();
    storage.sort();
    if !storage.is_empty() {
        println!("Storage:");
        for (key, value) in storage {
            println!("  {:#x} = {:#x}", key, value);
        }
    }

    for call in &host.calls {
        println!("Call: {:?} to {:#x} ({} bytes in)", call.kind, call.address, call.input.len());
    }
    for create in &host.creates {
        println!("Create: {:#x} ({} bytes init code)", create.address, create.init_code.len());
    }
    for beneficiary in &host.selfdestructs {
        println!("Selfdestruct: beneficiary {:#x}", beneficiary);
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
