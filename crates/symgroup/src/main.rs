use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use symgroup_core::engine::simulated::Scenario;
use symgroup_core::events::{event_channel, EventQueue};
use symgroup_core::Session;
use symgroup_protocol::{parse_iname_list, AssignEncoding, DumpRequest, FormatMap, Response};
use symgroup_utils::{
    info, init_logging_for_extension, init_logging_with_level, LogLevel, LoggingGuard, Settings,
};

/// Replay a simulated debuggee through the symbol-group dumpers.
#[derive(Parser, Debug)]
#[command(name = "symgroup")]
#[command(version)]
#[command(about = "Dump the variables of a simulated debuggee as protocol lines", long_about = None)]
struct Cli
{
    /// Scenario file describing the debuggee (types, memory, frames)
    scenario: PathBuf,
    /// Settings file (`[dump]` and `[logging]` sections)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level, overriding the settings file
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log only to the configured log file, keeping stderr clean
    #[arg(long, global = true)]
    file_log_only: bool,
    /// Token echoed in the response lines
    #[arg(long, global = true, default_value_t = 1)]
    token: u32,
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that dumps a tree.
#[derive(Args, Debug)]
struct DumpArgs
{
    /// Stack frame index
    #[arg(long, default_value_t = 0)]
    frame: u32,
    /// Thread id (defaults to the scenario's current thread)
    #[arg(long)]
    thread: Option<u64>,
    /// Comma separated inames shown expanded
    #[arg(long, default_value = "")]
    expanded: String,
    /// Comma separated inames of uninitialized variables
    #[arg(long, default_value = "")]
    uninitialized: String,
    /// Display formats, `key:code,key:code`
    #[arg(long, default_value = "")]
    formats: String,
    /// Dump only this subtree
    #[arg(long)]
    partial: Option<String>,
}

impl DumpArgs
{
    fn to_request(&self) -> Result<DumpRequest, Box<dyn Error>>
    {
        Ok(DumpRequest {
            thread: self.thread,
            frame: self.frame,
            expanded: parse_iname_list(&self.expanded),
            uninitialized: parse_iname_list(&self.uninitialized),
            formats: FormatMap::parse(&self.formats)?,
            partial: self.partial.clone(),
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Dump the locals of a frame
    Locals
    {
        #[command(flatten)]
        dump: DumpArgs,
    },
    /// Dump the scenario's watches plus the given expressions
    Watches
    {
        /// Extra watch expressions, numbered after the scenario's watches
        #[arg(long = "watch")]
        watches: Vec<String>,
        #[command(flatten)]
        dump: DumpArgs,
    },
    /// Assign a value to a node and dump its scope
    Assign
    {
        /// Iname of the node, e.g. `local.x`
        path: String,
        /// New value
        value: String,
        /// Value encoding: 0 plain, 1 hex bytes, 2 hex UTF-16
        #[arg(long, default_value_t = 0)]
        encoding: u32,
        #[command(flatten)]
        dump: DumpArgs,
    },
    /// Reinterpret an unexpanded node as another type
    Typecast
    {
        /// Iname of the node
        path: String,
        /// New type name
        type_name: String,
        #[command(flatten)]
        dump: DumpArgs,
    },
    /// Expand inames and dump the locals afterwards
    Expand
    {
        /// Comma separated inames
        paths: String,
        #[command(flatten)]
        dump: DumpArgs,
    },
}

fn main()
{
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(settings: &Settings, level: Option<LogLevel>, file_only: bool)
    -> Result<LoggingGuard, Box<dyn Error>>
{
    let level = level.unwrap_or(settings.logging.level);
    if file_only {
        let file = settings
            .logging
            .file
            .as_deref()
            .ok_or("--file-log-only needs a log file (`[logging] file` or SYMGROUP_LOG_FILE)")?;
        return Ok(init_logging_for_extension(level, file)?);
    }
    Ok(init_logging_with_level(
        level,
        settings.logging.format,
        settings.logging.file.as_deref(),
    )?)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>>
{
    let settings = Settings::load(cli.config.as_deref())?;
    let _guard = init_logging(&settings, cli.log_level, cli.file_log_only)?;

    let scenario = Scenario::from_file(&cli.scenario)?;
    let mut process = scenario.build()?;
    let (sender, receiver) = event_channel();
    process.set_event_sender(sender);
    let target = process.into_target();
    info!("Loaded scenario {}", cli.scenario.display());
    let mut session = Session::new(Box::new(target), EventQueue::new(receiver), settings.dump);

    let token = cli.token;
    match cli.command {
        Commands::Locals { dump } => {
            let response = session.locals(token, &dump.to_request()?);
            print_response(&session, &response);
        }
        Commands::Watches { watches, dump } => {
            let mut list: Vec<(String, String)> = scenario
                .watches
                .iter()
                .map(|w| (w.iname.clone(), w.expression.clone()))
                .collect();
            let first = list.len();
            list.extend(
                watches
                    .into_iter()
                    .enumerate()
                    .map(|(i, expression)| (format!("watch.{}", first + i), expression)),
            );
            let response = session.watches(token, &list, &dump.to_request()?);
            print_response(&session, &response);
        }
        Commands::Assign {
            path,
            value,
            encoding,
            dump,
        } => {
            let encoding = AssignEncoding::from_code(encoding)?;
            let response = session.assign(token, &path, encoding, &value, &dump.to_request()?);
            print_response(&session, &response);
        }
        Commands::Typecast { path, type_name, dump } => {
            let response = session.type_cast(token, &path, &type_name, &dump.to_request()?);
            print_response(&session, &response);
        }
        Commands::Expand { paths, dump } => {
            let request = dump.to_request()?;
            let response = session.expand(token, &parse_iname_list(&paths), &request);
            print_response(&session, &response);
            let response = session.locals(token + 1, &request);
            print_response(&session, &response);
        }
    }
    Ok(())
}

fn print_response(session: &Session, response: &Response)
{
    for line in session.lines(response) {
        println!("{line}");
    }
}
