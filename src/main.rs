use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use clap::Parser;
use lslcc::{
    compile_source,
    compiler::settings::CompilerSettings,
    display_diagnostic,
    errors::errors::{CompilerError, Diagnostic},
    library::library::{parse_subsets, LibraryData, DEFAULT_LIBRARY, DEFAULT_SUBSET},
};

#[derive(Parser)]
#[command(name = "lslcc")]
#[command(author, version, about = "LSL to OpenSim C# compiler", long_about = None)]
struct Cli {
    /// Script to compile
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the generated code, standard output when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with code generator settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Library descriptor XML used instead of the bundled one
    #[arg(long)]
    library: Option<PathBuf>,

    /// Comma separated library subsets to enable
    #[arg(long)]
    subsets: Option<String>,

    /// Name of the generated class
    #[arg(long)]
    class_name: Option<String>,

    /// Namespace around the generated class
    #[arg(long)]
    namespace: Option<String>,

    /// Leave out the class wrapper, as the OpenSim runtime expects
    #[arg(long)]
    no_class: bool,

    /// Treat keys as strings in the generated code
    #[arg(long)]
    keys_are_strings: bool,

    /// Insert co-op termination calls
    #[arg(long)]
    coop: bool,

    /// Log more, repeat for trace output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Why a run stopped.
enum Failure {
    /// The script has errors, already printed.
    Diagnostics,
    Compiler(CompilerError),
}

impl From<CompilerError> for Failure {
    fn from(error: CompilerError) -> Self {
        Failure::Compiler(error)
    }
}

impl From<io::Error> for Failure {
    fn from(error: io::Error) -> Self {
        Failure::Compiler(CompilerError::Io(error))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Diagnostics) => ExitCode::from(1),
        Err(Failure::Compiler(error)) => {
            eprintln!("Error: {}", error);
            ExitCode::from(2)
        }
    }
}

fn load_settings(cli: &Cli) -> Result<CompilerSettings, CompilerError> {
    let mut settings = match &cli.settings {
        Some(path) => CompilerSettings::from_json_file(path)?,
        None => CompilerSettings::default(),
    };

    if cli.no_class {
        settings.generate_class = false;
    }
    if cli.keys_are_strings {
        settings.keys_are_strings = true;
    }
    if cli.coop {
        settings.insert_coop_termination_calls = true;
    }
    if let Some(name) = &cli.class_name {
        settings.generated_class_name = Some(name.clone());
    }
    if let Some(namespace) = &cli.namespace {
        settings.generated_class_namespace = Some(namespace.clone());
    }

    settings.validate()?;
    Ok(settings)
}

fn load_library(cli: &Cli) -> Result<LibraryData, CompilerError> {
    let subsets = match &cli.subsets {
        Some(text) => parse_subsets(text)?,
        None => vec![DEFAULT_SUBSET.to_string()],
    };
    let subsets: Vec<&str> = subsets.iter().map(String::as_str).collect();

    match &cli.library {
        Some(path) => LibraryData::from_xml_file(path, &subsets),
        None => LibraryData::from_xml_str(DEFAULT_LIBRARY, &subsets),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let start = Instant::now();

    let settings = load_settings(cli)?;
    let library = load_library(cli)?;
    let source = fs::read_to_string(&cli.input)?;
    log::info!("read {} in {:?}", cli.input.display(), start.elapsed());

    let mut diagnostics: Vec<Diagnostic> = vec![];
    let mut generated = vec![];
    let ast = compile_source(&source, &library, &settings, &mut diagnostics, &mut generated)?;

    let name = file_name(&cli.input);
    for diagnostic in &diagnostics {
        eprint!("{}", display_diagnostic(diagnostic, &source, &name));
    }

    if ast.has_errors() {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        eprintln!("{}: {} error(s), no code generated", name, errors);
        return Err(Failure::Diagnostics);
    }

    match &cli.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(&generated)?;
            writer.flush()?;
            log::info!("wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(&generated)?;
            lock.flush()?;
        }
    }

    log::info!("compiled {} in {:?}", name, start.elapsed());
    Ok(())
}
