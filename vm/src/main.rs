use clap::Parser;
use hawkbeans_runtime::{JvmError, VmConfig};
use tracing_log::log::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "The Hawkbeans Java Virtual Machine")]
pub struct Args {
    #[arg(
        short = 'H',
        long = "heap-size",
        default_value_t = 1,
        help = "Set the heap size (in MB)"
    )]
    pub heap_size: usize,
    #[arg(short = 't', long = "trace-gc", help = "Trace the garbage collector")]
    pub trace_gc: bool,
    #[arg(
        short = 'c',
        long = "gc-interval",
        default_value_t = 0,
        help = "GC collection interval in ms (0 uses the default)"
    )]
    pub gc_interval: u64,
    #[arg(
        long = "classpath",
        visible_alias = "cp",
        value_delimiter = ':',
        help = "Classpath directories; use ':' as separator"
    )]
    pub class_path: Vec<String>,
    #[arg(help = "Main class to run (e.g. com/example/Main for com/example/Main.class)")]
    pub class: String,
    #[arg(
        trailing_var_arg = true,
        help = "Arguments passed to the Java main method"
    )]
    pub args: Vec<String>,
}

fn create_vm_configuration(mut args: Args) -> VmConfig {
    if args.class_path.is_empty() {
        let current_dir = std::env::current_dir()
            .map(|d| d.to_string_lossy().to_string())
            .unwrap_or_else(|_| ".".to_string());
        args.class_path.push(current_dir);
    }
    let main_class = args.class.replace('.', "/");
    let mut config = VmConfig::new(main_class, args.class_path);
    config.heap_size_mb = args.heap_size;
    config.trace_gc = args.trace_gc;
    config.gc_interval_ms = args.gc_interval;
    config.main_args = args.args;
    config
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    debug!("Provided command line arguments: {:?}", args);

    let config = create_vm_configuration(args);
    if let Err(e) = hawkbeans_runtime::start(config) {
        // An uncaught Java exception was already reported by the runtime.
        if !matches!(e, JvmError::JavaExceptionThrown(_)) {
            eprintln!("{}", e);
        }
        std::process::exit(1);
    }
}
