use anyhow::Context;
use clap::Parser;
use grblstream::{
    init_logging, Config, ControllerListener, GrblController, LoopbackTransport, BUILD_DATE,
    VERSION,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Banner fed to the controller in place of a real device boot
const LOOPBACK_BANNER: &str = "Grbl 1.1h ['$' for help]";

#[derive(Parser, Debug)]
#[command(author, version, about = "Dry-run a g-code file through the GRBL streaming controller.", long_about = None)]
struct Args {
    /// The g-code file to stream.
    #[arg()]
    file: PathBuf,

    /// Replace every F word with this feed rate.
    #[arg(long)]
    speed_override: Option<i32>,

    /// Config file (.toml or .json); defaults to the platform config directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Prints console messages and remembers how the job ended
struct ConsolePrinter {
    verbose: bool,
    outcome: Mutex<Option<bool>>,
}

impl ControllerListener for ConsolePrinter {
    fn message_for_console(&self, message: &str, verbose: bool) {
        if !verbose || self.verbose {
            println!("{}", message);
        }
    }

    fn command_comment(&self, comment: &str) {
        if self.verbose {
            println!("({})", comment);
        }
    }

    fn stream_complete(&self, _filename: Option<&str>, success: bool) {
        *self.outcome.lock() = Some(success);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;
    info!(version = VERSION, build_date = BUILD_DATE, "grblstream starting");

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()?)?,
    };
    if let Some(speed) = args.speed_override {
        config.streaming.speed_override = speed;
        config.validate()?;
    }

    let transport = LoopbackTransport::new();
    let device = transport.handle();
    let controller = GrblController::new(Box::new(transport));
    config.streaming.apply(&controller);

    let printer = Arc::new(ConsolePrinter {
        verbose: config.streaming.verbose_console,
        outcome: Mutex::new(None),
    });
    controller.add_listener(printer.clone());

    controller.open_comm_port(&config.connection.port, config.connection.baud_rate)?;
    device.reply(&controller, LOOPBACK_BANNER);
    controller.is_ready_to_stream_file()?;

    let rows = controller
        .append_gcode_file(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    info!(rows, file = %args.file.display(), "Loaded g-code file");

    controller.begin_streaming()?;
    while device.pump(&controller) > 0 {}

    device.reply(&controller, "<Idle|MPos:0.000,0.000,0.000|FS:0,0>");
    controller.close_comm_port();

    let duration = controller
        .send_duration()
        .map(|d| d.num_milliseconds())
        .unwrap_or_default();
    println!();
    println!("Rows sent:    {}/{}", controller.rows_sent(), controller.rows_in_send());
    println!("Skipped:      {}", controller.skipped_count());
    println!("Errors:       {}", controller.queue_sizes().errored);
    println!("Duration:     {} ms", duration);
    if let Some(status) = controller.last_status() {
        println!("Final status: {}", status);
    }

    let outcome = *printer.outcome.lock();
    match outcome {
        Some(true) => Ok(()),
        Some(false) => anyhow::bail!("stream did not complete successfully"),
        None => anyhow::bail!("stream still has {} rows outstanding", controller.rows_remaining()),
    }
}
