use std::time::Duration;

use argh::FromArgs;
use tracing::error;
use tracing_subscriber::EnvFilter;

use remna_sd::app::Application;
use remna_sd::config::Config;
use remna_sd::shutdown::ShutdownSignal;
use remna_sd::signal;

/// Generates Prometheus file-based service discovery targets from the
/// Remnawave API. Configuration is read from the environment.
#[derive(FromArgs)]
struct RootCommand {
    /// print version information and exit
    #[argh(switch, short = 'v')]
    version: bool,

    /// log level, e.g. error, warn, info or debug
    #[argh(option, default = "String::from(\"info\")")]
    log_level: String,
}

fn main() {
    let opts: RootCommand = argh::from_env();

    if opts.version {
        println!("remna-sd {}", remna_sd::get_version());
        return;
    }

    let filter = EnvFilter::try_from_env("REMNA_SD_LOG")
        .unwrap_or_else(|_err| EnvFilter::new(&opts.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(message = "configuration error", %err);
            std::process::exit(exitcode::CONFIG);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("remna-sd-worker")
        .enable_io()
        .enable_time()
        .build()
        .expect("build tokio runtime");

    let code = runtime.block_on(async move {
        let app = match Application::new(&config) {
            Ok(app) => app,
            Err(err) => {
                error!(message = "initialization failed", %err);
                return exitcode::CONFIG;
            }
        };

        let (trigger, shutdown) = ShutdownSignal::new();
        signal::watch(trigger);

        app.run(shutdown).await;

        exitcode::OK
    });

    runtime.shutdown_timeout(Duration::from_secs(5));

    std::process::exit(code);
}
