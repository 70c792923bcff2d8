//! winrm-exec binary entry point.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::error;
use winrm_exec::app::{announce, arm_deadline, cancel_on_interrupt};
use winrm_exec::cli::{parse_args, print_version, usage};
use winrm_exec::error::EXIT_USAGE;
use winrm_exec::transport::UnlinkedTransport;
use winrm_exec::{logging, App, Config};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", usage());
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if args.help {
        println!("{}", usage());
        return ExitCode::SUCCESS;
    }

    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    // Load configuration (CLI > env > file > defaults)
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let logger = logging::build(Some(config.log_filter()));

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone(), logger.clone());
    let deadline = config
        .deadline()
        .map(|after| arm_deadline(cancel.clone(), after, logger.clone()));

    if let Ok(invocation) = config.to_invocation() {
        announce(&logger, &invocation);
    }

    let app = App::new(Arc::new(UnlinkedTransport), logger.clone());
    let outcome = app.run(&config, &cancel).await;

    // Stop the signal and deadline tasks.
    cancel.cancel();
    if let Err(e) = interrupt.await {
        logger.in_scope(|| error!("Interrupt listener failed: {}", e));
    }
    if let Some(deadline) = deadline {
        if let Err(e) = deadline.await {
            logger.in_scope(|| error!("Deadline timer failed: {}", e));
        }
    }

    if outcome.show_usage {
        eprintln!("{}", usage());
    }

    if let Some(rendered) = outcome.rendered() {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(&rendered).and_then(|()| stdout.flush()) {
            logger.in_scope(|| error!("Failed to write command output: {}", e));
        }
    }

    ExitCode::from(outcome.exit_code)
}
