//! Process entry point: parses CLI flags, wires up logging, and drives
//! the stdio message loop until the client sends `exit`.

use clap::Parser;
use dls_lsp_framework::{events::EventBus, OutboundMessage, ServerHandle};
use dls_worker::Scheduler;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "dls-server", about = "Language server for the D programming language")]
struct Cli {
    /// Tracing filter directive, e.g. "info" or "dls_lsp_framework=debug".
    #[arg(long, default_value = "info", env = "DLS_LOG")]
    log: String,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::new(cli.log))
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build the current-thread runtime");

    let local = tokio::task::LocalSet::new();
    let exit_code = local.block_on(&runtime, run());

    std::process::exit(exit_code);
}

async fn run() -> i32 {
    let scheduler = Scheduler::new();
    let (events, _bus) = EventBus::start(256);
    let server = ServerHandle::new(scheduler, events);

    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let (outbound, mut inbound_replies) = mpsc::unbounded_channel::<OutboundMessage>();

    loop {
        if server.lifecycle().borrow().state() == dls_lsp_framework::LifecycleState::Exited {
            break;
        }

        // Reading the next frame and writing a reply that just became
        // available race each other: a request spawned several frames
        // back may finish between one read and the next, and its reply
        // must go out before this loop blocks on `read_frame` again.
        tokio::select! {
            biased;

            reply = inbound_replies.recv() => {
                let Some(reply) = reply else { continue };
                if let Err(err) = dls_lsp_framework::write_message(&mut output, reply).await {
                    tracing::error!(%err, "failed to write message");
                    break;
                }
                if output.flush().await.is_err() {
                    break;
                }
            }

            outcome = dls_lsp_framework::process_one(&server, &mut input, &outbound) => {
                match outcome {
                    Ok(()) => {}
                    Err(dls_rpc::TransportError::UnexpectedEof) => {
                        tracing::info!("client closed the connection");
                        break;
                    }
                    Err(err) => {
                        tracing::error!(%err, "transport error, shutting down");
                        break;
                    }
                }
            }
        }
    }

    server.scheduler().shutdown().await;

    // Every in-flight task has now resolved (or been cancelled) and sent
    // its reply; drain what's left of the channel before reporting the
    // exit code.
    while let Ok(reply) = inbound_replies.try_recv() {
        if dls_lsp_framework::write_message(&mut output, reply).await.is_err() {
            break;
        }
        let _ = output.flush().await;
    }

    server.lifecycle().borrow().exit_code()
}
