use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_catalog::Status;
use folio_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Catalog record manager")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C
    Serve {
        /// Override `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Load the layered configuration and print what it resolved to
    CheckConfig,
    /// Print which status changes are allowed
    Transitions,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port } => {
            let mut settings = load_settings()?;
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            folio_telemetry::init(&settings.telemetry)?;

            tracing::info!(
                env = ?settings.environment,
                host = %settings.server.host,
                port = settings.server.port,
                "folio serve starting"
            );

            tokio::runtime::Runtime::new()
                .context("failed to start async runtime")?
                .block_on(folio_app::bootstrap::run(settings))
        }
        Command::CheckConfig => {
            let settings = load_settings()?;
            println!("environment       {:?}", settings.environment);
            println!(
                "server            {}:{} (timeout {}ms)",
                settings.server.host, settings.server.port, settings.server.request_timeout_ms
            );
            println!("storage timeout   {}ms", settings.storage.timeout_ms);
            println!(
                "listing defaults  sort_by={} page_size={}",
                settings.catalog.default_sort, settings.catalog.default_page_size
            );
            println!(
                "logging           {:?} ({})",
                settings.telemetry.log_format, settings.telemetry.filter
            );
            Ok(())
        }
        Command::Transitions => {
            print!("{}", transition_table());
            Ok(())
        }
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().with_context(|| "failed to load Folio settings")
}

fn transition_table() -> String {
    let mut out = String::new();
    for requested in Status::ALL {
        let from: Vec<&str> = requested.allowed_from().iter().map(|s| s.as_str()).collect();
        out.push_str(&format!("{:<10} <- {}\n", requested.as_str(), from.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn table_lists_every_target_state() {
        let table = transition_table();
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("on_shelf   <- returned, damaged"));
        assert!(table.contains("borrowed   <- on_shelf"));
    }
}
