use clap::Parser;
use clap::error::ErrorKind;
use edgegate::backend::odbc::OdbcDriver;
use edgegate::cli::{self, Cli};
use edgegate::error::GatewayError;
use edgegate::gateway::Gateway;
use edgegate::output::{self, Envelope};
use edgegate::{config, verbose};

#[tokio::main]
async fn main() {
    // Load .env file (optional, ignore if missing)
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            output::print_envelope(&cli::usage_envelope(&err));
            return;
        }
    };

    // Every outcome is reported in the envelope; the exit status is always 0.
    let envelope = run(cli).await;
    output::print_envelope(&envelope);
}

async fn run(cli: Cli) -> Envelope {
    let app_config = match config::load(
        cli.verbose,
        cli.show_secrets,
        cli.driver.as_deref(),
        cli.config.as_ref(),
    ) {
        Ok(c) => c,
        Err(e) => return Envelope::failure(&e),
    };

    let (params, action) = match cli.command.request(&app_config) {
        Ok(r) => r,
        Err(e) => return Envelope::failure(&e),
    };

    verbose::emit(
        app_config.verbose,
        &format!("action: {:?}, driver: {}", action, app_config.driver_name),
    );

    // odbc-api connections are not Send, so the whole operation runs in spawn_blocking
    let driver = OdbcDriver::new(app_config.driver_name.clone());
    let gateway = Gateway::new(driver, app_config);
    tokio::task::spawn_blocking(move || gateway.run(&params, &action))
        .await
        .unwrap_or_else(|e| {
            Envelope::failure(&GatewayError::Internal {
                message: format!("task join error: {}", e),
            })
        })
}
