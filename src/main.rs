mod cli;

use clap::Parser;
use cli::{Cli, Commands, RequestArgs};
use mobilecore::config::Config;
use mobilecore::fraud::{AntiFraudHeaders, DEFAULT_CONNECTION_METHOD, StaticFraudPrevention};
use mobilecore::network::{
    Dependencies, NetworkService, NetworkSettings, TracingAnalyticsDelegate, TracingAuditDelegate,
};
use mobilecore::observability;
use mobilecore::spinner::LoggingSpinner;
use mobilecore::transport::HttpTransport;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<ExitCode, BoxError> {
    observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Request(args) => run_request(args).await,
        Commands::Config => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_request(args: RequestArgs) -> Result<ExitCode, BoxError> {
    let config = Config::load()?;
    let settings = NetworkSettings::from_config(&config)?;
    let transport = Arc::new(HttpTransport::new(config.http_config())?);

    let fraud = StaticFraudPrevention::new(AntiFraudHeaders {
        device_id: Uuid::new_v4().to_string(),
        connection_method: DEFAULT_CONNECTION_METHOD.to_string(),
        user_agent: config.transport.user_agent.clone(),
        vendor_version: format!("mobilecore={}", env!("CARGO_PKG_VERSION")),
        ..AntiFraudHeaders::default()
    });

    let dependencies = Dependencies::builder()
        .transport(transport)
        .spinner(Arc::new(LoggingSpinner))
        .audit(Arc::new(TracingAuditDelegate))
        .analytics(Arc::new(TracingAnalyticsDelegate))
        .fraud_prevention(Arc::new(fraud))
        .build();
    let service = NetworkService::new(settings, dependencies);

    let mut builder = service
        .request(&args.url)
        .method(args.method)
        .include_anti_fraud_headers(!args.no_anti_fraud);

    if let Some(data) = args.data {
        let value: serde_json::Value = serde_json::from_str(&data)?;
        let parameters = value
            .as_object()
            .cloned()
            .ok_or("--data must be a JSON object")?;
        builder = builder.parameters(parameters);
    }

    for (name, value) in args.headers {
        builder = builder.header(name, value);
    }

    let outcome = service.fetch(builder).await;
    tracing::debug!(metrics = ?service.metrics(), "Request finished");

    match outcome {
        Ok(response) => {
            if let Some(status) = response.status {
                println!("HTTP {status}");
            }
            for (name, value) in &response.headers {
                println!("{name}: {value}");
            }
            println!();
            println!("{}", String::from_utf8_lossy(&response.body));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} [{}]", e, e.kind());
            Ok(ExitCode::FAILURE)
        }
    }
}
