use anyhow::Result;
use pact_grpc_bridge::client::{BridgedClient, InterceptMode};
use pact_grpc_bridge::example::{self, ExampleRequest, ExampleResponse};
use pact_grpc_bridge::settings::Settings;
use tonic::Response;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let settings = Settings::load()?;
    let name = std::env::args().nth(1).unwrap_or_else(|| "world".to_string());

    let mut config = settings.interceptor_config();
    config.mode = InterceptMode::Replace;

    info!(
        broker = %format!("{}:{}", config.broker_host, config.broker_port),
        "Recording interaction"
    );

    let mut client = BridgedClient::connect_lazy(&settings.target_service_host, config)?;
    let method = format!("/{}/{}", example::SERVICE, example::EXAMPLE_METHOD);
    let response: Response<ExampleResponse> =
        client.unary(&method, ExampleRequest { name }).await?;

    println!("{}", response.into_inner().message);

    Ok(())
}
