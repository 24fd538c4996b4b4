//! tryit - explore and call OpenAPI operations from the command line
//!
//! Loads a spec from a file or URL, lists its endpoints, and builds, exports
//! or sends requests for one of them.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tryit::constants::LOG_FILE_NAME;
use tryit::models::{AuthSelection, ParamValues};
use tryit::{DraftPatch, EngineConfig, ReqwestTransport, SpecSession};

#[derive(Parser)]
#[command(name = "tryit")]
#[command(version, about = "Build and send requests from an OpenAPI document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the companion server hosting the proxy routes
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Origin requests are considered to come from; enables the proxy fallback
    #[arg(long, global = true)]
    origin: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the endpoints of a spec, grouped by tag
    Endpoints {
        /// Spec file path or http(s) URL
        spec: String,
    },

    /// Print the example request body of an endpoint
    Example {
        /// Spec file path or http(s) URL
        spec: String,

        /// Endpoint id as shown by `endpoints`
        endpoint: String,
    },

    /// Print the cURL command for a request
    #[command(after_help = "EXAMPLES:\n  \
        tryit curl petstore.yaml getPetById --path petId=7 --bearer $TOKEN")]
    Curl(RequestArgs),

    /// Send a request and print the response
    #[command(after_help = "EXAMPLES:\n  \
        tryit send petstore.yaml addPet --body '{\"name\": \"Rex\"}' --timeout-ms 5000")]
    Send {
        #[command(flatten)]
        request: RequestArgs,

        /// Request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Args)]
struct RequestArgs {
    /// Spec file path or http(s) URL
    spec: String,

    /// Endpoint id as shown by `endpoints`
    endpoint: String,

    /// Base URL, overriding the spec's server
    #[arg(long)]
    base_url: Option<String>,

    /// Path parameter as name=value
    #[arg(long = "path", value_parser = parse_key_value)]
    path_params: Vec<(String, String)>,

    /// Query parameter as name=value
    #[arg(long = "query", value_parser = parse_key_value)]
    query_params: Vec<(String, String)>,

    /// Header as name=value
    #[arg(long = "header", value_parser = parse_key_value)]
    header_params: Vec<(String, String)>,

    /// Cookie as name=value
    #[arg(long = "cookie", value_parser = parse_key_value)]
    cookie_params: Vec<(String, String)>,

    /// Request body text, replacing the synthesized example
    #[arg(long)]
    body: Option<String>,

    /// Request body content type
    #[arg(long)]
    content_type: Option<String>,

    /// Accept header
    #[arg(long)]
    accept: Option<String>,

    /// Bearer token
    #[arg(long, conflicts_with = "basic")]
    bearer: Option<String>,

    /// Basic credentials as user:password
    #[arg(long)]
    basic: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected name=value, got \"{}\"", raw))
}

fn to_values(pairs: &[(String, String)]) -> ParamValues {
    pairs.iter().cloned().collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to file; stdout carries command output
    let file_appender = tracing_appender::rolling::never(".", LOG_FILE_NAME);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(server_url) = cli.server_url {
        config.proxy_base_url = server_url;
    }
    if let Some(origin) = cli.origin {
        config.current_origin = Some(origin);
    }

    let transport = Arc::new(ReqwestTransport::new());
    let mut session = SpecSession::new(transport, config);

    match cli.command {
        Commands::Endpoints { spec } => {
            load(&mut session, &spec).await?;
            print_endpoints(&session);
        }
        Commands::Example { spec, endpoint } => {
            load(&mut session, &spec).await?;
            select(&mut session, &endpoint)?;
            let operation = session
                .state()
                .selected_operation()
                .context("Endpoint has no operation details")?;
            match operation.request_body {
                Some(body) if !body.example_text.is_empty() => println!("{}", body.example_text),
                Some(_) => println!("No example available for this request body."),
                None => println!("This endpoint takes no request body."),
            }
        }
        Commands::Curl(args) => {
            prepare(&mut session, &args).await?;
            let command = session.curl_command().map_err(|e| anyhow!(e.describe()))?;
            println!("{}", command);
        }
        Commands::Send {
            request,
            timeout_ms,
        } => {
            prepare(&mut session, &request).await?;
            let result = session
                .send(timeout_ms)
                .await
                .map_err(|e| anyhow!(e.describe()))?;

            println!(
                "{} {} ({} ms)",
                result.status, result.status_text, result.duration_ms
            );
            for (name, value) in &result.headers {
                println!("{}: {}", name, value);
            }
            println!();
            println!("{}", result.body_text);
        }
    }

    Ok(())
}

async fn load(session: &mut SpecSession, spec: &str) -> Result<()> {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        session.load_from_url(spec).await?;
    } else {
        session
            .load_from_file(Path::new(spec))
            .await
            .with_context(|| format!("Failed to load {}", spec))?;
    }
    Ok(())
}

fn select(session: &mut SpecSession, endpoint: &str) -> Result<()> {
    if !session.state().endpoint_by_id.contains_key(endpoint) {
        bail!("Unknown endpoint \"{}\". Run `tryit endpoints` to list ids.", endpoint);
    }
    session.select_endpoint(Some(endpoint));
    Ok(())
}

/// Loads the spec, selects the endpoint and applies the request flags
async fn prepare(session: &mut SpecSession, args: &RequestArgs) -> Result<()> {
    load(session, &args.spec).await?;
    select(session, &args.endpoint)?;

    let auth = match (&args.bearer, &args.basic) {
        (Some(token), _) => Some(AuthSelection::Bearer {
            token: token.clone(),
        }),
        (None, Some(credentials)) => {
            let (username, password) = credentials
                .split_once(':')
                .unwrap_or((credentials.as_str(), ""));
            Some(AuthSelection::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        (None, None) => None,
    };

    session.update_draft(DraftPatch {
        enabled: Some(true),
        base_url: args.base_url.clone(),
        path_params: Some(to_values(&args.path_params)),
        query_params: Some(to_values(&args.query_params)),
        header_params: Some(to_values(&args.header_params)),
        cookie_params: Some(to_values(&args.cookie_params)),
        body_text: args.body.clone(),
        content_type: args.content_type.clone().map(Some),
        accept_header: args.accept.clone().map(Some),
        auth,
    });
    Ok(())
}

fn print_endpoints(session: &SpecSession) {
    let state = session.state();
    if let Some(metadata) = &state.metadata {
        println!(
            "{} {} ({} operations)",
            metadata.title,
            metadata.version,
            state.operation_count()
        );
    }

    for group in &state.endpoint_groups {
        println!();
        println!("{}", group.tag);
        for endpoint in &group.endpoints {
            let deprecated = if endpoint.deprecated { "  [deprecated]" } else { "" };
            println!(
                "  {:7} {}  {}{}",
                endpoint.method.as_str(),
                endpoint.path,
                endpoint.id,
                deprecated
            );
        }
    }
}
