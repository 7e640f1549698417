use crate::config::RouteTable;
use crate::dispatcher::{max_bytes, HandlerRegistry, SharedHandler};
use crate::echo::echo;
use crate::pipeline::Directive;
use crate::router::Mux;
use crate::runtime_config::RuntimeConfig;
use crate::server::Request;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use http::header::{HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING};
use http::Method;
use serde_json::json;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Command-line interface for kitmux
///
/// Inspects route tables: lists entries in dispatch order and simulates
/// requests against them.
#[derive(Parser)]
#[command(name = "kitmux")]
#[command(about = "kitmux route table inspector", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for `routes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Available CLI commands for kitmux
#[derive(Subcommand)]
pub enum Commands {
    /// List the entries of a route table in dispatch order
    Routes {
        /// Path to the route table (YAML, TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Simulate one request against a route table
    ///
    /// Every handler name in the table is bound to an echo handler, so the
    /// response body shows which handler ran and the named arguments it saw.
    Match {
        /// Path to the route table (YAML, TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Request method
        method: String,

        /// Request path, optionally with a query string
        path: String,

        /// Value of the request's Accept-Encoding header
        #[arg(long)]
        accept_encoding: Option<String>,

        /// Compression directives for the echo handlers, e.g. `minify,gzip`
        #[arg(long, env = "KITMUX_COMPRESSION")]
        compression: Option<String>,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,
    },
}

/// Run the parsed command, writing results to stdout.
///
/// # Errors
///
/// Unreadable or malformed route tables and invalid request arguments.
pub fn run_cli(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(cli, &mut out)
}

/// Run the parsed command, writing results to `out`.
///
/// Runtime settings come from the environment, see [`RuntimeConfig::from_env`].
///
/// # Errors
///
/// Same as [`run_cli`], plus failures writing to `out`.
pub fn run_with_output(cli: Cli, out: &mut dyn Write) -> Result<()> {
    run_with_config(cli, &RuntimeConfig::from_env(), out)
}

/// Run the parsed command with explicit runtime settings.
///
/// `--compression` overrides `runtime.compression`; `runtime.max_body_bytes`
/// limits the simulated request body.
///
/// # Errors
///
/// Same as [`run_with_output`].
pub fn run_with_config(cli: Cli, runtime: &RuntimeConfig, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Routes { config, format } => list_routes(&config, format, runtime, out),
        Commands::Match {
            config,
            method,
            path,
            accept_encoding,
            compression,
            data,
        } => {
            let mut runtime = runtime.clone();
            if let Some(list) = compression {
                runtime.compression = Directive::parse_list(&list)?;
            }
            let request = SimulatedRequest {
                method: &method,
                path: &path,
                accept_encoding: accept_encoding.as_deref(),
                body: data.unwrap_or_default().into_bytes(),
            };
            simulate(&config, &request, &runtime, out)
        }
    }
}

struct SimulatedRequest<'a> {
    method: &'a str,
    path: &'a str,
    accept_encoding: Option<&'a str>,
    body: Vec<u8>,
}

/// Echo handlers for every handler name the table mentions.
///
/// Each echo uses the table's codec settings and sits behind a body limit.
fn echo_registry(table: &RouteTable, runtime: &RuntimeConfig) -> HandlerRegistry {
    let compressor = table.compressor();
    let names = table
        .routes
        .iter()
        .map(|entry| entry.handler())
        .chain(table.not_found.as_deref())
        .chain(table.panic.as_deref());
    let mut registry = HandlerRegistry::new();
    for name in names {
        registry.entry(name.to_string()).or_insert_with(|| {
            let echo = echo(name)
                .with_compression(runtime.compression.clone())
                .with_compressor(Arc::clone(&compressor));
            let handler: SharedHandler = Arc::new(max_bytes(runtime.max_body_bytes, echo));
            handler
        });
    }
    registry
}

fn handler_name<'a>(registry: &'a HandlerRegistry, handler: &SharedHandler) -> &'a str {
    registry
        .iter()
        .find(|(_, h)| Arc::ptr_eq(h, handler))
        .map_or("?", |(name, _)| name.as_str())
}

fn load(config: &Path, runtime: &RuntimeConfig) -> Result<(RouteTable, HandlerRegistry, Mux)> {
    let table = RouteTable::load(config)?;
    let registry = echo_registry(&table, runtime);
    let mux = Mux::from_table(&table, &registry);
    debug!(config = %config.display(), entries = mux.len(), "Mux built");
    Ok((table, registry, mux))
}

fn list_routes(
    config: &Path,
    format: OutputFormat,
    runtime: &RuntimeConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let (table, registry, mux) = load(config, runtime)?;

    match format {
        OutputFormat::Text => {
            writeln!(
                out,
                "{} of {} routes registered",
                mux.len(),
                table.routes.len()
            )?;
            for (i, entry) in mux.entries().iter().enumerate() {
                writeln!(
                    out,
                    "{:>3}  {:>8.2}  {:<20}  {}",
                    i,
                    entry.matcher().priority(),
                    handler_name(&registry, entry.handler()),
                    entry.matcher()
                )?;
            }
            if let Some(name) = &table.not_found {
                writeln!(out, "not found: {name}")?;
            }
            if let Some(name) = &table.panic {
                writeln!(out, "panic: {name}")?;
            }
        }
        OutputFormat::Json => {
            let entries: Vec<_> = mux
                .entries()
                .iter()
                .map(|entry| {
                    json!({
                        "handler": handler_name(&registry, entry.handler()),
                        "priority": entry.matcher().priority(),
                        "matcher": entry.matcher(),
                    })
                })
                .collect();
            let doc = json!({
                "entries": entries,
                "not_found": table.not_found,
                "panic": table.panic,
            });
            serde_json::to_writer_pretty(&mut *out, &doc)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn simulate(
    config: &Path,
    request: &SimulatedRequest<'_>,
    runtime: &RuntimeConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let (table, registry, mux) = load(config, runtime)?;
    let compressor = table.compressor();
    let (method, path, body) = (request.method, request.path, &request.body);

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method {method:?}"))?;
    let accept_encoding = request
        .accept_encoding
        .map(|value| {
            HeaderValue::from_str(value)
                .with_context(|| format!("invalid Accept-Encoding value {value:?}"))
        })
        .transpose()?;
    let build = || -> Result<http::Request<Vec<u8>>> {
        let mut builder = http::Request::builder().method(method.clone()).uri(path);
        if let Some(value) = &accept_encoding {
            builder = builder.header(ACCEPT_ENCODING, value.clone());
        }
        builder
            .body(body.clone())
            .with_context(|| format!("invalid request target {path:?}"))
    };

    let mut probe = Request::from(build()?);
    match mux.find(&mut probe) {
        Some(entry) => {
            let index = mux
                .entries()
                .iter()
                .position(|e| std::ptr::eq(e, entry))
                .unwrap_or_default();
            writeln!(
                out,
                "matched: #{} {} (priority {:.2})",
                index,
                handler_name(&registry, entry.handler()),
                entry.matcher().priority()
            )?;
            writeln!(out, "matcher: {}", entry.matcher())?;
            for (key, value) in probe.named_args().iter() {
                writeln!(out, "arg: {key}={value}")?;
            }
        }
        None => writeln!(out, "matched: none")?,
    }

    let resp = mux.respond(build()?);
    let encoding = resp
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok());
    writeln!(out, "status: {}", resp.status())?;
    writeln!(out, "encoding: {}", encoding.unwrap_or("identity"))?;

    let body = match encoding {
        Some(token) => compressor
            .decode(token, resp.body())
            .map_err(|err| anyhow!("failed to decode {token} response body: {err}"))?,
        None => resp.body().clone(),
    };
    writeln!(out)?;
    out.write_all(&body)?;
    if !body.ends_with(b"\n") {
        writeln!(out)?;
    }
    Ok(())
}
