//! # CLI Module
//!
//! Command-line inspection of route tables.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List the entries of a route table in dispatch order, with the settled
//! priority, the handler name and the matcher:
//!
//! ```bash
//! kitmux routes --config routes.yaml
//! kitmux routes --config routes.yaml --format json
//! ```
//!
//! ### `match`
//!
//! Simulate one request. Every handler name is bound to an echo handler, so
//! the output shows the winning entry, the extracted named arguments, the
//! negotiated content coding and the (decoded) echo body:
//!
//! ```bash
//! kitmux match --config routes.yaml GET /users/42 --accept-encoding "gzip;q=0.8, br"
//! kitmux match --config routes.yaml POST /users --data '{"name":"x"}'
//! ```
//!
//! Echo handlers use the table's `compression` codec settings, the
//! directives from `--compression` (or `KITMUX_COMPRESSION`) and reject
//! bodies over `KITMUX_MAX_BODY_BYTES` with `413`.
//!
//! Logging goes to stderr and is configured through `KITMUX_LOG_*`, see
//! [`crate::logging`].

mod commands;


pub use commands::{run_cli, run_with_config, run_with_output, Cli, Commands, OutputFormat};
