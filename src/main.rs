// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod command;
mod error;
mod gateway;
mod guard;
mod http;
mod metadata;
mod model;
mod password;
mod session;
mod storage;

use std::{path::PathBuf, process, sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use command::Context;
use error::Result;
use log::{error, info, warn};
use storage::IsPersistent as _;
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Signup(command::signup::Command),
    Logout(command::logout::Command),
    Whoami(command::whoami::Command),
    Visit(command::visit::Command),
    Request(command::request::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(context).await,
            Self::Signup(cmd) => cmd.execute(context).await,
            Self::Logout(cmd) => cmd.execute(context).await,
            Self::Whoami(cmd) => cmd.execute(context).await,
            Self::Visit(cmd) => cmd.execute(context).await,
            Self::Request(cmd) => cmd.execute(context).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the LawConnect API. Authentication requests go to
    /// `auth/login` and `auth/register` underneath it.
    #[arg(long, env = "LAWCONNECT_API_URL", default_value = "http://localhost:8080/api/", value_parser = Url::parse)]
    api_url: Url,

    /// Give up on requests that have not completed after this many seconds.
    #[arg(long, env = "LAWCONNECT_TIMEOUT")]
    timeout: Option<u64>,

    /// A JSON route table declaring the protected screens and the roles
    /// allowed to see them. The built-in table has one dashboard per role.
    #[arg(long, env = "LAWCONNECT_ROUTES", value_hint = clap::ValueHint::FilePath)]
    routes: Option<PathBuf>,

    /// Keep the session in memory only. It is forgotten when the command
    /// exits.
    #[arg(long)]
    no_persist_session: bool,

    /// The path to the Pinentry program to use when asking for a password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> Box<dyn storage::Storage> {
    if !args.no_persist_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.api_url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.api_url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        if let Some(file_storage) = storage::File::new("session") {
            return Box::new(file_storage);
        }
        warn!("There is no data directory to keep the session in, so it will not outlast this command");
    }

    Box::new(storage::Memory::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let routes = Arc::new(match &args.routes {
        Some(path) => guard::Routes::load(path)?,
        None => guard::Routes::default(),
    });

    let session_storage = get_session_storage(&args).await;
    if !session_storage.is_persistent() {
        info!("The session is kept in memory only");
    }
    let store = Arc::new(session::Store::new(session_storage));
    store.restore().await;

    let http = http::client(args.timeout.map(Duration::from_secs))?;
    let transport: Box<dyn gateway::Transport> =
        Box::new(http::HttpTransport::new(http.clone(), args.api_url.clone()));
    let context = Context {
        gateway: gateway::Gateway::new(Arc::clone(&store), transport),
        backend: api::Backend::new(http, args.api_url, Arc::clone(&store)),
        store,
        routes,
        prompt: Box::new(prompt),
    };

    command::Command::execute(args.command, &context).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("LAWCONNECT_LOG", "warn")
        .write_style("LAWCONNECT_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
