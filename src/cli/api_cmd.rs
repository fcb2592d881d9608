//! `api` command: raw requests against the REST API

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use reqwest::Method;

use super::output::Output;
use super::session::Session;

/// Make a request to the Shortcut API
#[derive(Args, Debug, Clone)]
#[command(after_help = "Examples:
  $ short api /search/iterations -f page_size=10 -f query=123
  $ short api /stories -X POST -f 'name=My new story' -f project_id=123")]
pub struct ApiArgs {
    /// Path below the API root, e.g. /stories/123
    #[arg(value_name = "PATH")]
    pub path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Header as "Name: value"; repeatable
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// String parameter as key=value; repeatable. Sent as the JSON body for
    /// POST, PUT and PATCH, as the query string otherwise
    #[arg(short = 'f', long = "raw-field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

fn split_once_or_key(input: &str, separator: char) -> (String, String) {
    match input.split_once(separator) {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => (input.to_string(), String::new()),
    }
}

fn parse_header(input: &str) -> Result<(String, String), String> {
    let (name, value) = split_once_or_key(input, ':');
    if name.trim().is_empty() {
        return Err(format!("invalid header '{}'", input));
    }
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_field(input: &str) -> Result<(String, String), String> {
    let (key, value) = split_once_or_key(input, '=');
    if key.is_empty() {
        return Err(format!("invalid field '{}'", input));
    }
    Ok((key, value))
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", method))
}

pub async fn run(args: ApiArgs, session: &Session, output: &Output) -> Result<()> {
    let method = parse_method(&args.method)?;
    let client = session.client()?;
    tracing::debug!(%method, path = %args.path, headers = args.headers.len(), fields = args.fields.len(), "raw request");

    let response = client
        .raw(method, &args.path, &args.headers, &args.fields)
        .await
        .context("Error calling API")?;

    let mut out = io::stdout();
    if output.is_json() {
        output.data(&response);
    } else {
        writeln!(out, "{}", serde_json::to_string_pretty(&response)?)?;
    }
    Ok(())
}
