use clap::{Parser, Subcommand};
use mobilecore::http::Method;

#[derive(Parser, Debug)]
#[command(name = "mobilecore")]
#[command(about = "mobilecore request pipeline CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one request through the full build, send and classify pipeline
    Request(RequestArgs),
    /// Print the resolved configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// Absolute URL, or a path resolved against `request.base_url`
    pub url: String,

    #[arg(long, short = 'X', default_value = "GET")]
    pub method: Method,

    /// JSON object used as request parameters
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Extra header as `Name: value`; repeatable
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Leave out the anti-fraud headers
    #[arg(long)]
    pub no_anti_fraud: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
