use cassette_cfg::{Config, ParamValue};
use clap::Parser;
use std::process::ExitCode;

/// Loads a configuration source and dumps every resource it declares.
#[derive(Debug, Parser)]
#[command(name = "cassette-cfg", version, about)]
struct Args {
    /// Configuration source to load. Repeat to give fallback candidates,
    /// tried in order until one opens.
    #[arg(required = true)]
    source: Vec<String>,

    /// Inject a parameter as `name=value`, readable from the source via
    /// `(% name)` when no same-named variable is declared.
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Start the load in restricted mode: only resource declarations and
    /// `SECTION` gating take effect.
    #[arg(long)]
    restrict: bool,

    /// Print every value of `NAMESPACE.PROPERTY` after loading. Repeatable.
    #[arg(long = "get", value_name = "NAMESPACE.PROPERTY")]
    gets: Vec<String>,
}

fn parse_param(raw: &str) -> Option<(String, ParamValue)> {
    let (name, value) = raw.split_once('=')?;
    let value = if let Ok(v) = value.parse::<i64>() {
        ParamValue::Long(v)
    } else if let Ok(v) = value.parse::<f64>() {
        ParamValue::Double(v)
    } else {
        ParamValue::Str(value.to_string())
    };
    Some((name.to_string(), value))
}

fn main() -> ExitCode {
    simple_logger::init_with_env().ok();
    let args = Args::parse();

    let mut config = Config::new();
    for source in &args.source {
        config.push_source(source);
    }
    for raw in &args.params {
        match parse_param(raw) {
            Some((name, value)) => config.push_param(name, value),
            None => log::warn!("ignoring malformed --param {raw:?}, expected name=value"),
        }
    }
    if args.restrict {
        config.restrict();
    }

    config.load();

    if let Some(err) = config.error() {
        eprintln!("failed to load configuration: {err}");
        return ExitCode::FAILURE;
    }

    for line in config.printed_lines() {
        println!("{line}");
    }

    for get in &args.gets {
        let Some((namespace, property)) = get.split_once('.') else {
            log::warn!("ignoring malformed --get {get:?}, expected namespace.property");
            continue;
        };
        config.fetch(namespace, property);
        let mut values = Vec::new();
        while config.iterate() {
            values.push(config.resource().to_string());
        }
        println!("{namespace}.{property} = [{}]", values.join(", "));
    }

    ExitCode::SUCCESS
}
