use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "forwarder-cli")]
#[command(about = "Command-line client for the egress forwarder", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    gateway: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward a request through the gateway
    Exec(ExecArgs),
    /// Check gateway liveness
    Health,
}

#[derive(Args)]
struct ExecArgs {
    /// Target URL
    #[arg(long)]
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header, `Name: value`
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body; sent as JSON when it parses as JSON
    #[arg(short, long, conflicts_with = "form")]
    data: Option<String>,

    /// Form field, `key=value`
    #[arg(short, long)]
    form: Vec<String>,

    /// Query parameter, `key=value`
    #[arg(short, long)]
    query: Vec<String>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip upstream certificate verification
    #[arg(long)]
    insecure: bool,

    /// Print a base64 body as text
    #[arg(long)]
    decode: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let gateway = cli.gateway.trim_end_matches('/');

    match cli.command {
        Commands::Exec(args) => {
            let payload = build_payload(&args)?;
            let res = client
                .post(format!("{gateway}/forwarder/exec"))
                .json(&payload)
                .send()
                .await?;
            print_response(res, args.decode).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{gateway}/health")).send().await?;
            print_response(res, false).await?;
        }
    }

    Ok(())
}

fn build_payload(args: &ExecArgs) -> Result<Value, String> {
    let mut payload = Map::new();
    payload.insert("url".into(), json!(args.url));
    payload.insert("method".into(), json!(args.method.to_ascii_uppercase()));

    let mut headers = Map::new();
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header must look like 'Name: value', got '{raw}'"))?;
        headers.insert(name.trim().to_string(), json!(value.trim()));
    }

    if !args.form.is_empty() {
        headers
            .entry("Content-Type")
            .or_insert_with(|| json!("application/x-www-form-urlencoded"));
        payload.insert("body".into(), Value::Object(pairs(&args.form)?));
    } else if let Some(data) = &args.data {
        let body = serde_json::from_str(data).unwrap_or_else(|_| json!(data));
        payload.insert("body".into(), body);
    }

    if !headers.is_empty() {
        payload.insert("headers".into(), Value::Object(headers));
    }
    if !args.query.is_empty() {
        payload.insert("params".into(), Value::Object(pairs(&args.query)?));
    }
    if let Some(timeout) = args.timeout_ms {
        payload.insert("timeoutMs".into(), json!(timeout));
    }
    if args.insecure {
        payload.insert("rejectUnauthorized".into(), json!(false));
    }

    Ok(Value::Object(payload))
}

fn pairs(raw: &[String]) -> Result<Map<String, Value>, String> {
    raw.iter()
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.to_string(), json!(v)))
                .ok_or_else(|| format!("expected key=value, got '{kv}'"))
        })
        .collect()
}

async fn print_response(res: reqwest::Response, decode: bool) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let Ok(mut json) = serde_json::from_str::<Value>(&text) else {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("Response: {text}");
        return Ok(());
    };

    if !status.is_success() {
        eprintln!("Error: gateway returned status {status}");
    }

    if decode {
        if let Some(encoded) = json.get("bodyBase64").and_then(Value::as_str) {
            let raw = STANDARD.decode(encoded)?;
            json["bodyBase64"] = json!(String::from_utf8_lossy(&raw));
        }
    }

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
