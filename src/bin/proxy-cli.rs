use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Client for the flow-proxy control API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// API version prefix
    #[arg(long, default_value = "v1")]
    api: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the control API is up
    Test,
    /// Route a service through the proxy
    Reconfigure {
        #[arg(long)]
        service_name: String,
        /// Comma separated path prefixes
        #[arg(long)]
        service_path: Option<String>,
        #[arg(long)]
        service_color: Option<String>,
        #[arg(long)]
        service_domain: Option<String>,
        #[arg(long)]
        path_type: Option<String>,
        #[arg(long)]
        skip_check: bool,
        #[arg(long)]
        consul_template_path: Option<String>,
    },
    /// Stop routing a service
    Remove {
        #[arg(long)]
        service_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Test => {
            let res = client
                .get(format!("{}/{}/test", cli.url, cli.api))
                .send()
                .await?;
            println!("{}", res.status());
        }
        Commands::Reconfigure {
            service_name,
            service_path,
            service_color,
            service_domain,
            path_type,
            skip_check,
            consul_template_path,
        } => {
            let mut query = vec![("serviceName", service_name)];
            let optional = [
                ("servicePath", service_path),
                ("serviceColor", service_color),
                ("serviceDomain", service_domain),
                ("pathType", path_type),
                ("consulTemplatePath", consul_template_path),
            ];
            query.extend(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
            if skip_check {
                query.push(("skipCheck", "true".to_string()));
            }

            let res = client
                .get(format!("{}/{}/docker-flow-proxy/reconfigure", cli.url, cli.api))
                .query(&query)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Remove { service_name } => {
            let res = client
                .get(format!("{}/{}/docker-flow-proxy/remove", cli.url, cli.api))
                .query(&[("serviceName", service_name)])
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control API returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
