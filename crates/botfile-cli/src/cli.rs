use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "botfile")]
#[command(about = "Patch services in a .bot file")]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Update a service in the bot file
    Update(UpdateArgs),
}

#[derive(clap::Args)]
#[command(arg_required_else_help = true)]
pub struct UpdateArgs {
    #[command(subcommand)]
    pub command: UpdateCommands,
}

#[derive(Subcommand)]
pub enum UpdateCommands {
    /// Update an Azure App Insights service
    #[command(name = "appinsights")]
    AppInsights(AppInsightsArgs),
    /// Update an endpoint service
    Endpoint(EndpointArgs),
    /// Update a generic service
    Generic(GenericArgs),
}

impl UpdateCommands {
    pub fn name(&self) -> &'static str {
        match self {
            UpdateCommands::AppInsights(_) => "appinsights",
            UpdateCommands::Endpoint(_) => "endpoint",
            UpdateCommands::Generic(_) => "generic",
        }
    }

    /// True when none of the command's own flags were given
    pub fn is_empty(&self) -> bool {
        match self {
            UpdateCommands::AppInsights(a) => {
                a.bot.is_empty()
                    && a.name.is_none()
                    && a.service_name.is_none()
                    && a.instrumentation_key.is_none()
                    && a.application_id.is_none()
                    && a.keys.is_none()
            }
            UpdateCommands::Endpoint(a) => {
                a.bot.is_empty()
                    && a.name.is_none()
                    && a.endpoint.is_none()
                    && a.app_id.is_none()
                    && a.app_password.is_none()
            }
            UpdateCommands::Generic(a) => {
                a.bot.is_empty() && a.name.is_none() && a.url.is_none() && a.keys.is_none()
            }
        }
    }
}

/// Flags shared by every update command
#[derive(clap::Args)]
pub struct BotArgs {
    /// Path to bot file. If omitted, the current folder is searched for a .bot file
    #[arg(short, long, env = "BOTFILE_PATH")]
    pub bot: Option<PathBuf>,
    /// Bot file secret for sealing service secrets
    #[arg(long, env = "BOTFILE_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
    /// Arguments are passed in as a JSON object via stdin
    #[arg(long)]
    pub stdin: bool,
    /// Path to arguments in JSON format { name:'', ... }
    #[arg(long, value_name = "JSONFILE")]
    pub input: Option<PathBuf>,
}

impl BotArgs {
    fn is_empty(&self) -> bool {
        !self.stdin && self.input.is_none()
    }
}

#[derive(clap::Args)]
pub struct AppInsightsArgs {
    /// Friendly name
    #[arg(short, long)]
    pub name: Option<String>,
    /// Azure service name
    #[arg(short = 's', long = "serviceName")]
    pub service_name: Option<String>,
    /// App Insights instrumentation key
    #[arg(short = 'i', long = "instrumentationKey")]
    pub instrumentation_key: Option<String>,
    /// (OPTIONAL) App Insights application id
    #[arg(short = 'a', long = "applicationId")]
    pub application_id: Option<String>,
    /// JSON app keys, example: {"key1":"value1","key2":"value2"}
    #[arg(long)]
    pub keys: Option<String>,
    #[command(flatten)]
    pub bot: BotArgs,
}

#[derive(clap::Args)]
pub struct EndpointArgs {
    /// URL for the endpoint
    #[arg(short, long)]
    pub endpoint: Option<String>,
    /// Name of the endpoint
    #[arg(short, long)]
    pub name: Option<String>,
    /// (OPTIONAL) Microsoft AppId used for auth with the endpoint
    #[arg(short = 'a', long = "appId")]
    pub app_id: Option<String>,
    /// (OPTIONAL) Microsoft app password used for auth with the endpoint
    #[arg(short = 'p', long = "appPassword")]
    pub app_password: Option<String>,
    #[command(flatten)]
    pub bot: BotArgs,
}

#[derive(clap::Args)]
pub struct GenericArgs {
    /// Name of the service
    #[arg(short, long)]
    pub name: Option<String>,
    /// Deep link URL for the service
    #[arg(short, long)]
    pub url: Option<String>,
    /// Serialized JSON key/value configuration for the service
    #[arg(long)]
    pub keys: Option<String>,
    #[command(flatten)]
    pub bot: BotArgs,
}
