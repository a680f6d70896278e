use anyhow::{Context, Result};
use botfile_config::patcher::{APP_INSIGHTS, ENDPOINT, GENERIC};
use botfile_config::{
    ArgumentSet, FileStore, OverlaySource, UpdateRequest, VariantDescriptor, run_update,
};
use tracing::debug;

use crate::cli::{AppInsightsArgs, BotArgs, EndpointArgs, GenericArgs};
use crate::output::print_service;

pub async fn appinsights(args: &AppInsightsArgs) -> Result<()> {
    let flags = ArgumentSet::new()
        .with_opt("name", args.name.clone())
        .with_opt("serviceName", args.service_name.clone())
        .with_opt("instrumentationKey", args.instrumentation_key.clone())
        .with_opt("applicationId", args.application_id.clone())
        .with_opt("keys", args.keys.clone());
    execute(&APP_INSIGHTS, &args.bot, flags).await
}

pub async fn endpoint(args: &EndpointArgs) -> Result<()> {
    let flags = ArgumentSet::new()
        .with_opt("endpoint", args.endpoint.clone())
        .with_opt("name", args.name.clone())
        .with_opt("appId", args.app_id.clone())
        .with_opt("appPassword", args.app_password.clone());
    execute(&ENDPOINT, &args.bot, flags).await
}

pub async fn generic(args: &GenericArgs) -> Result<()> {
    let flags = ArgumentSet::new()
        .with_opt("name", args.name.clone())
        .with_opt("url", args.url.clone())
        .with_opt("keys", args.keys.clone());
    execute(&GENERIC, &args.bot, flags).await
}

async fn execute(
    variant: &'static VariantDescriptor,
    bot: &BotArgs,
    flags: ArgumentSet,
) -> Result<()> {
    let request = UpdateRequest {
        variant,
        bot: bot.bot.clone(),
        working_dir: std::env::current_dir().context("Cannot determine working directory")?,
        secret: bot.secret.clone(),
        flags,
        overlay: OverlaySource::select(bot.stdin, bot.input.clone()),
    };
    debug!(kind = %variant.kind, bot = ?request.bot, overlay = ?request.overlay, "running update");

    let outcome = run_update(&FileStore::new(), request).await?;
    print_service(&outcome.service)
}
