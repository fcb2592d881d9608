//! `install` command: store the API token and member details

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Password};

use super::output::Output;
use super::session::Session;
use crate::api::CurrentMember;
use crate::storage::Config;

const TOKEN_PROMPT: &str = "API Token -> https://app.shortcut.com/xxxx/settings/account/api-tokens";

/// Install the access token and other settings for the Shortcut API
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Force install/reinstall
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Refresh the configuration with details from Shortcut
    #[arg(short = 'r', long)]
    pub refresh: bool,

    /// Use this token instead of prompting for one
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
}

/// What an install run does, given the stored configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Refresh,
    Install,
    AlreadyInstalled,
}

fn plan(args: &InstallArgs, stored: &Config) -> Plan {
    if args.refresh {
        Plan::Refresh
    } else if stored.token().is_none() || args.force {
        Plan::Install
    } else {
        Plan::AlreadyInstalled
    }
}

/// Copies the member details the CLI needs into the config
fn apply_member(config: &mut Config, member: &CurrentMember) {
    config.mention_name = Some(member.mention_name.clone());
    config.url_slug = Some(member.workspace2.url_slug.clone());
}

async fn fetch_member(session: &Session, token: &str, output: &Output) -> Result<CurrentMember> {
    output.status("Fetching user/member details from Shortcut...");
    let member = session
        .client_for(token)?
        .current_member()
        .await
        .context("Error fetching member details; check the token")?;
    tracing::debug!(mention_name = %member.mention_name, "fetched current member");
    Ok(member)
}

pub async fn run(args: InstallArgs, session: &Session, output: &Output) -> Result<()> {
    let stored = session.store().load()?;

    match plan(&args, &stored) {
        Plan::Refresh => {
            let token = session
                .config()
                .token()
                .context("Not installed yet. Please run: short install")?;
            let member = fetch_member(session, token, output).await?;
            session.store().update(|c| apply_member(c, &member))?;
            output.success("Saved config");
        }
        Plan::Install => {
            let token = match args.token {
                Some(token) => token,
                None => Password::with_theme(&ColorfulTheme::default())
                    .with_prompt(TOKEN_PROMPT)
                    .interact()
                    .context("Failed to read the API token")?,
            };
            let token = token.trim().to_string();
            if token.is_empty() {
                anyhow::bail!("An API token is required");
            }

            let member = fetch_member(session, &token, output).await?;
            output.status("Saving config...");
            session.store().update(|c| {
                c.token = Some(token.clone());
                apply_member(c, &member);
            })?;
            output.success("Saved config");
        }
        Plan::AlreadyInstalled => {
            output.line("A configuration/token is already saved. To override, re-run with --force");
        }
    }
    Ok(())
}
