//! Command execution.

use std::sync::Arc;

use anyhow::{Context, bail};
use fylinde_auth_application::AuthClient;
use fylinde_auth_domain::{
    AuthRequest, FetchOptions, PasswordResetVariables, SignInResponse, TokenCreateVariables,
};
use fylinde_auth_infrastructure::{
    ConfigLoader, GraphqlAuthBackend, JsonFileStorage, ReqwestHttpClient,
};

use crate::cli::{Cli, Command};

type Client = AuthClient<ReqwestHttpClient, GraphqlAuthBackend<ReqwestHttpClient>>;

/// Wires the adapters and runs one command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()
        .context("failed to load configuration")?;

    let storage = match &cli.storage {
        Some(path) => JsonFileStorage::open(path),
        None => JsonFileStorage::open_default(),
    }
    .context("failed to open session storage")?;
    tracing::debug!(path = %storage.path().display(), "using session storage");

    let http = Arc::new(ReqwestHttpClient::from_config(&config)?);
    let backend = Arc::new(GraphqlAuthBackend::new(Arc::clone(&http), &config));
    let client: Client = AuthClient::builder(config)
        .http_client(http)
        .backend(backend)
        .refresh_token_storage(Arc::new(storage))
        .on_auth_refresh(|refreshing| {
            if refreshing {
                tracing::info!("refreshing access token");
            }
        })
        .build()?;

    let result = execute(&client, cli.command).await;
    client.cleanup();
    result
}

async fn execute(client: &Client, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Status => {
            println!("session: {}", client.session_state());
            println!("credentials: {:?}", client.refresh_state());
        }
        Command::SignIn { email, password } => {
            let response = client
                .sign_in(&TokenCreateVariables::new(email, password))
                .await?;
            report_sign_in(&response)?;
        }
        Command::ResetPassword {
            email,
            password,
            token,
        } => {
            let response = client
                .reset_password(&PasswordResetVariables {
                    email,
                    password,
                    token,
                })
                .await?;
            report_sign_in(&response)?;
        }
        Command::Fetch {
            query,
            url,
            allow_third_party,
        } => {
            let url = url.unwrap_or_else(|| client.config().api_url.clone());
            let body = serde_json::json!({ "query": query });
            let options = FetchOptions {
                allow_passing_token_to_third_party_domains: allow_third_party,
            };
            let response = client
                .fetch_with_auth(AuthRequest::post_json(url, &body), options)
                .await?;
            println!("{}", response.body);
            if !response.is_success() {
                bail!("request failed with status {}", response.status);
            }
        }
        Command::Refresh => match client.refresh_session().await {
            Some(outcome) => println!("refresh: {outcome:?}"),
            None => bail!("not signed in"),
        },
        Command::SignOut => {
            client.sign_out();
            println!("session: {}", client.session_state());
        }
    }
    Ok(())
}

fn report_sign_in<R: SignInResponse>(response: &R) -> anyhow::Result<()> {
    let Some(payload) = response.payload() else {
        bail!("the backend returned no sign-in payload");
    };
    if payload.accepted_token().is_none() {
        let messages: Vec<&str> = payload
            .errors
            .iter()
            .filter_map(|error| error.message.as_deref())
            .collect();
        bail!("sign-in rejected: {}", messages.join("; "));
    }
    println!("signed in");
    Ok(())
}
