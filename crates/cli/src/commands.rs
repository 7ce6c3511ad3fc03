use std::sync::Arc;

use anyhow::{Context, Result, bail};
use lcu::{Client, ClientConfig, Event, Method, Response};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, RequestArgs, WatchArgs};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = cli.connection.apply(ClientConfig::from_env());
	let client = Client::new(config).context("failed to set up client")?;

	match cli.command {
		Commands::Credentials => credentials(&client).await,
		command => {
			client.connect().await.context("failed to connect to the League Client")?;
			let result = run_connected(&client, command).await;
			client.disconnect().await?;
			result
		}
	}
}

async fn run_connected(client: &Client, command: Commands) -> Result<()> {
	match command {
		Commands::Request(args) => request(client, args).await,
		Commands::Watch(args) => watch(client, args).await,
		Commands::Phase => phase(client).await,
		Commands::Summoner => {
			let summoner = client.current_summoner().await?;
			println!("{}", serde_json::to_string_pretty(&summoner)?);
			Ok(())
		}
		Commands::Credentials => credentials(client).await,
	}
}

async fn credentials(client: &Client) -> Result<()> {
	let credentials = client.manager().resolver().resolve().await?;
	println!("{}", serde_json::to_string_pretty(&credentials)?);
	Ok(())
}

async fn request(client: &Client, args: RequestArgs) -> Result<()> {
	let method = parse_method(&args.method)?;
	let body = match args.body {
		Some(raw) => {
			let value: Value = serde_json::from_str(&raw).context("request body is not valid JSON")?;
			Some(serde_json::to_vec(&value)?.into())
		}
		None => None,
	};

	let response = client.request(method, &args.path, body).await?;
	eprintln!("{}", response.status);
	println!("{}", render_body(&response));

	if !response.is_success() {
		bail!("{} {} returned {}", args.method.to_ascii_uppercase(), args.path, response.status);
	}
	Ok(())
}

async fn watch(client: &Client, args: WatchArgs) -> Result<()> {
	let print = |event: Arc<Event>| async move {
		println!("{}", serde_json::to_string(&*event)?);
		anyhow::Ok(())
	};

	match &args.topic {
		Some(topic) => {
			client.subscribe(topic, &args.event_types(), print)?;
			info!(target: "lcu_cli", topic = %topic, "watching");
		}
		None => {
			client.subscribe_to_all(print)?;
			info!(target: "lcu_cli", "watching every event");
		}
	}

	wait_for_exit(client).await
}

async fn phase(client: &Client) -> Result<()> {
	match client.game_phase().await {
		Ok(phase) => println!("{phase}"),
		Err(err) => warn!(target: "lcu_cli", error = %err, "could not read current phase"),
	}
	client.subscribe_to_game_phase(|phase| println!("{phase}"))?;
	wait_for_exit(client).await
}

/// Blocks until Ctrl+C or until the client drops the socket.
async fn wait_for_exit(client: &Client) -> Result<()> {
	tokio::select! {
		signal = tokio::signal::ctrl_c() => {
			signal.context("failed to listen for Ctrl+C")?;
			info!(target: "lcu_cli", "interrupted");
			Ok(())
		}
		exit = client.listener_exit() => {
			bail!("event stream ended: {exit:?}")
		}
	}
}

fn parse_method(raw: &str) -> Result<Method> {
	Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).with_context(|| format!("invalid HTTP method: {raw}"))
}

/// Pretty-prints JSON bodies and passes anything else through.
fn render_body(response: &Response) -> String {
	match response.json::<Value>() {
		Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
		Err(_) => response.text(),
	}
}
