//! A terminal chat program built on the `robochat` session types.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;

use owo_colors::OwoColorize;
use robochat::{AgentTransport, Session, StreamEvent};
use robochat_model::{Credentials, StaticCredentials};
use robochat_runtime::{RuntimeConfigBuilder, RuntimeTransport};
use robochat_sse::{SseConfigBuilder, SseTransport};
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // An SSE base URL selects the plain HTTP backend; otherwise the
    // AgentCore runtime settings are expected.
    if let Ok(base_url) = env::var("ROBOCHAT_SSE_URL") {
        let config = SseConfigBuilder::with_base_url(base_url).build();
        chat_loop(Session::new(SseTransport::new(config))).await;
        return;
    }

    let Ok(runtime_arn) = env::var("ROBOCHAT_RUNTIME_ARN") else {
        eprintln!(
            "neither ROBOCHAT_SSE_URL nor ROBOCHAT_RUNTIME_ARN is set"
        );
        return;
    };
    let Ok(access_key_id) = env::var("AWS_ACCESS_KEY_ID") else {
        eprintln!("AWS_ACCESS_KEY_ID environment variable is not set");
        return;
    };
    let Ok(secret_access_key) = env::var("AWS_SECRET_ACCESS_KEY") else {
        eprintln!("AWS_SECRET_ACCESS_KEY environment variable is not set");
        return;
    };

    let mut config = RuntimeConfigBuilder::with_runtime_arn(runtime_arn);
    if let Ok(region) = env::var("AWS_REGION") {
        config = config.with_region(region);
    }
    if let Ok(qualifier) = env::var("ROBOCHAT_QUALIFIER") {
        config = config.with_qualifier(qualifier);
    }
    if let Ok(control_url) = env::var("ROBOCHAT_CONTROL_URL") {
        config = config.with_control_url(control_url);
    }

    let credentials = StaticCredentials::new(Credentials {
        access_key_id,
        secret_access_key,
        session_token: env::var("AWS_SESSION_TOKEN").ok(),
        expiration: None,
    });
    let transport = RuntimeTransport::new(config.build(), credentials);
    chat_loop(Session::new(transport)).await;
}

async fn chat_loop<T: AgentTransport>(mut session: Session<T>) {
    println!("{}🤖 {}", BAR_CHAR.bright_cyan(), robochat::GREETING);

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/reset" {
            session.reset();
            println!("{}🤖 {}", BAR_CHAR.bright_cyan(), robochat::GREETING);
            continue;
        }

        let mut streaming = false;
        let outcome = session
            .send_message(line, |event| {
                render_event(event, &mut streaming);
            })
            .await;
        if streaming {
            println!();
        }

        match outcome {
            Ok(outcome) => {
                if let Some(final_response) = &outcome.final_response {
                    println!(
                        "{}🤖 {}",
                        BAR_CHAR.bright_cyan(),
                        final_response.bright_white()
                    );
                }
            }
            Err(err) => {
                error!("failed to open the turn: {err}");
                println!("{}⚠️  {}", BAR_CHAR.bright_red(), err);
            }
        }
    }
}

fn render_event(event: &StreamEvent, streaming: &mut bool) {
    // Chunks render inline as they arrive; everything else gets its
    // own line, closing the in-flight chunk line first.
    if *streaming && !matches!(event, StreamEvent::Chunk(_)) {
        println!();
        *streaming = false;
    }

    match event {
        StreamEvent::Chunk(text) => {
            if !*streaming {
                print!("{}", BAR_CHAR.bright_cyan());
                *streaming = true;
            }
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        StreamEvent::ToolUse(tool) => {
            println!(
                "{}🔧 {}",
                BAR_CHAR.bright_yellow(),
                tool.name.bright_white().bold()
            );
        }
        StreamEvent::Reasoning(text) => {
            println!("{}💭 {}", BAR_CHAR.bright_black(), text.dimmed());
        }
        StreamEvent::Error(message) => {
            println!("{}⚠️  {}", BAR_CHAR.bright_red(), message);
        }
        StreamEvent::Complete { .. } | StreamEvent::Metadata(_) => {}
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
