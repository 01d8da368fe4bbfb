//! Admin console subcommands.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use shopfront_api::ApiClient;
use shopfront_core::config::ShopfrontConfig;
use shopfront_core::notice::create_notice_channel;
use shopfront_realtime::channel::admin_channel_url;
use shopfront_realtime::protocol::ServerEvent;
use shopfront_realtime::{
    ConnectionState, CounterPoller, LiveChatSession, NotificationChannel, WsTransport,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::output;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Watch badge counters and incoming chats
    Console(IdentityArgs),

    /// Join and operate one live-chat conversation
    Chat(ChatArgs),
}

#[derive(Args)]
pub struct IdentityArgs {
    /// Admin identifier sent on the channel URL
    #[arg(long, default_value = "admin")]
    pub admin_id: String,

    /// Display name shown to customers
    #[arg(long, default_value = "Support")]
    pub name: String,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Chat session to join
    pub chat_id: String,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

pub async fn execute(cmd: AdminCommands, config: &ShopfrontConfig) -> Result<()> {
    match cmd {
        AdminCommands::Console(args) => console(args, config).await,
        AdminCommands::Chat(args) => chat(args, config).await,
    }
}

async fn console(args: IdentityArgs, config: &ShopfrontConfig) -> Result<()> {
    let notices = create_notice_channel();
    let mut notice_rx = notices.subscribe();

    let api = ApiClient::new(&config.api_url, config.api_token.clone());
    let url = admin_channel_url(&config.ws_url, &args.admin_id, &args.name);
    let channel = NotificationChannel::new(Arc::new(WsTransport), url, notices);
    channel.connect();

    let poller = CounterPoller::new(api, channel.clone()).spawn();

    let mut counters = channel.counters();
    let mut events = channel.subscribe_events();

    println!("{}", "Admin console started. Ctrl-C to quit.".dimmed());
    loop {
        tokio::select! {
            changed = counters.changed() => {
                if changed.is_err() {
                    break;
                }
                output::print_counters(&counters.borrow_and_update());
            }
            event = events.recv() => match event {
                Ok(ServerEvent::NewChat { session }) => {
                    println!(
                        "{} {} ({})",
                        "New chat from".yellow(),
                        session.user_name.bold(),
                        session.chat_id
                    );
                }
                Ok(ServerEvent::ChatEnded { chat_id }) => {
                    println!("{} {}", "Chat ended:".dimmed(), chat_id);
                }
                Ok(_) => {}
                Err(_) => break,
            },
            notice = notice_rx.recv() => {
                if let Ok(notice) = notice {
                    output::print_notice(&notice);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.abort();
    channel.shutdown();
    Ok(())
}

async fn chat(args: ChatArgs, config: &ShopfrontConfig) -> Result<()> {
    let notices = create_notice_channel();
    let mut notice_rx = notices.subscribe();

    let url = admin_channel_url(&config.ws_url, &args.identity.admin_id, &args.identity.name);
    let channel = NotificationChannel::new(Arc::new(WsTransport), url, notices.clone());
    channel.connect();

    // Give the channel a moment to come up before joining.
    for _ in 0..50 {
        if channel.state() == ConnectionState::Connected {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    let session = Arc::new(LiveChatSession::new(channel.clone(), notices));
    let runner = tokio::spawn(Arc::clone(&session).run());

    session.join_chat(&args.chat_id)?;
    println!(
        "{} {} {}",
        "Joined chat".green(),
        args.chat_id.bold(),
        "(type to reply, /end to finish, Ctrl-C to quit)".dimmed()
    );

    let mut events = channel.subscribe_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ServerEvent::ChatMessage { chat_id, sender, content, .. })
                    if chat_id == args.chat_id =>
                {
                    output::print_chat_message(&sender, &content);
                }
                Ok(ServerEvent::ChatEnded { chat_id }) if chat_id == args.chat_id => {
                    println!("{}", "Conversation ended.".dimmed());
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            },
            line = lines.next_line() => match line {
                Ok(Some(input)) if input.trim() == "/end" => {
                    session.end_chat()?;
                }
                Ok(Some(input)) => {
                    if let Err(e) = session.send_message(&input) {
                        eprintln!("{} {}", "Not sent:".red(), e);
                    }
                }
                Ok(None) | Err(_) => break,
            },
            notice = notice_rx.recv() => {
                if let Ok(notice) = notice {
                    output::print_notice(&notice);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    runner.abort();
    channel.shutdown();
    Ok(())
}
