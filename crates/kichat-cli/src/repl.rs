use anyhow::Result;
use console::style;
use kichat::chat::TurnCallbacks;
use kichat::{ChatController, ChatError, TurnOutcome};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use tracing::debug;

use crate::command::{Command, HELP};

/// Stream fragments to stdout as they arrive
pub fn print_callbacks() -> TurnCallbacks {
    TurnCallbacks {
        on_fragment: Some(Box::new(|fragment, _| {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{}", fragment);
            let _ = stdout.flush();
        })),
        ..Default::default()
    }
}

fn notice(err: &ChatError) {
    debug!("command failed: {}", err);
    eprintln!("{}", style(err.user_notice()).red());
}

pub async fn run(mut controller: ChatController) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!(
        "{}",
        style("kichat - type a message, or /help for commands").dim()
    );

    loop {
        let prompt = match controller.auth().user() {
            Some(user) => format!("{}> ", user.name),
            None => "guest> ".to_string(),
        };
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", style(message).yellow());
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        execute(&mut controller, command).await;
    }
    Ok(())
}

async fn execute(controller: &mut ChatController, command: Command) {
    match command {
        Command::Send(text) => {
            println!();
            match controller.send_message(&text).await {
                Ok(TurnOutcome::Committed { .. }) => println!("\n"),
                Ok(TurnOutcome::CommittedUnsaved { error, .. }) => {
                    println!();
                    notice(&error);
                }
                Err(e) => {
                    println!();
                    notice(&e);
                }
            }
        }
        Command::New => {
            controller.new_chat();
            println!("{}", style("new chat").dim());
        }
        Command::Chats => {
            let loaded = controller.load_chats().await.map(|chats| chats.len());
            match loaded {
                Ok(0) => println!("{}", style("no chats yet").dim()),
                Ok(_) => print_chats(controller),
                Err(e) => notice(&e),
            }
        }
        Command::Open(n) => {
            let Some(id) = chat_id_at(controller, n) else {
                eprintln!("{}", style(format!("no chat #{}", n)).yellow());
                return;
            };
            match controller.select_chat(&id).await {
                Ok(()) => print_messages(controller),
                Err(e) => notice(&e),
            }
        }
        Command::Delete(n) => {
            let Some(id) = chat_id_at(controller, n) else {
                eprintln!("{}", style(format!("no chat #{}", n)).yellow());
                return;
            };
            match controller.delete_chat(&id).await {
                Ok(()) => println!("{}", style("chat deleted").dim()),
                Err(e) => notice(&e),
            }
        }
        Command::Login { email, password } => {
            let result = controller.auth().login(&email, &password).await;
            signed_in(controller, result.map(|user| user.name)).await;
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            let result = controller.auth().register(&email, &password, &name).await;
            signed_in(controller, result.map(|user| user.name)).await;
        }
        Command::Logout => match controller.auth().logout().await {
            Ok(()) => {
                controller.reset();
                println!("{}", style("signed out").dim());
            }
            Err(e) => notice(&e),
        },
        Command::WhoAmI => match controller.auth().user() {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => println!("{}", style("guest").dim()),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

async fn signed_in(controller: &mut ChatController, result: Result<String, ChatError>) {
    match result {
        Ok(name) => {
            controller.reset();
            println!("{}", style(format!("signed in as {}", name)).green());
            let loaded = controller.load_chats().await.map(|_| ());
            match loaded {
                Ok(()) => print_messages(controller),
                Err(e) => notice(&e),
            }
        }
        Err(e) => notice(&e),
    }
}

fn chat_id_at(controller: &ChatController, n: usize) -> Option<String> {
    controller
        .chats()
        .get(n.checked_sub(1)?)
        .map(|chat| chat.id.clone())
}

fn print_chats(controller: &ChatController) {
    for (i, chat) in controller.chats().iter().enumerate() {
        let marker = if controller.current_chat_id() == Some(chat.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:>3}. {}  {}",
            marker,
            i + 1,
            chat.title,
            style(chat.created_at.format("%Y-%m-%d %H:%M")).dim()
        );
    }
}

fn print_messages(controller: &ChatController) {
    for message in controller.display_messages() {
        println!("{} {}\n", style(format!("[{}]", message.role)).bold(), message.content);
    }
}
