//! `fitcoach chat` — Interactive coaching session.
//!
//! Lines starting with `/` are session commands; everything else is sent
//! to the coach on the current thread.

use fitcoach_agent::Coach;
use fitcoach_config::Locale;
use fitcoach_core::message::{Message, ThreadId};
use futures::StreamExt;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{StreamPrinter, TurnFlags, load_coach};

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    New,
    Reset,
    History,
    Exit,
    Unknown(String),
    Message(String),
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/new" => Input::New,
        "/reset" => Input::Reset,
        "/history" => Input::History,
        "/exit" | "/quit" | "exit" | "quit" => Input::Exit,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd.to_string()),
        text => Input::Message(text.to_string()),
    }
}

pub async fn run(flags: TurnFlags, thread: Option<String>) -> anyhow::Result<()> {
    let coach = load_coach()?;
    let options = flags.options(coach.config());
    let locale = Locale::for_language(options.language);
    let mut thread = thread
        .map(ThreadId)
        .unwrap_or_else(|| coach.sessions().new_thread());

    print_banner(&coach, &thread, &options.style, options.reasoning, locale).await;
    println!("  {}", locale.welcome);
    println!("  Commands: /new  /reset  /history  /exit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        print!("  You > ");
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => break,
            Input::New => {
                thread = coach.sessions().new_thread();
                println!("  Started thread {thread}\n");
            }
            Input::Reset => {
                coach.sessions().reset(&thread).await?;
                println!("  Thread {thread} cleared\n");
            }
            Input::History => {
                let history = coach.sessions().history(&thread).await?;
                print_history(&history);
            }
            Input::Unknown(cmd) => {
                println!("  Unknown command {cmd}. Try /new, /reset, /history, or /exit.\n");
            }
            Input::Message(text) => {
                let mut printer = StreamPrinter::new(options.language);
                match coach.ask_streaming(&thread, &text, &options).await {
                    Ok(mut snapshots) => {
                        print!("\n  Coach > ");
                        while let Some(snapshot) = snapshots.next().await {
                            if let Some(out) = printer.update(&snapshot) {
                                print!("{out}");
                                stdout.flush()?;
                            }
                        }
                        println!();
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
    }

    println!();
    println!("  Goodbye! 💪");
    println!();
    Ok(())
}

async fn print_banner(
    coach: &Coach,
    thread: &ThreadId,
    style: &str,
    reasoning: bool,
    locale: &Locale,
) {
    let config = coach.config();
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║         FitCoach — Interactive Session        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.provider.name);
    println!("  Model:     {}", config.provider.model);
    println!("  Style:     {style}{}", if reasoning { " + reasoning" } else { "" });
    println!("  Thread:    {thread}");
    if !coach.knowledge().is_available().await {
        println!("  ⚠️  {}", locale.no_documents);
    }
    println!();
}

fn print_history(history: &[Message]) {
    if history.is_empty() {
        println!("  (empty)\n");
        return;
    }
    for message in history {
        match message {
            Message::User { content } => println!("  You   > {content}"),
            Message::Assistant { content, tool_calls } if !tool_calls.is_empty() => {
                let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
                println!("  Coach > [searching: {}] {content}", names.join(", "));
            }
            Message::Assistant { content, .. } => println!("  Coach > {content}"),
            Message::Tool { name, content, .. } => {
                let preview: String = content.chars().take(80).collect();
                println!("  [{name}] {preview}…");
            }
            Message::System { .. } => {}
        }
    }
    println!();
}
