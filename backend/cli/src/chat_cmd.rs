//! Interactive role-play loop over stdin.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use storytalk_agent::TranslationLanguage;
use storytalk_core::{ConversationContext, Level, Turn};

use crate::app::App;
use crate::terminal_output::{chat_line, dim, note_error, note_info, render_usage};

#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Quit,
    Usage,
    Summary,
    Translate(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    match line {
        "" => ChatInput::Empty,
        "/quit" | "/exit" => ChatInput::Quit,
        "/usage" => ChatInput::Usage,
        "/summary" => ChatInput::Summary,
        _ => match line.strip_prefix("/translate ") {
            Some(text) if !text.trim().is_empty() => ChatInput::Translate(text.trim()),
            _ => ChatInput::Message(line),
        },
    }
}

pub async fn run(
    app: &App,
    topic: &str,
    level: Level,
    conversation_id: Option<String>,
) -> Result<()> {
    let scenario = app.scenarios.generate_scenario(topic, level).await;

    let mut ctx = ConversationContext::new(topic, level, scenario.intro.as_str());
    if let Some(id) = conversation_id {
        ctx = ctx.with_conversation_id(id);
    }

    note_info(&format!("Scenario: {}", scenario.intro));
    println!(
        "{}",
        dim("Commands: /usage, /summary, /translate <text>, /quit")
    );
    if !scenario.first_message.is_empty() {
        chat_line("Tutor", &scenario.first_message);
        ctx.push_turn(Turn::assistant(scenario.first_message));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Usage => print!("{}", render_usage(&app.tutor.usage_report())),
            ChatInput::Summary => match app.tutor.summarizer().get_summary(&ctx.conversation_id) {
                Some(summary) if !summary.is_empty() => print!("{}", summary.format_for_prompt()),
                _ => note_info("No summary yet"),
            },
            ChatInput::Translate(text) => {
                let result = app
                    .translator
                    .get_translation(text, TranslationLanguage::default())
                    .await;
                chat_line("Translation", &result.translation);
            }
            ChatInput::Message(message) => {
                match app.tutor.generate_response(&ctx, message).await {
                    Ok(reply) => {
                        chat_line("Tutor", &reply);
                        ctx.record_exchange(message, reply);
                    }
                    // The turn is dropped; the student can resend.
                    Err(e) => note_error(&e.to_string()),
                }
            }
        }
    }

    app.tutor.summarizer().clear_summary(&ctx.conversation_id);
    note_info(&format!(
        "Conversation {} ended after {} turns",
        ctx.conversation_id,
        ctx.history.len()
    ));
    Ok(())
}
