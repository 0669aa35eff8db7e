use crate::commands::{spinner, system};
use crate::llm::{ChatAnswer, ConversationalRetrievalChain, Turn};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

pub const THINKING_MESSAGE: &str = "Working on your query....";

/// What the REPL should do with one line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Empty,
    Exit,
    Help,
    History,
    Reset,
    Question(&'a str),
}

pub fn parse_input(line: &str) -> ChatInput<'_> {
    let input = line.trim();
    if input.is_empty() {
        return ChatInput::Empty;
    }
    match input.to_ascii_lowercase().as_str() {
        "exit" | "quit" => ChatInput::Exit,
        "help" => ChatInput::Help,
        "history" => ChatInput::History,
        "reset" | "clear" => ChatInput::Reset,
        _ => ChatInput::Question(input),
    }
}

pub async fn run(chain: ConversationalRetrievalChain) -> anyhow::Result<()> {
    let mut rl = Editor::<(), DefaultHistory>::new()?;
    let mut turns: Vec<Turn> = Vec::new();

    println!("\n{}", "HR Chatbot".bright_green().bold());
    println!("Ask me anything about HR policy. Type 'help' for commands.\n");

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                match parse_input(&line) {
                    ChatInput::Empty => continue,
                    ChatInput::Exit => break,
                    ChatInput::Help => system::print_chat_help(),
                    ChatInput::History => print_history(&turns),
                    ChatInput::Reset => {
                        turns.clear();
                        println!("🔄 Conversation cleared.");
                    }
                    ChatInput::Question(question) => {
                        let pb = spinner(THINKING_MESSAGE);
                        let result = chain.ask(question, &turns).await;
                        pb.finish_and_clear();

                        match result {
                            Ok(answer) => {
                                print_answer(&answer);
                                turns.push(Turn::new(question, answer.answer));
                            }
                            Err(e) => println!("{}", format!("Error: {:#}", e).red()),
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    println!("Goodbye! 👋");
    Ok(())
}

fn print_answer(answer: &ChatAnswer) {
    println!("\n🤖 {}\n", answer.answer.bright_white());
    if !answer.context.is_empty() {
        let sources: Vec<String> = answer.context.iter().map(|r| r.passage.locator()).collect();
        println!("{} {}\n", "Sources:".dimmed(), sources.join(", ").dimmed());
    }
}

fn print_history(turns: &[Turn]) {
    if turns.is_empty() {
        println!("No questions yet.");
        return;
    }
    for (i, turn) in turns.iter().enumerate() {
        println!("{} {}", format!("{}.", i + 1).bright_yellow(), turn.question);
        println!("   {}", turn.answer);
    }
}
