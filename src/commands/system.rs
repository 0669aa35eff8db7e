pub fn print_chat_help() {
    println!("\n💬 HR Policy Chat:");
    println!("  Just type your HR policy question");
    println!("  Examples:");
    println!("    - What is the leave policy?");
    println!("    - Does unused leave carry over?");
    println!();

    println!("⚙️ Session Commands:");
    println!("  history  - Show this session's questions and answers");
    println!("  reset    - Forget the conversation so far");
    println!("  help     - Show this help menu");
    println!("  exit     - Exit the chat");
    println!();
}
