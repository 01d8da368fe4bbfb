//! Terminal output formatting.

use colored::Colorize;
use shopfront_core::cart::CartState;
use shopfront_core::chat::ChatSender;
use shopfront_core::counters::NotificationCounters;
use shopfront_core::notice::{Notice, Severity};

/// Format a minor-unit price as a decimal string.
pub fn format_price(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

/// Print the cart as a table with derived totals.
pub fn print_cart(state: &CartState) {
    if state.is_empty() {
        println!("{}", "Cart is empty.".dimmed());
        return;
    }

    println!(
        "{:<36} {:<24} {:>4} {:>10}",
        "LINE", "PRODUCT", "QTY", "PRICE"
    );
    println!("{}", "-".repeat(78));

    for line in &state.lines {
        let price = match line.product.discounted_price {
            Some(discounted) => format!(
                "{} {}",
                format_price(discounted).green(),
                format_price(line.product.unit_price).dimmed().strikethrough()
            ),
            None => format_price(line.product.unit_price).normal().to_string(),
        };
        println!(
            "{:<36} {:<24} {:>4} {:>10}",
            truncate(&line.line_id, 36),
            truncate(&line.product.name, 22),
            line.quantity,
            price,
        );
    }

    println!();
    println!(
        "{} {} item(s), total {} ({} cart)",
        "Total:".bold(),
        state.total_items(),
        format_price(state.total_price()).bold(),
        state.mode.as_str()
    );
}

/// Print the badge counters on one line.
pub fn print_counters(counters: &NotificationCounters) {
    println!(
        "{} messages {} | support {} | live chats {}",
        "Badges:".bold(),
        counters.unread_messages.to_string().cyan(),
        counters.pending_support_requests.to_string().yellow(),
        counters.unassigned_live_chats.to_string().red(),
    );
}

/// Print one chat message.
pub fn print_chat_message(sender: &ChatSender, content: &str) {
    let tag = match sender {
        ChatSender::Customer => "customer".cyan(),
        ChatSender::Admin => "you".green(),
        ChatSender::System => "system".dimmed(),
    };
    println!("[{tag}] {content}");
}

/// Print a user-facing notice with severity styling.
pub fn print_notice(notice: &Notice) {
    let message = &notice.message;
    match notice.severity {
        Severity::Info => println!("{}", message),
        Severity::Success => println!("{} {}", "✓".green(), message),
        Severity::Warning => println!("{} {}", "!".yellow(), message.yellow()),
        Severity::Error => eprintln!("{} {}", "✗".red(), message.red()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
