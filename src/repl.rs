//! Interactive advisor chat loop.

use std::io::{self, Write};
use std::time::Instant;

use anyhow::Result;

use crate::advisor::AdvisorBot;
use crate::session::{self, SessionCommand};

pub async fn run_chat(bot: &mut AdvisorBot) -> Result<()> {
    print_banner();
    if !bot.session.initialized && bot.session.city.is_none() {
        println!("💡 Tip: set your city first ('city Mumbai') to unlock weather advice.");
    }

    loop {
        print!("\n🌾 You: ");
        io::stdout().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.is_empty() {
            break; // EOF
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        let lower = input.to_lowercase();
        if matches!(lower.as_str(), "quit" | "exit" | "q") {
            println!("👋 Thank you for using Agricultural Advisor Bot!");
            break;
        }
        if lower == "help" {
            print_help();
            continue;
        }
        if lower == "stats" {
            println!("\n{}", bot.stats().await);
            continue;
        }
        if lower == "clear" {
            print!("\x1b[2J\x1b[1;1H");
            print_banner();
            continue;
        }

        if let Some(cmd) = session::parse_command(input) {
            let response = match cmd {
                SessionCommand::SetCity(city) => bot.session.set_city(&city),
                SessionCommand::ShowCity => format!(
                    "Current city: {}\n💡 To set city: 'city [cityname]' (e.g., 'city Mumbai')",
                    bot.session.city_display()
                ),
                SessionCommand::SetCrop(crop) => bot.session.set_crop(&crop),
                SessionCommand::SetLanguage(lang) => bot.session.set_language(&lang),
            };
            println!("🤖 Advisor: {}", response);
            continue;
        }

        // Bare likely-city input while no city is set
        if bot.session.city.is_none() && session::looks_like_city(input) {
            let response = bot.session.set_city(input);
            println!("🤖 Advisor: {}", response);
            continue;
        }

        println!("🔄 Processing your query...");
        let start = Instant::now();
        let response = bot.process_query(input).await;
        println!("\n🤖 Advisor: {}", response);
        println!("⚡ Response time: {:.2} seconds", start.elapsed().as_secs_f64());
    }

    Ok(())
}

fn print_banner() {
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║              🌾 AGRICULTURAL ADVISOR BOT 🌾              ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("  I can help you with:");
    println!("   • Weather-based farming advice");
    println!("   • Government policy information");
    println!("   • Mandi commodity prices");
    println!("   • Equipment and technology questions");
    println!("   • Crop, soil, and general agricultural guidance");
    println!();
    println!("  Commands: 'city', 'crop', 'language', 'stats', 'help', 'quit'");
    println!("  For weather advice set your city first: 'city Mumbai'");
    println!("╚══════════════════════════════════════════════════════════╝");
}

fn print_help() {
    println!();
    println!("📖 **Agricultural Advisor Bot Help**");
    println!("{}", "=".repeat(50));
    println!("🌤️ **Weather Queries:**");
    println!("  Step 1: Set your city - 'city Mumbai'");
    println!("  Step 2: Ask weather questions:");
    println!("    - 'How does this weather affect my wheat crop?'");
    println!("    - 'Should I irrigate today?'");
    println!("    - 'Will it rain tomorrow?'");
    println!();
    println!("📋 **Policy Queries:**");
    println!("  - 'What is PM Kisan scheme?'");
    println!("  - 'How to apply for crop insurance?'");
    println!("  - 'Who is eligible for PMKSY?'");
    println!();
    println!("💰 **Price Queries:**");
    println!("  - 'What is the price of wheat in Kanpur?'");
    println!("  - 'Onion modal price in Lasalgaon'");
    println!();
    println!("🌾 **General Agriculture:**");
    println!("  - 'How to improve soil fertility?'");
    println!("  - 'Best time to plant tomatoes?'");
    println!("  - 'How to control pest infestation?'");
    println!();
    println!("🔧 **Commands:**");
    println!("  - 'city [cityname]': Set your city for weather advice");
    println!("  - 'crop [cropname]': Set your primary crop");
    println!("  - 'language [name]': Set the response language");
    println!("  - 'stats': Show system statistics");
    println!("  - 'clear': Clear the screen");
    println!("  - 'help': Show this help");
    println!("  - 'quit': Exit the bot");
}
