//! Command-line argument parsing for slotcheck

use chrono::{DateTime, Utc};

use crate::engine::FulfillmentMethod;

/// Parse command line arguments
pub struct Args {
    pub once: bool,
    pub validate: bool,
    pub help: bool,
    pub method: FulfillmentMethod,
    /// Initial selection instant; absent means "as soon as possible"
    pub at: Option<DateTime<Utc>>,
}

pub fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    parse_from(&args)
}

/// Parse a raw argument vector (first element is the program name)
pub fn parse_from(args: &[String]) -> Args {
    let mut result = Args {
        once: false,
        validate: false,
        help: false,
        method: FulfillmentMethod::Delivery,
        at: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--once" => result.once = true,
            "--validate" => result.validate = true,
            "--help" | "-h" => result.help = true,
            "--method" => {
                if i + 1 < args.len() {
                    i += 1;
                    match args[i].to_lowercase().as_str() {
                        "delivery" => result.method = FulfillmentMethod::Delivery,
                        "pickup" => result.method = FulfillmentMethod::Pickup,
                        _ => {}
                    }
                }
            }
            "--at" => {
                if i + 1 < args.len() {
                    i += 1;
                    result.at = args[i]
                        .parse::<DateTime<Utc>>()
                        .ok()
                        .or_else(|| {
                            DateTime::parse_from_rfc3339(&args[i])
                                .ok()
                                .map(|t| t.with_timezone(&Utc))
                        });
                }
            }
            _ => {}
        }
        i += 1;
    }

    result
}

pub fn print_help() {
    println!("slotcheck - Timeslot Selection Monitor\n");
    println!("USAGE:");
    println!("    slotcheck [OPTIONS]\n");
    println!("OPTIONS:");
    println!("    --once                    Run a single evaluation and exit");
    println!("    --validate                Validate configuration and exit");
    println!("    --method <delivery|pickup>  Fulfillment method (default: delivery)");
    println!("    --at <RFC3339>            Initial selection instant (default: as soon as possible)");
    println!("    --help, -h                Show this help message\n");
    println!("ENVIRONMENT:");
    println!("    See .env.example for required configuration variables");
}
