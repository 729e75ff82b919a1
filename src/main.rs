use std::sync::Arc;

use sessiongate::config::{load_config, print_schema};
use sessiongate::routes::GuardDecision;
use sessiongate::startup::run;
use sessiongate::utils::logger::init_logging;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Failed to print schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = load_config();
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let paths = if args.is_empty() {
        vec![config.routes.home_path.clone()]
    } else {
        args
    };

    match run(Arc::new(config), &paths).await {
        Ok(decisions) => {
            for (path, decision) in decisions {
                match decision {
                    GuardDecision::Allow => println!("{}\tallow", path),
                    GuardDecision::Redirect(target) => println!("{}\tredirect {}", path, target),
                    GuardDecision::Defer => println!("{}\tdefer", path),
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
