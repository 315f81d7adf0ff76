use std::env;

use recipe_resolver::{RecipeFilters, RecipeResolver};

const USAGE: &str = "Usage:
  recipe-resolver get <id>
  recipe-resolver search <query> [cuisine] [diet] [max-minutes]
  recipe-resolver generate <prompt...>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).ok_or(USAGE)?;

    let resolver = RecipeResolver::builder().build()?;

    match command.as_str() {
        "get" => {
            let id = args.get(2).ok_or(USAGE)?;
            let recipe = resolver.resolve_by_id(id).await?;
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        }
        "search" => {
            let query = args.get(2).ok_or(USAGE)?;
            let filters = RecipeFilters {
                cuisine: args.get(3).cloned().filter(|s| !s.is_empty()),
                diet: args.get(4).cloned().filter(|s| !s.is_empty()),
                max_ready_minutes: args.get(5).and_then(|s| s.parse().ok()),
            };
            let recipes = resolver.search(query, &filters).await?;
            println!("{}", serde_json::to_string_pretty(&recipes)?);
        }
        "generate" => {
            if args.len() < 3 {
                return Err(USAGE.into());
            }
            let prompt = args[2..].join(" ");
            let recipe = resolver.generate_from_prompt(&prompt).await?;
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        }
        _ => return Err(USAGE.into()),
    }

    Ok(())
}
